use url::Url;

/// The only place a session's URL lives: the current location plus the
/// navigation entries before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressBar {
    entries: Vec<Url>,
}

impl AddressBar {
    pub fn new(initial: Url) -> Self {
        Self {
            entries: vec![initial],
        }
    }

    pub fn current(&self) -> &Url {
        // `entries` is never empty.
        &self.entries[self.entries.len() - 1]
    }

    /// Overwrites the current entry without adding history.
    pub fn replace(&mut self, url: Url) {
        let last = self.entries.len() - 1;
        self.entries[last] = url;
    }

    pub fn push(&mut self, url: Url) {
        self.entries.push(url);
    }

    pub fn history_len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[Url] {
        &self.entries
    }
}
