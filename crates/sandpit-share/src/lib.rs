use sandpit_core::PhpVersion;
use sandpit_rules::ConfigDiff;
use thiserror::Error;
use url::Url;

mod address;
pub mod fragment;
mod presets;
pub mod query;

pub use address::AddressBar;
pub use fragment::{FragmentRef, decode_source, encode_source, fragment_for, parse_fragment};
pub use presets::{Example, ExampleSet};
pub use query::{read_diff, read_php_version, write_session_query};

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("share token is not valid base64url: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("share token does not inflate to UTF-8 text: {0}")]
    Decompress(std::io::Error),
    #[error("could not compress source for sharing: {0}")]
    Compress(std::io::Error),
    #[error("invalid share url: {0}")]
    Url(#[from] url::ParseError),
}

/// Everything that has to survive a round trip through the URL.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    pub source: String,
    pub diff: ConfigDiff,
    pub php_version: PhpVersion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOrigin {
    /// `#example/<key>` named a known example.
    Example(&'static str),
    /// `#code/<token>` decoded cleanly.
    Inline,
    /// Nothing usable in the fragment; the first example was loaded.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredSession {
    pub state: SessionState,
    pub origin: SourceOrigin,
    /// The example whose content was loaded, if any.
    pub example: Option<&'static str>,
}

/// Writes the session into the current address-bar entry (replace semantics).
/// On error the address bar is left untouched.
pub fn publish(
    bar: &mut AddressBar,
    state: &SessionState,
    examples: &ExampleSet,
) -> Result<(), ShareError> {
    let url = session_url(bar.current(), state, examples)?;
    bar.replace(url);
    Ok(())
}

/// Navigates to an example, adding a history entry.
pub fn navigate_to_example(bar: &mut AddressBar, key: &str) {
    let mut url = bar.current().clone();
    url.set_fragment(Some(&fragment::example_fragment(key)));
    bar.push(url);
}

pub fn session_url(
    base: &Url,
    state: &SessionState,
    examples: &ExampleSet,
) -> Result<Url, ShareError> {
    let mut url = base.clone();
    url.set_fragment(Some(&fragment_for(&state.source, examples)?));
    write_session_query(&mut url, &state.diff, state.php_version);
    Ok(url)
}

/// Reads a session back from a URL at startup.
///
/// A named example wins over inline code. A missing fragment, an unknown
/// example key or an undecodable token all fall back to the first example.
pub fn restore(url: &Url, examples: &ExampleSet) -> RestoredSession {
    let diff = read_diff(url);
    let php_version = read_php_version(url);

    let (source, origin, example) = match url.fragment().and_then(parse_fragment) {
        Some(FragmentRef::Example(key)) => match examples.get(key) {
            Some(example) => (
                example.content.to_owned(),
                SourceOrigin::Example(example.key),
                Some(example.key),
            ),
            None => {
                tracing::warn!(key, "unknown example in share link, loading default");
                fallback(examples)
            }
        },
        Some(FragmentRef::Code(token)) => match decode_source(token) {
            Ok(text) => (text, SourceOrigin::Inline, None),
            Err(err) => {
                tracing::warn!(error = %err, "could not decode shared code, loading default");
                fallback(examples)
            }
        },
        None => fallback(examples),
    };

    RestoredSession {
        state: SessionState {
            source,
            diff,
            php_version,
        },
        origin,
        example,
    }
}

fn fallback(examples: &ExampleSet) -> (String, SourceOrigin, Option<&'static str>) {
    match examples.first() {
        Some(example) => (
            example.content.to_owned(),
            SourceOrigin::Fallback,
            Some(example.key),
        ),
        None => (String::new(), SourceOrigin::Fallback, None),
    }
}

pub fn parse_url(raw: &str) -> Result<Url, ShareError> {
    Ok(Url::parse(raw.trim())?)
}
