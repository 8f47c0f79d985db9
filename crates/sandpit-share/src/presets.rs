//! Built-in example sources offered as presets and matched when sharing.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Example {
    pub key: &'static str,
    pub display_name: &'static str,
    pub content: &'static str,
}

const BUILTIN: &[Example] = &[
    Example {
        key: "calculator",
        display_name: "Calculator",
        content: include_str!("presets/calculator.php"),
    },
    Example {
        key: "undefined",
        display_name: "Undefined",
        content: include_str!("presets/undefined.php"),
    },
];

/// Ordered, read-only example set. The first entry is the startup default.
#[derive(Debug, Clone, Copy)]
pub struct ExampleSet {
    examples: &'static [Example],
}

impl Default for ExampleSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ExampleSet {
    pub fn builtin() -> Self {
        Self { examples: BUILTIN }
    }

    pub fn new(examples: &'static [Example]) -> Self {
        Self { examples }
    }

    pub fn first(&self) -> Option<&'static Example> {
        self.examples.first()
    }

    pub fn get(&self, key: &str) -> Option<&'static Example> {
        self.examples.iter().find(|example| example.key == key)
    }

    /// Exact content match, used to share a short example link instead of a blob.
    pub fn find_by_content(&self, text: &str) -> Option<&'static Example> {
        self.examples.iter().find(|example| example.content == text)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static Example> {
        self.examples.iter()
    }
}
