use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Slugs whose enabled state differs from the captured defaults.
///
/// A slug sits in an `included_*` set when it is on but off by default, and in
/// an `excluded_*` set when it is off but on by default.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfigDiff {
    #[serde(default)]
    pub included_plugins: BTreeSet<String>,
    #[serde(default)]
    pub excluded_plugins: BTreeSet<String>,
    #[serde(default)]
    pub included_rules: BTreeSet<String>,
    #[serde(default)]
    pub excluded_rules: BTreeSet<String>,
}

impl ConfigDiff {
    pub fn is_empty(&self) -> bool {
        self.included_plugins.is_empty()
            && self.excluded_plugins.is_empty()
            && self.included_rules.is_empty()
            && self.excluded_rules.is_empty()
    }

    /// Drops exclusions that are also listed as inclusions.
    pub fn resolve_overlaps(mut self) -> Self {
        self.excluded_plugins
            .retain(|slug| !self.included_plugins.contains(slug));
        self.excluded_rules
            .retain(|slug| !self.included_rules.contains(slug));
        self
    }
}
