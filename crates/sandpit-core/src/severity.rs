use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Note,
    Help,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayCategory {
    Error,
    Warning,
    Info,
    Hint,
}

impl DisplayCategory {
    pub fn class_name(self) -> &'static str {
        match self {
            Self::Error => "squiggly-error",
            Self::Warning => "squiggly-warning",
            Self::Info => "squiggly-info",
            Self::Hint => "squiggly-hint",
        }
    }
}

impl Severity {
    /// Case-insensitive; anything unrecognised is [`Severity::Other`].
    pub fn classify(level: &str) -> Self {
        match level.trim().to_ascii_lowercase().as_str() {
            "error" => Self::Error,
            "warning" => Self::Warning,
            "note" => Self::Note,
            "help" => Self::Help,
            _ => Self::Other,
        }
    }

    /// Sort rank for lint issues; lower sorts first.
    pub fn rank(self) -> u8 {
        match self {
            Self::Error => 2,
            Self::Warning => 3,
            Self::Note => 4,
            Self::Help => 5,
            Self::Other => 6,
        }
    }

    pub fn category(self) -> DisplayCategory {
        match self {
            Self::Error => DisplayCategory::Error,
            Self::Warning => DisplayCategory::Warning,
            Self::Note => DisplayCategory::Info,
            Self::Help | Self::Other => DisplayCategory::Hint,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Note => "note",
            Self::Help => "help",
            Self::Other => "other",
        }
    }

    /// Issue card style for a raw level string.
    pub fn card_class(level: &str) -> String {
        let level = level.trim();
        if level.is_empty() {
            return "level-note".to_owned();
        }
        format!("level-{}", level.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_ignores_case_and_falls_back_for_unknown_levels() {
        assert_eq!(Severity::classify("ERROR"), Severity::Error);
        assert_eq!(Severity::classify("Warning"), Severity::Warning);
        assert_eq!(Severity::classify("note"), Severity::Note);
        assert_eq!(Severity::classify("Help"), Severity::Help);
        assert_eq!(Severity::classify("critical"), Severity::Other);
        assert_eq!(Severity::classify(""), Severity::Other);
    }

    #[test]
    fn ranks_order_error_before_help() {
        let mut levels = vec!["help", "error", "note", "warning"];
        levels.sort_by_key(|level| Severity::classify(level).rank());
        assert_eq!(levels, vec!["error", "warning", "note", "help"]);
        assert_eq!(Severity::Other.rank(), 6);
    }

    #[test]
    fn unknown_levels_use_lowest_priority_category() {
        assert_eq!(Severity::Other.category(), DisplayCategory::Hint);
        assert_eq!(Severity::Note.category().class_name(), "squiggly-info");
        assert_eq!(Severity::Error.category().class_name(), "squiggly-error");
    }

    #[test]
    fn card_class_defaults_to_note() {
        assert_eq!(Severity::card_class("Warning"), "level-warning");
        assert_eq!(Severity::card_class(""), "level-note");
    }
}
