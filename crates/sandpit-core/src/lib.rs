use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod decoration;
pub mod position;
pub mod severity;

pub use decoration::{Decoration, decorations_for};
pub use position::{LineIndex, Position, Range, offset_to_position};
pub use severity::{DisplayCategory, Severity};

/// Code stamped on every diagnostic that came out of the semantic stage.
pub const SEMANTICS_CODE: &str = "semantics";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, Ord, PartialOrd)]
pub enum PhpVersion {
    #[serde(rename = "7.4")]
    Php74,
    #[serde(rename = "8.0")]
    Php80,
    #[serde(rename = "8.1")]
    Php81,
    #[serde(rename = "8.2")]
    Php82,
    #[serde(rename = "8.3")]
    Php83,
    #[default]
    #[serde(rename = "8.4")]
    Php84,
}

impl PhpVersion {
    pub const ALL: [PhpVersion; 6] = [
        Self::Php74,
        Self::Php80,
        Self::Php81,
        Self::Php82,
        Self::Php83,
        Self::Php84,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Php74 => "7.4",
            Self::Php80 => "8.0",
            Self::Php81 => "8.1",
            Self::Php82 => "8.2",
            Self::Php83 => "8.3",
            Self::Php84 => "8.4",
        }
    }
}

impl std::str::FromStr for PhpVersion {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|version| version.as_str() == value)
            .ok_or_else(|| {
                format!(
                    "invalid PHP version '{value}', expected one of: 7.4, 8.0, 8.1, 8.2, 8.3, 8.4"
                )
            })
    }
}

impl std::fmt::Display for PhpVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity level as the engine spells it in rule definitions and settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    #[serde(alias = "error")]
    Error,
    #[serde(alias = "warning")]
    Warning,
    #[serde(alias = "note")]
    Note,
    #[serde(alias = "help")]
    Help,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Warning => "Warning",
            Self::Note => "Note",
            Self::Help => "Help",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SpanEdge {
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: SpanEdge,
    pub end: SpanEdge,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: SpanEdge { offset: start },
            end: SpanEdge { offset: end },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub span: Span,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl Diagnostic {
    pub fn new(level: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            code: None,
            message: message.into(),
            notes: Vec::new(),
            help: None,
            annotations: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_annotation(mut self, span: Span, message: Option<&str>) -> Self {
        self.annotations.push(Annotation {
            span,
            message: message.map(str::to_owned),
        });
        self
    }

    pub fn severity(&self) -> Severity {
        Severity::classify(&self.level)
    }

    pub fn primary_annotation(&self) -> Option<&Annotation> {
        self.annotations.first()
    }

    /// `[start-end]: message` for every annotation that carries a message.
    pub fn annotation_labels(&self) -> Vec<String> {
        self.annotations
            .iter()
            .filter_map(|annotation| {
                let message = annotation.message.as_deref()?;
                Some(format!(
                    "[{}-{}]: {message}",
                    annotation.span.start.offset, annotation.span.end.offset
                ))
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDefinition {
    pub name: String,
    #[serde(default)]
    pub enabled_by_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
}

pub type Definitions = Vec<(CapabilityDefinition, Vec<CheckDefinition>)>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSettings {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    #[serde(default)]
    pub options: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinterSettings {
    pub php_version: PhpVersion,
    pub default_plugins: bool,
    pub plugins: Vec<String>,
    pub rules: BTreeMap<String, RuleSettings>,
}

/// Formatter options are passed through to the engine untouched.
pub type FormatSettings = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AnalysisOutcome {
    #[serde(default)]
    pub parse_error: Option<Diagnostic>,
    #[serde(default)]
    pub semantic_issues: Vec<Diagnostic>,
    #[serde(default)]
    pub linter_issues: Vec<Diagnostic>,
    #[serde(default)]
    pub formatted: Option<String>,
}

/// Diagnostics of one analysis pass, grouped by the stage that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DiagnosticBuckets {
    pub parse: Option<Diagnostic>,
    pub semantics: Vec<Diagnostic>,
    pub lint: Vec<Diagnostic>,
}

impl DiagnosticBuckets {
    pub fn new(parse: Option<Diagnostic>, semantics: Vec<Diagnostic>, lint: Vec<Diagnostic>) -> Self {
        let semantics = semantics
            .into_iter()
            .map(|issue| issue.with_code(SEMANTICS_CODE))
            .collect();

        let mut lint = lint;
        sort_by_severity(&mut lint);

        Self {
            parse,
            semantics,
            lint,
        }
    }

    pub fn from_outcome(outcome: &AnalysisOutcome) -> Self {
        Self::new(
            outcome.parse_error.clone(),
            outcome.semantic_issues.clone(),
            outcome.linter_issues.clone(),
        )
    }

    pub fn has_parse_error(&self) -> bool {
        self.parse.is_some()
    }

    pub fn len(&self) -> usize {
        usize::from(self.parse.is_some()) + self.semantics.len() + self.lint.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Display order: parse failure, then semantic issues, then lint issues.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.parse
            .iter()
            .chain(self.semantics.iter())
            .chain(self.lint.iter())
    }
}

/// Stable sort by severity rank, most severe first.
pub fn sort_by_severity(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by_key(|diagnostic| diagnostic.severity().rank());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn php_version_round_trips_through_str_and_serde() {
        for version in PhpVersion::ALL {
            assert_eq!(version.as_str().parse::<PhpVersion>(), Ok(version));
        }

        let json = serde_json::to_string(&PhpVersion::Php81).expect("serialize");
        assert_eq!(json, "\"8.1\"");
        assert!("9.0".parse::<PhpVersion>().is_err());
        assert_eq!(PhpVersion::default(), PhpVersion::Php84);
    }

    #[test]
    fn buckets_keep_stage_order_and_tag_semantic_issues() {
        let buckets = DiagnosticBuckets::new(
            Some(Diagnostic::new("Error", "unexpected token").with_code("parse")),
            vec![Diagnostic::new("Error", "undefined class Bar")],
            vec![
                Diagnostic::new("Help", "use strict types").with_code("lint/a"),
                Diagnostic::new("Error", "no return").with_code("lint/b"),
            ],
        );

        let codes: Vec<_> = buckets
            .iter()
            .map(|issue| issue.code.as_deref().unwrap_or_default())
            .collect();
        assert_eq!(codes, vec!["parse", SEMANTICS_CODE, "lint/b", "lint/a"]);
        assert_eq!(buckets.len(), 4);
        assert!(buckets.has_parse_error());
    }

    #[test]
    fn severity_sort_is_stable_for_equal_rank() {
        let mut issues = vec![
            Diagnostic::new("warning", "first"),
            Diagnostic::new("ERROR", "second"),
            Diagnostic::new("Warning", "third"),
        ];

        sort_by_severity(&mut issues);

        let messages: Vec<_> = issues.iter().map(|issue| issue.message.as_str()).collect();
        assert_eq!(messages, vec!["second", "first", "third"]);
    }

    #[test]
    fn diagnostic_deserializes_engine_shape_with_missing_optionals() {
        let raw = r#"{
            "level": "Warning",
            "code": "best-practices/no-empty",
            "message": "empty block",
            "annotations": [
                {"span": {"start": {"offset": 3, "file_id": 1}, "end": {"offset": 7}}, "message": "here"},
                {"span": {"start": {"offset": 9}, "end": {"offset": 10}}}
            ]
        }"#;

        let diagnostic: Diagnostic = serde_json::from_str(raw).expect("parse diagnostic");

        assert!(diagnostic.notes.is_empty());
        assert_eq!(diagnostic.help, None);
        assert_eq!(diagnostic.annotations.len(), 2);
        assert_eq!(diagnostic.annotation_labels(), vec!["[3-7]: here".to_owned()]);
        assert_eq!(diagnostic.severity(), Severity::Warning);
    }
}
