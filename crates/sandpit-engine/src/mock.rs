use async_trait::async_trait;
use sandpit_core::{
    AnalysisOutcome, CapabilityDefinition, CheckDefinition, Definitions, Diagnostic,
    FormatSettings, Level, LinterSettings, Span,
};

use crate::{AnalysisEngine, EngineError};

type Finding = (Span, String);

struct MockCapability {
    name: &'static str,
    slug: &'static str,
    enabled_by_default: bool,
}

struct MockRule {
    capability: &'static str,
    name: &'static str,
    slug: &'static str,
    level: Option<Level>,
    run: fn(&str) -> Vec<Finding>,
}

const CAPABILITIES: &[MockCapability] = &[
    MockCapability {
        name: "Consistency",
        slug: "consistency",
        enabled_by_default: true,
    },
    MockCapability {
        name: "Strictness",
        slug: "strictness",
        enabled_by_default: true,
    },
    MockCapability {
        name: "Safety",
        slug: "safety",
        enabled_by_default: false,
    },
    MockCapability {
        name: "Comment",
        slug: "comment",
        enabled_by_default: false,
    },
];

const RULES: &[MockRule] = &[
    MockRule {
        capability: "consistency",
        name: "NoTrailingWhitespace",
        slug: "consistency/no-trailing-whitespace",
        level: Some(Level::Warning),
        run: trailing_whitespace,
    },
    MockRule {
        capability: "consistency",
        name: "NoTabIndentation",
        slug: "consistency/no-tab-indentation",
        level: None,
        run: tab_indentation,
    },
    MockRule {
        capability: "strictness",
        name: "RequireStrictTypes",
        slug: "strictness/require-strict-types",
        level: Some(Level::Warning),
        run: missing_strict_types,
    },
    MockRule {
        capability: "safety",
        name: "NoEval",
        slug: "safety/no-eval",
        level: Some(Level::Error),
        run: eval_calls,
    },
    MockRule {
        capability: "comment",
        name: "NoHashComment",
        slug: "comment/no-hash-comment",
        level: Some(Level::Note),
        run: hash_comments,
    },
];

/// Deterministic in-process engine with a handful of line-based checks.
///
/// Unbalanced delimiters are reported as a parse error; formatting strips
/// trailing whitespace and expands indentation tabs.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockEngine;

#[async_trait]
impl AnalysisEngine for MockEngine {
    async fn definitions(&self) -> Result<Definitions, EngineError> {
        Ok(CAPABILITIES
            .iter()
            .map(|capability| {
                let checks = RULES
                    .iter()
                    .filter(|rule| rule.capability == capability.slug)
                    .map(|rule| CheckDefinition {
                        name: rule.name.to_owned(),
                        level: rule.level,
                    })
                    .collect();
                (
                    CapabilityDefinition {
                        name: capability.name.to_owned(),
                        enabled_by_default: capability.enabled_by_default,
                    },
                    checks,
                )
            })
            .collect())
    }

    async fn analyze(
        &self,
        code: &str,
        _format_settings: Option<&FormatSettings>,
        linter_settings: &LinterSettings,
    ) -> Result<AnalysisOutcome, EngineError> {
        let parse_error = find_parse_error(code);
        let formatted = parse_error.is_none().then(|| format_source(code));

        Ok(AnalysisOutcome {
            parse_error,
            semantic_issues: semantic_issues(code),
            linter_issues: lint(code, linter_settings),
            formatted,
        })
    }
}

fn lint(code: &str, settings: &LinterSettings) -> Vec<Diagnostic> {
    let mut issues = Vec::new();

    for rule in RULES {
        if !settings.plugins.iter().any(|plugin| plugin == rule.capability) {
            continue;
        }

        let configured = settings.rules.get(rule.slug);
        let enabled = configured.map_or(rule.level.is_some(), |setting| setting.enabled);
        if !enabled {
            continue;
        }

        let level = configured
            .and_then(|setting| setting.level)
            .or(rule.level)
            .unwrap_or(Level::Warning);

        for (span, message) in (rule.run)(code) {
            issues.push(
                Diagnostic::new(level.as_str(), message)
                    .with_code(rule.slug)
                    .with_annotation(span, None),
            );
        }
    }

    issues
}

fn semantic_issues(code: &str) -> Vec<Diagnostic> {
    let mut issues = Vec::new();

    if !code.trim().is_empty() && !code.trim_start().starts_with("<?php") {
        issues.push(
            Diagnostic::new("Error", "Missing `<?php` opening tag")
                .with_annotation(Span::new(0, 0), None),
        );
    }

    const NEEDLE: &str = "strict_types=";
    for (index, _) in code.match_indices(NEEDLE) {
        let value_start = index + NEEDLE.len();
        let value: String = code[value_start..]
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        if value != "0" && value != "1" {
            let mut issue = Diagnostic::new("Error", "Values of `strict_types` must be 0 or 1")
                .with_annotation(
                    Span::new(value_start, value_start + value.len()),
                    Some("invalid value"),
                );
            issue.help = Some("Use `declare(strict_types=1);`".to_owned());
            issues.push(issue);
        }
    }

    issues
}

fn find_parse_error(code: &str) -> Option<Diagnostic> {
    let mut open: Vec<(char, usize)> = Vec::new();
    let mut chars = code.char_indices().peekable();

    while let Some((index, ch)) = chars.next() {
        match ch {
            '\'' | '"' => {
                let mut closed = false;
                while let Some((_, next)) = chars.next() {
                    if next == '\\' {
                        chars.next();
                    } else if next == ch {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Some(parse_error("Unterminated string literal", index, code.len()));
                }
            }
            '#' if chars.peek().is_some_and(|(_, next)| *next != '[') => {
                skip_line(&mut chars);
            }
            '/' if chars.peek().is_some_and(|(_, next)| *next == '/') => {
                skip_line(&mut chars);
            }
            '/' if chars.peek().is_some_and(|(_, next)| *next == '*') => {
                chars.next();
                while let Some((_, next)) = chars.next() {
                    if next == '*' && chars.peek().is_some_and(|(_, after)| *after == '/') {
                        chars.next();
                        break;
                    }
                }
            }
            '(' | '[' | '{' => open.push((ch, index)),
            ')' | ']' | '}' => match open.pop() {
                Some((opener, _)) if closer_for(opener) == ch => {}
                _ => {
                    return Some(parse_error(
                        &format!("Unexpected token `{ch}`"),
                        index,
                        index + 1,
                    ));
                }
            },
            _ => {}
        }
    }

    open.pop()
        .map(|(opener, index)| parse_error(&format!("Unclosed `{opener}`"), index, index + 1))
}

fn skip_line(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>) {
    while chars.next_if(|(_, next)| *next != '\n').is_some() {}
}

fn closer_for(opener: char) -> char {
    match opener {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

fn parse_error(message: &str, start: usize, end: usize) -> Diagnostic {
    Diagnostic::new("Error", message)
        .with_code("parse")
        .with_annotation(Span::new(start, end), Some("syntax error"))
}

fn format_source(code: &str) -> String {
    let mut formatted = String::with_capacity(code.len());

    for line in code.lines() {
        let indent = line.len() - line.trim_start_matches('\t').len();
        formatted.push_str(&"    ".repeat(indent));
        formatted.push_str(line[indent..].trim_end());
        formatted.push('\n');
    }

    let trimmed = formatted.trim_end().len();
    formatted.truncate(trimmed);
    if !formatted.is_empty() {
        formatted.push('\n');
    }
    formatted
}

/// Yields `(line start offset, line without its terminator)`.
fn lines_with_offsets(code: &str) -> impl Iterator<Item = (usize, &str)> {
    code.split_inclusive('\n').scan(0, |offset, line| {
        let start = *offset;
        *offset += line.len();
        Some((start, line.trim_end_matches(['\n', '\r'])))
    })
}

fn trailing_whitespace(code: &str) -> Vec<Finding> {
    lines_with_offsets(code)
        .filter_map(|(start, line)| {
            let kept = line.trim_end_matches([' ', '\t']).len();
            (kept < line.len()).then(|| {
                (
                    Span::new(start + kept, start + line.len()),
                    "Trailing whitespace".to_owned(),
                )
            })
        })
        .collect()
}

fn tab_indentation(code: &str) -> Vec<Finding> {
    lines_with_offsets(code)
        .filter_map(|(start, line)| {
            let tabs = line.len() - line.trim_start_matches('\t').len();
            (tabs > 0).then(|| {
                (
                    Span::new(start, start + tabs),
                    "Indentation uses tabs".to_owned(),
                )
            })
        })
        .collect()
}

fn missing_strict_types(code: &str) -> Vec<Finding> {
    if code.contains("strict_types") {
        return Vec::new();
    }

    vec![(
        Span::new(0, code.len().min(5)),
        "Missing `declare(strict_types=1);`".to_owned(),
    )]
}

fn eval_calls(code: &str) -> Vec<Finding> {
    code.match_indices("eval(")
        .filter(|(index, _)| {
            code[..*index]
                .chars()
                .next_back()
                .is_none_or(|before| !(before.is_alphanumeric() || before == '_' || before == '$'))
        })
        .map(|(index, _)| (Span::new(index, index + 4), "Avoid `eval`".to_owned()))
        .collect()
}

fn hash_comments(code: &str) -> Vec<Finding> {
    lines_with_offsets(code)
        .filter_map(|(start, line)| {
            let indent = line.len() - line.trim_start().len();
            let rest = &line[indent..];
            (rest.starts_with('#') && !rest.starts_with("#[")).then(|| {
                (
                    Span::new(start + indent, start + line.len()),
                    "Use `//` for single-line comments".to_owned(),
                )
            })
        })
        .collect()
}
