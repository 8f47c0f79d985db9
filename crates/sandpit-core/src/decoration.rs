use serde::Serialize;

use crate::position::{LineIndex, Range};
use crate::severity::DisplayCategory;
use crate::Diagnostic;

/// Editor squiggle for one diagnostic, anchored on its first annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decoration {
    pub range: Range,
    pub category: DisplayCategory,
    pub hover: String,
}

impl Decoration {
    pub fn class_name(&self) -> &'static str {
        self.category.class_name()
    }
}

/// Diagnostics without annotations produce no decoration.
pub fn decorations_for<'d>(
    text: &str,
    diagnostics: impl IntoIterator<Item = &'d Diagnostic>,
) -> Vec<Decoration> {
    let index = LineIndex::new(text);

    diagnostics
        .into_iter()
        .filter_map(|diagnostic| {
            let annotation = diagnostic.primary_annotation()?;
            Some(Decoration {
                range: index.range(&annotation.span),
                category: diagnostic.severity().category(),
                hover: hover_markdown(diagnostic),
            })
        })
        .collect()
}

fn hover_markdown(diagnostic: &Diagnostic) -> String {
    let level = match diagnostic.level.trim() {
        "" => "note".to_owned(),
        level => level.to_lowercase(),
    };
    let code = diagnostic.code.as_deref().unwrap_or("unknown");
    format!("`{level}`: {} *({code})*", diagnostic.message)
}

#[cfg(test)]
mod tests {
    use crate::position::Position;
    use crate::Span;

    use super::*;

    #[test]
    fn decorations_use_first_annotation_and_skip_unanchored_issues() {
        let text = "<?php\n\nfoo();\n";
        let diagnostics = vec![
            Diagnostic::new("Error", "undefined function foo")
                .with_code("semantics")
                .with_annotation(Span::new(7, 12), Some("called here"))
                .with_annotation(Span::new(0, 5), None),
            Diagnostic::new("Help", "nothing to point at"),
        ];

        let decorations = decorations_for(text, &diagnostics);

        assert_eq!(decorations.len(), 1);
        let decoration = &decorations[0];
        assert_eq!(decoration.range.start, Position::new(3, 1));
        assert_eq!(decoration.range.end, Position::new(3, 6));
        assert_eq!(decoration.class_name(), "squiggly-error");
        assert_eq!(
            decoration.hover,
            "`error`: undefined function foo *(semantics)*"
        );
    }
}
