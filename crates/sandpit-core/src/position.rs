//! Conversion from engine byte offsets to editor line/column positions.

use serde::{Deserialize, Serialize};

use crate::Span;

/// 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const START: Position = Position { line: 1, column: 1 };

    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

/// Maps a 0-based byte offset in `text` to a 1-based position.
///
/// Offsets past the end of the text resolve to the position after the last
/// character. An offset that lands inside a multi-byte character resolves to
/// the start of that character.
pub fn offset_to_position(text: &str, offset: usize) -> Position {
    let mut line = 1;
    let mut column = 1;

    for (index, ch) in text.char_indices() {
        if index + ch.len_utf8() > offset {
            break;
        }

        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }

    Position { line, column }
}

/// Line-start table for one revision of the source text.
///
/// Answers the same question as [`offset_to_position`] without rescanning the
/// text from the start for every annotation.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(index, _)| index + 1))
            .collect();

        Self { text, line_starts }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn position(&self, offset: usize) -> Position {
        let offset = floor_char_boundary(self.text, offset.min(self.text.len()));
        let line_index = self
            .line_starts
            .partition_point(|start| *start <= offset)
            .saturating_sub(1);
        let line_start = self.line_starts[line_index];
        let column = self.text[line_start..offset].chars().count() + 1;

        Position {
            line: line_index + 1,
            column,
        }
    }

    pub fn range(&self, span: &Span) -> Range {
        Range {
            start: self.position(span.start.offset),
            end: self.position(span.end.offset),
        }
    }
}

fn floor_char_boundary(text: &str, mut offset: usize) -> usize {
    while offset > 0 && !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_zero_is_start_of_text() {
        assert_eq!(offset_to_position("", 0), Position::START);
        assert_eq!(offset_to_position("<?php\n", 0), Position::START);
    }

    #[test]
    fn newline_resets_column_and_advances_line() {
        let text = "ab\ncd\n\nef";

        assert_eq!(offset_to_position(text, 1), Position::new(1, 2));
        assert_eq!(offset_to_position(text, 2), Position::new(1, 3));
        assert_eq!(offset_to_position(text, 3), Position::new(2, 1));
        assert_eq!(offset_to_position(text, 6), Position::new(3, 1));
        assert_eq!(offset_to_position(text, 7), Position::new(4, 1));
        assert_eq!(offset_to_position(text, 8), Position::new(4, 2));
    }

    #[test]
    fn offsets_past_end_clamp_to_after_last_character() {
        assert_eq!(offset_to_position("ab\nc", 100), Position::new(2, 2));
        assert_eq!(offset_to_position("ab\n", 100), Position::new(2, 1));
    }

    #[test]
    fn multibyte_characters_count_as_one_column() {
        let text = "é=1\nü";

        assert_eq!(offset_to_position(text, 2), Position::new(1, 2));
        assert_eq!(offset_to_position(text, 1), Position::new(1, 1));
        assert_eq!(offset_to_position(text, 5), Position::new(2, 1));
        assert_eq!(offset_to_position(text, 7), Position::new(2, 2));
    }

    #[test]
    fn line_index_agrees_with_linear_scan() {
        let text = "<?php\n\nfunction ünïcode() {\n  return 1;\n}\n";
        let index = LineIndex::new(text);

        for offset in 0..=text.len() + 3 {
            assert_eq!(
                index.position(offset),
                offset_to_position(text, offset),
                "offset {offset}"
            );
        }
        assert_eq!(index.line_count(), 6);
    }

    #[test]
    fn range_maps_both_span_edges() {
        let text = "<?php\necho $x;\n";
        let index = LineIndex::new(text);

        let range = index.range(&Span::new(11, 13));

        assert_eq!(range.start, Position::new(2, 6));
        assert_eq!(range.end, Position::new(2, 8));
    }
}
