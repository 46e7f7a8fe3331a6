//! Hard wrapping of editor text into terminal rows.

use std::ops::Range;

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Byte ranges of `text` laid out in rows at most `width` columns wide.
///
/// A `'\n'` ends a row and is not part of any range. There is always at
/// least one row.
pub(crate) fn wrap_ranges(text: &str, width: u16) -> Vec<Range<usize>> {
    let width = usize::from(width.max(1));
    let mut rows = Vec::new();
    let mut line_start = 0;
    for line in text.split('\n') {
        let mut row_start = line_start;
        let mut row_width = 0;
        for (offset, grapheme) in line.grapheme_indices(true) {
            let grapheme_width = grapheme.width();
            if row_width + grapheme_width > width && row_width > 0 {
                rows.push(row_start..line_start + offset);
                row_start = line_start + offset;
                row_width = 0;
            }
            row_width += grapheme_width;
        }
        rows.push(row_start..line_start + line.len());
        line_start += line.len() + 1;
    }
    rows
}

/// Row and column of byte offset `cursor` within `rows`.
///
/// A caret sitting exactly on a soft wrap is drawn at the start of the next
/// row.
pub(crate) fn cursor_row_col(text: &str, rows: &[Range<usize>], cursor: usize) -> (usize, usize) {
    for (idx, row) in rows.iter().enumerate() {
        if cursor < row.start || cursor > row.end {
            continue;
        }
        let soft_wrapped = rows
            .get(idx + 1)
            .is_some_and(|next| next.start == row.end);
        if cursor == row.end && soft_wrapped {
            continue;
        }
        return (idx, text[row.start..cursor].width());
    }
    let last = rows.len().saturating_sub(1);
    let col = rows
        .last()
        .map_or(0, |row| text[row.start..row.end].width());
    (last, col)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn wraps_long_lines_and_honors_newlines() {
        let text = "abcdef\ngh";
        assert_eq!(wrap_ranges(text, 4), vec![0..4, 4..6, 7..9]);
        assert_eq!(wrap_ranges("", 4), vec![0..0]);
        assert_eq!(wrap_ranges("a\n", 4), vec![0..1, 2..2]);
    }

    #[test]
    fn wide_graphemes_count_two_columns() {
        assert_eq!(wrap_ranges("你好吗", 4), vec![0..6, 6..9]);
    }

    #[test]
    fn cursor_on_soft_wrap_moves_to_next_row() {
        let text = "abcdef\ngh";
        let rows = wrap_ranges(text, 4);
        assert_eq!(cursor_row_col(text, &rows, 0), (0, 0));
        assert_eq!(cursor_row_col(text, &rows, 4), (1, 0));
        assert_eq!(cursor_row_col(text, &rows, 6), (1, 2));
        assert_eq!(cursor_row_col(text, &rows, 7), (2, 0));
        assert_eq!(cursor_row_col(text, &rows, 9), (2, 2));
    }
}
