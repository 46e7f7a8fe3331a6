//! Word-wise caret movement and deletion for editing surfaces.

use unicode_segmentation::UnicodeSegmentation;

/// ASCII punctuation treated as a word of its own.
pub const WORD_SEPARATORS: &str = "`~!@#$%^&*()-=+[{]}\\|;:'\",.<>/?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    start: usize,
    end: usize,
    is_whitespace: bool,
}

/// Byte index of the start of the word before `cursor_pos`.
pub fn beginning_of_previous_word(text: &str, cursor_pos: usize) -> usize {
    let cursor_pos = clamp_to_char_boundary(text, cursor_pos);
    segments(text)
        .into_iter()
        .rev()
        .find(|segment| !segment.is_whitespace && segment.start < cursor_pos)
        .map_or(0, |segment| segment.start)
}

/// Byte index of the end of the word after `cursor_pos`.
pub fn end_of_next_word(text: &str, cursor_pos: usize) -> usize {
    let cursor_pos = clamp_to_char_boundary(text, cursor_pos);
    segments(text)
        .into_iter()
        .find(|segment| !segment.is_whitespace && segment.end > cursor_pos)
        .map_or(text.len(), |segment| segment.end)
}

pub(crate) fn clamp_to_char_boundary(text: &str, pos: usize) -> usize {
    let mut pos = pos.min(text.len());
    while pos > 0 && !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

fn segments(text: &str) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::new();
    for (start, word) in text.split_word_bound_indices() {
        let end = start + word.len();
        let is_whitespace = word.chars().all(char::is_whitespace);
        if is_whitespace {
            match out.last_mut() {
                Some(last) if last.is_whitespace => last.end = end,
                _ => out.push(Segment {
                    start,
                    end,
                    is_whitespace,
                }),
            }
            continue;
        }
        let is_separator = word.chars().all(|c| WORD_SEPARATORS.contains(c));
        match out.last_mut() {
            // Runs of punctuation ("...", "->") move as one unit.
            Some(last)
                if is_separator
                    && !last.is_whitespace
                    && text[last.start..last.end]
                        .chars()
                        .all(|c| WORD_SEPARATORS.contains(c)) =>
            {
                last.end = end;
            }
            _ => out.push(Segment {
                start,
                end,
                is_whitespace,
            }),
        }
    }
    out
}
