//! The plain editable surface: a multi-line text buffer with a caret.

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::text::Line;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use super::KeyOutcome;
use super::SurfaceView;
use super::word_boundary::beginning_of_previous_word;
use super::word_boundary::clamp_to_char_boundary;
use super::word_boundary::end_of_next_word;
use super::wrap::cursor_row_col;
use super::wrap::wrap_ranges;
use crate::render::renderable::Renderable;

/// An editing surface holding unformatted text.
///
/// Implementors report whether a key changed the content so the caller can
/// emit exactly one change notification per mutation.
pub trait EditableSurface: Renderable {
    fn text(&self) -> &str;

    /// Replaces the content. The caret is clamped into the new text.
    fn set_text(&mut self, text: &str);

    /// Caret as a byte offset into [`EditableSurface::text`].
    fn cursor(&self) -> usize;

    fn set_cursor(&mut self, pos: usize);

    fn insert_str(&mut self, text: &str);

    fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome;

    fn view(&self, width: u16) -> SurfaceView;

    /// Gives or takes focus. Returns whether the surface is focused afterwards.
    fn set_focused(&mut self, focused: bool) -> bool;

    fn is_focused(&self) -> bool;

    fn move_cursor_to_end(&mut self) {
        let end = self.text().len();
        self.set_cursor(end);
    }
}

#[derive(Debug, Default, Clone)]
pub struct TextSurface {
    text: String,
    cursor: usize,
    focused: bool,
}

impl TextSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn replace_range(&mut self, range: std::ops::Range<usize>, with: &str) {
        self.text.replace_range(range.clone(), with);
        self.cursor = range.start + with.len();
    }

    fn prev_grapheme(&self) -> usize {
        self.text[..self.cursor]
            .grapheme_indices(true)
            .next_back()
            .map_or(0, |(idx, _)| idx)
    }

    fn next_grapheme(&self) -> usize {
        self.text[self.cursor..]
            .graphemes(true)
            .next()
            .map_or(self.text.len(), |g| self.cursor + g.len())
    }

    fn line_start(&self) -> usize {
        self.text[..self.cursor].rfind('\n').map_or(0, |idx| idx + 1)
    }

    fn line_end(&self) -> usize {
        self.text[self.cursor..]
            .find('\n')
            .map_or(self.text.len(), |idx| self.cursor + idx)
    }

    /// Moves to the same display column on the previous (`up`) or next line.
    fn move_vertical(&mut self, up: bool) -> bool {
        let start = self.line_start();
        let column = self.text[start..self.cursor].width();
        let (target_start, target_end) = if up {
            if start == 0 {
                return false;
            }
            let prev_end = start - 1;
            let prev_start = self.text[..prev_end].rfind('\n').map_or(0, |idx| idx + 1);
            (prev_start, prev_end)
        } else {
            let end = self.line_end();
            if end == self.text.len() {
                return false;
            }
            let next_start = end + 1;
            let next_end = self.text[next_start..]
                .find('\n')
                .map_or(self.text.len(), |idx| next_start + idx);
            (next_start, next_end)
        };
        let mut pos = target_start;
        let mut width = 0;
        for (idx, grapheme) in self.text[target_start..target_end].grapheme_indices(true) {
            let next = width + grapheme.width();
            if next > column {
                break;
            }
            width = next;
            pos = target_start + idx + grapheme.len();
        }
        self.cursor = pos;
        true
    }

    fn delete_backward(&mut self, to: usize) -> KeyOutcome {
        if to >= self.cursor {
            return KeyOutcome::Handled;
        }
        self.replace_range(to..self.cursor, "");
        KeyOutcome::Edited
    }

    fn delete_forward(&mut self, to: usize) -> KeyOutcome {
        if to <= self.cursor {
            return KeyOutcome::Handled;
        }
        let cursor = self.cursor;
        self.replace_range(cursor..to, "");
        KeyOutcome::Edited
    }

    fn moved(&mut self, to: usize) -> KeyOutcome {
        self.cursor = to;
        KeyOutcome::Handled
    }
}

impl EditableSurface for TextSurface {
    fn text(&self) -> &str {
        &self.text
    }

    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor = clamp_to_char_boundary(&self.text, self.cursor);
    }

    fn cursor(&self) -> usize {
        self.cursor
    }

    fn set_cursor(&mut self, pos: usize) {
        self.cursor = clamp_to_char_boundary(&self.text, pos);
    }

    fn insert_str(&mut self, text: &str) {
        let cursor = self.cursor;
        self.replace_range(cursor..cursor, text);
    }

    fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome {
        if !matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
            return KeyOutcome::Ignored;
        }
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('w') if ctrl => {
                self.delete_backward(beginning_of_previous_word(&self.text, self.cursor))
            }
            KeyCode::Char('u') if ctrl => self.delete_backward(self.line_start()),
            KeyCode::Char('k') if ctrl => self.delete_forward(self.line_end()),
            KeyCode::Char('a') if ctrl => self.moved(self.line_start()),
            KeyCode::Char('e') if ctrl => self.moved(self.line_end()),
            KeyCode::Char('d') if alt => {
                self.delete_forward(end_of_next_word(&self.text, self.cursor))
            }
            KeyCode::Char('b') if alt => {
                self.moved(beginning_of_previous_word(&self.text, self.cursor))
            }
            KeyCode::Char('f') if alt => self.moved(end_of_next_word(&self.text, self.cursor)),
            KeyCode::Char(c) if !ctrl && !alt => {
                let mut buf = [0u8; 4];
                self.insert_str(c.encode_utf8(&mut buf));
                KeyOutcome::Edited
            }
            KeyCode::Enter => {
                self.insert_str("\n");
                KeyOutcome::Edited
            }
            KeyCode::Backspace if alt || ctrl => {
                self.delete_backward(beginning_of_previous_word(&self.text, self.cursor))
            }
            KeyCode::Backspace => self.delete_backward(self.prev_grapheme()),
            KeyCode::Delete if alt || ctrl => {
                self.delete_forward(end_of_next_word(&self.text, self.cursor))
            }
            KeyCode::Delete => self.delete_forward(self.next_grapheme()),
            KeyCode::Left if alt || ctrl => {
                self.moved(beginning_of_previous_word(&self.text, self.cursor))
            }
            KeyCode::Left => self.moved(self.prev_grapheme()),
            KeyCode::Right if alt || ctrl => {
                self.moved(end_of_next_word(&self.text, self.cursor))
            }
            KeyCode::Right => self.moved(self.next_grapheme()),
            KeyCode::Home => self.moved(self.line_start()),
            KeyCode::End => self.moved(self.line_end()),
            KeyCode::Up => {
                if !self.move_vertical(true) {
                    self.cursor = 0;
                }
                KeyOutcome::Handled
            }
            KeyCode::Down => {
                if !self.move_vertical(false) {
                    self.cursor = self.text.len();
                }
                KeyOutcome::Handled
            }
            _ => KeyOutcome::Ignored,
        }
    }

    fn view(&self, width: u16) -> SurfaceView {
        let rows = wrap_ranges(&self.text, width);
        let caret = self.focused.then(|| {
            let (row, col) = cursor_row_col(&self.text, &rows, self.cursor);
            (row, u16::try_from(col).unwrap_or(u16::MAX))
        });
        let lines = rows
            .iter()
            .map(|row| Line::from(self.text[row.clone()].to_string()))
            .collect();
        SurfaceView { lines, caret }
    }

    fn set_focused(&mut self, focused: bool) -> bool {
        self.focused = focused;
        self.focused
    }

    fn is_focused(&self) -> bool {
        self.focused
    }
}

impl Renderable for TextSurface {
    fn render(&self, area: Rect, buf: &mut Buffer) {
        self.view(area.width).render(area, buf);
    }

    fn desired_height(&self, width: u16) -> u16 {
        self.view(width).desired_height(width)
    }

    fn cursor_pos(&self, area: Rect) -> Option<(u16, u16)> {
        self.view(area.width).cursor_pos(area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn typed(text: &str) -> TextSurface {
        let mut surface = TextSurface::new();
        for c in text.chars() {
            surface.handle_key(key(KeyCode::Char(c)));
        }
        surface
    }

    #[test]
    fn typing_and_backspace_edit_at_caret() {
        let mut surface = typed("helo");
        surface.handle_key(key(KeyCode::Left));
        assert_eq!(surface.handle_key(key(KeyCode::Char('l'))), KeyOutcome::Edited);
        assert_eq!(surface.text(), "hello");
        surface.handle_key(key(KeyCode::End));
        assert_eq!(surface.handle_key(key(KeyCode::Backspace)), KeyOutcome::Edited);
        assert_eq!(surface.text(), "hell");
    }

    #[test]
    fn backspace_at_start_is_not_an_edit() {
        let mut surface = typed("a");
        surface.set_cursor(0);
        assert_eq!(surface.handle_key(key(KeyCode::Backspace)), KeyOutcome::Handled);
        assert_eq!(surface.text(), "a");
    }

    #[test]
    fn backspace_removes_whole_grapheme() {
        let mut surface = TextSurface::new();
        surface.insert_str("ae\u{301}");
        surface.handle_key(key(KeyCode::Backspace));
        assert_eq!(surface.text(), "a");
    }

    #[test]
    fn word_deletion_and_movement() {
        let mut surface = typed("hello big world");
        surface.handle_key(KeyEvent::new(KeyCode::Char('w'), KeyModifiers::CONTROL));
        assert_eq!(surface.text(), "hello big ");
        surface.handle_key(KeyEvent::new(KeyCode::Left, KeyModifiers::ALT));
        assert_eq!(surface.cursor(), 6);
        surface.handle_key(KeyEvent::new(KeyCode::Right, KeyModifiers::ALT));
        assert_eq!(surface.cursor(), 9);
    }

    #[test]
    fn enter_inserts_newline_and_vertical_moves_keep_column() {
        let mut surface = typed("abcd");
        surface.handle_key(key(KeyCode::Enter));
        for c in "xy".chars() {
            surface.handle_key(key(KeyCode::Char(c)));
        }
        assert_eq!(surface.text(), "abcd\nxy");
        surface.handle_key(key(KeyCode::Up));
        assert_eq!(surface.cursor(), 2);
        surface.handle_key(key(KeyCode::End));
        surface.handle_key(key(KeyCode::Down));
        assert_eq!(surface.cursor(), 7);
    }

    #[test]
    fn control_chords_are_not_inserted() {
        let mut surface = typed("a");
        let outcome = surface.handle_key(KeyEvent::new(KeyCode::Char('o'), KeyModifiers::CONTROL));
        assert_eq!(outcome, KeyOutcome::Ignored);
        assert_eq!(surface.text(), "a");
    }

    #[test]
    fn view_wraps_and_reports_caret_only_when_focused() {
        let mut surface = TextSurface::new();
        surface.set_text("abcdef");
        surface.move_cursor_to_end();
        let view = surface.view(4);
        assert_eq!(view.lines.len(), 2);
        assert_eq!(view.caret, None);

        surface.set_focused(true);
        assert_eq!(surface.view(4).caret, Some((1, 2)));
    }

    #[test]
    fn set_text_clamps_caret() {
        let mut surface = typed("hello");
        surface.set_text("hé");
        assert_eq!(surface.cursor(), 3);
        surface.set_text("");
        assert_eq!(surface.cursor(), 0);
    }
}
