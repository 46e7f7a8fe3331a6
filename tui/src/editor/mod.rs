//! Editing back-ends behind the message input and the pieces they share.

mod adapter;
pub mod block_editor;
pub mod chip;
pub mod registry;
pub mod text_surface;
mod word_boundary;
mod wrap;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::text::Line;

use crate::render::renderable::Renderable;

pub use adapter::CustomSurface;
pub use adapter::EditorAdapter;

/// What a surface did with a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The content changed.
    Edited,
    /// The key was consumed without changing the content (caret moves,
    /// selection, pending formats).
    Handled,
    Ignored,
    /// The rich toolbar's file action was triggered.
    FileAction,
}

/// Wrapped rows of a surface plus the caret as `(row, column)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceView {
    pub lines: Vec<Line<'static>>,
    pub caret: Option<(usize, u16)>,
}

impl SurfaceView {
    pub fn row_count(&self) -> usize {
        self.lines.len()
    }

    /// Rows `offset..offset + height`, with the caret shifted accordingly
    /// (dropped when it falls outside the window).
    pub fn window(&self, offset: usize, height: usize) -> SurfaceView {
        let lines = self
            .lines
            .iter()
            .skip(offset)
            .take(height)
            .cloned()
            .collect();
        let caret = self.caret.and_then(|(row, col)| {
            (row >= offset && row < offset + height).then_some((row - offset, col))
        });
        SurfaceView { lines, caret }
    }
}

impl Renderable for SurfaceView {
    fn render(&self, area: Rect, buf: &mut Buffer) {
        for (line, y) in self.lines.iter().zip(area.top()..area.bottom()) {
            line.render(Rect::new(area.x, y, area.width, 1), buf);
        }
    }

    fn desired_height(&self, _width: u16) -> u16 {
        u16::try_from(self.lines.len().max(1)).unwrap_or(u16::MAX)
    }

    fn cursor_pos(&self, area: Rect) -> Option<(u16, u16)> {
        let (row, col) = self.caret?;
        let row = u16::try_from(row).ok()?;
        if row >= area.height || area.width == 0 {
            return None;
        }
        Some((area.x + col.min(area.width - 1), area.y + row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn view(rows: &[&str], caret: Option<(usize, u16)>) -> SurfaceView {
        SurfaceView {
            lines: rows.iter().map(|row| Line::from(row.to_string())).collect(),
            caret,
        }
    }

    #[test]
    fn window_shifts_caret_and_drops_it_outside() {
        let full = view(&["a", "b", "c", "d"], Some((2, 1)));
        let window = full.window(1, 2);
        assert_eq!(window, view(&["b", "c"], Some((1, 1))));
        assert_eq!(full.window(3, 2).caret, None);
    }

    #[test]
    fn renders_rows_and_clamps_cursor_to_area() {
        let surface = view(&["hello", "world"], Some((1, 9)));
        let area = Rect::new(2, 1, 5, 2);
        let mut buf = Buffer::empty(Rect::new(0, 0, 8, 3));
        surface.render(area, &mut buf);
        let row: String = (2..7).map(|x| buf[(x, 2)].symbol().to_string()).collect();
        assert_eq!(row, "world");
        assert_eq!(surface.cursor_pos(area), Some((6, 2)));
        assert_eq!(surface.desired_height(5), 2);
        assert_eq!(SurfaceView::default().desired_height(5), 1);
    }
}
