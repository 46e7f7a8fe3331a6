//! Scroll container around the editor.
//!
//! The editor grows with its content up to `max_rows`, then scrolls. In fancy
//! mode the rightmost column holds a scrollbar; otherwise the container is a
//! plain wrapper with the same clipping.

use std::cell::Cell;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::widgets::Scrollbar;
use ratatui::widgets::ScrollbarOrientation;
use ratatui::widgets::ScrollbarState;
use ratatui::widgets::StatefulWidget;

use crate::editor::SurfaceView;
use crate::render::renderable::Renderable;

const SCROLLBAR_COLS: u16 = 1;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ScrollState {
    offset: usize,
    content_rows: usize,
    /// The user scrolled away from the caret; cleared by a refresh.
    detached: bool,
}

#[derive(Debug)]
pub struct EditorContainer {
    fancy: bool,
    max_rows: u16,
    state: Cell<ScrollState>,
}

impl EditorContainer {
    pub fn new(fancy: bool, max_rows: u16) -> Self {
        Self {
            fancy,
            max_rows: max_rows.max(1),
            state: Cell::new(ScrollState::default()),
        }
    }

    pub fn is_fancy(&self) -> bool {
        self.fancy
    }

    /// Width left for the editor once the scrollbar column is reserved.
    pub fn content_width(&self, width: u16) -> u16 {
        if self.fancy && width > SCROLLBAR_COLS {
            width - SCROLLBAR_COLS
        } else {
            width
        }
    }

    /// Rows the container takes for `view`.
    pub fn height(&self, view: &SurfaceView) -> u16 {
        u16::try_from(view.row_count())
            .unwrap_or(u16::MAX)
            .clamp(1, self.max_rows)
    }

    /// Re-attaches the viewport to the caret after the content changed.
    pub fn refresh(&self) {
        let mut state = self.state.get();
        state.detached = false;
        self.state.set(state);
    }

    /// Mouse-wheel scrolling. Detaches the viewport from the caret until the
    /// next refresh.
    pub fn scroll_by(&self, delta: isize) {
        let mut state = self.state.get();
        let max_offset = state
            .content_rows
            .saturating_sub(usize::from(self.max_rows));
        state.offset = state.offset.saturating_add_signed(delta).min(max_offset);
        state.detached = true;
        self.state.set(state);
    }

    pub fn offset(&self) -> usize {
        self.state.get().offset
    }

    /// Caret position within the window drawn by the last render.
    pub fn cursor_pos(&self, view: &SurfaceView, area: Rect) -> Option<(u16, u16)> {
        let content_area = Rect {
            width: self.content_width(area.width),
            ..area
        };
        view.window(self.offset(), usize::from(area.height))
            .cursor_pos(content_area)
    }

    /// Draws the visible window of `view` and returns the screen position of
    /// the caret, if it is visible.
    pub fn render(&self, view: &SurfaceView, area: Rect, buf: &mut Buffer) -> Option<(u16, u16)> {
        if area.is_empty() {
            return None;
        }
        let height = usize::from(area.height);
        let rows = view.row_count();
        let max_offset = rows.saturating_sub(height);

        let mut state = self.state.get();
        if !state.detached
            && let Some((row, _)) = view.caret
        {
            if row < state.offset {
                state.offset = row;
            } else if row >= state.offset + height {
                state.offset = row + 1 - height;
            }
        }
        state.offset = state.offset.min(max_offset);
        state.content_rows = rows;
        self.state.set(state);

        let content_area = Rect {
            width: self.content_width(area.width),
            ..area
        };
        let window = view.window(state.offset, height);
        window.render(content_area, buf);

        if self.fancy && rows > height && content_area.width < area.width {
            let track = Rect {
                x: area.right() - SCROLLBAR_COLS,
                width: SCROLLBAR_COLS,
                ..area
            };
            let mut scrollbar = ScrollbarState::new(max_offset + 1)
                .position(state.offset)
                .viewport_content_length(height);
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(None)
                .end_symbol(None)
                .render(track, buf, &mut scrollbar);
        }

        window.cursor_pos(content_area)
    }
}
