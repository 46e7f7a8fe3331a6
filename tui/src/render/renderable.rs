use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::WidgetRef;

/// Something that draws itself into a rect and can say how tall it wants to
/// be at a given width.
pub trait Renderable {
    fn render(&self, area: Rect, buf: &mut Buffer);
    fn desired_height(&self, width: u16) -> u16;
    fn cursor_pos(&self, _area: Rect) -> Option<(u16, u16)> {
        None
    }
}

impl Renderable for Span<'_> {
    fn render(&self, area: Rect, buf: &mut Buffer) {
        self.render_ref(area, buf);
    }

    fn desired_height(&self, _width: u16) -> u16 {
        1
    }
}

impl Renderable for Line<'_> {
    fn render(&self, area: Rect, buf: &mut Buffer) {
        WidgetRef::render_ref(self, area, buf);
    }

    fn desired_height(&self, _width: u16) -> u16 {
        1
    }
}

/// `None` takes no rows.
impl<R: Renderable> Renderable for Option<R> {
    fn render(&self, area: Rect, buf: &mut Buffer) {
        if let Some(renderable) = self {
            renderable.render(area, buf);
        }
    }

    fn desired_height(&self, width: u16) -> u16 {
        self.as_ref()
            .map_or(0, |renderable| renderable.desired_height(width))
    }

    fn cursor_pos(&self, area: Rect) -> Option<(u16, u16)> {
        self.as_ref().and_then(|renderable| renderable.cursor_pos(area))
    }
}
