//! Attachment chips shown next to the editor.

use std::fmt;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::text::Span;
use unicode_width::UnicodeWidthStr;

use chat_input_protocol::FileDescriptor;
use chat_input_protocol::FileId;
use chat_input_protocol::file_label::CHIP_NAME_MAX_CHARS;
use chat_input_protocol::file_label::format_size_mb;
use chat_input_protocol::file_label::mime_short_label;
use chat_input_protocol::file_label::truncate_file_name;
use chat_input_protocol::markup::escape_attribute;
use chat_input_protocol::markup::escape_text;

use crate::render::renderable::Renderable;

/// Supplies the glyphs drawn on attachment chips.
pub trait FileIconProvider: Send + Sync {
    fn file_icon(&self, mime_type: &str) -> String;
    fn delete_icon(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFileIcons;

impl FileIconProvider for DefaultFileIcons {
    fn file_icon(&self, mime_type: &str) -> String {
        if mime_type.starts_with("image/") {
            "▣".to_string()
        } else {
            "▤".to_string()
        }
    }

    fn delete_icon(&self) -> String {
        "✕".to_string()
    }
}

impl fmt::Debug for dyn FileIconProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FileIconProvider")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentChip {
    pub id: FileId,
    /// Display name, truncated.
    pub name: String,
    pub kind_label: &'static str,
    pub size: String,
    pub icon: String,
    pub delete_icon: String,
}

impl AttachmentChip {
    pub fn new(file: &FileDescriptor, icons: &dyn FileIconProvider) -> Self {
        Self {
            id: file.id.clone(),
            name: truncate_file_name(&file.name, CHIP_NAME_MAX_CHARS),
            kind_label: mime_short_label(&file.mime_type),
            size: format_size_mb(file.size_bytes),
            icon: icons.file_icon(&file.mime_type),
            delete_icon: icons.delete_icon(),
        }
    }

    /// Markup for hosts that render chips as HTML. Every interpolated value is
    /// escaped.
    pub fn to_markup(&self) -> String {
        let id = escape_attribute(self.id.as_str());
        format!(
            concat!(
                "<div class=\"ql-file-embed-box\" id=\"{id}\">",
                "<div class=\"file-box\">",
                "<div class=\"ql-file-icon\">{icon}</div>",
                "<div class=\"ql-file-info\">",
                "<div class=\"ql-file-name\">{name}</div>",
                "<div class=\"ql-file-meta\"><div>{label}</div>",
                "<div class=\"file-meta-gray-dot\"></div><div>{size}</div></div>",
                "</div>",
                "<div class=\"ql-file-close\" data-file-id=\"{id}\">{delete}</div>",
                "</div></div>"
            ),
            id = id,
            icon = escape_text(&self.icon),
            name = escape_text(&self.name),
            label = self.kind_label,
            size = escape_text(&self.size),
            delete = escape_text(&self.delete_icon),
        )
    }

    fn body_spans(&self) -> Vec<Span<'static>> {
        vec![
            "[".dim(),
            Span::from(format!("{} ", self.icon)),
            Span::from(self.name.clone()).bold(),
            Span::from(format!(" {} · {} ", self.kind_label, self.size)).dim(),
        ]
    }

    fn body_width(&self) -> u16 {
        let width: usize = self.body_spans().iter().map(Span::width).sum();
        u16::try_from(width).unwrap_or(u16::MAX)
    }

    pub fn width(&self) -> u16 {
        self.body_width()
            .saturating_add(u16::try_from(self.delete_icon.width()).unwrap_or(0))
            .saturating_add(1)
    }

    pub fn line(&self) -> Line<'static> {
        let mut spans = self.body_spans();
        spans.push(Span::from(self.delete_icon.clone()).red());
        spans.push("]".dim());
        Line::from(spans)
    }
}

/// Part of a chip under a mouse position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChipHit {
    Body(FileId),
    Delete(FileId),
}

/// Flex-wrapped row of chips kept in sync with the tracked attachments.
#[derive(Debug, Default, Clone)]
pub struct ChipContainer {
    chips: Vec<AttachmentChip>,
}

const CHIP_GAP: u16 = 1;

impl ChipContainer {
    pub fn insert(&mut self, chip: AttachmentChip) {
        self.chips.retain(|existing| existing.id != chip.id);
        self.chips.push(chip);
    }

    pub fn remove(&mut self, id: &FileId) -> bool {
        let before = self.chips.len();
        self.chips.retain(|chip| chip.id != *id);
        self.chips.len() != before
    }

    pub fn clear(&mut self) {
        self.chips.clear();
    }

    pub fn chips(&self) -> &[AttachmentChip] {
        &self.chips
    }

    pub fn is_empty(&self) -> bool {
        self.chips.is_empty()
    }

    pub fn to_markup(&self) -> String {
        self.chips.iter().map(AttachmentChip::to_markup).collect()
    }

    /// Position of every chip relative to the container's top-left corner.
    fn layout(&self, width: u16) -> Vec<(Rect, &AttachmentChip)> {
        let width = width.max(1);
        let mut out = Vec::with_capacity(self.chips.len());
        let (mut x, mut y) = (0u16, 0u16);
        for chip in &self.chips {
            let chip_width = chip.width().min(width);
            if x > 0 && x.saturating_add(chip_width) > width {
                x = 0;
                y += 1;
            }
            out.push((Rect::new(x, y, chip_width, 1), chip));
            x = x.saturating_add(chip_width).saturating_add(CHIP_GAP);
        }
        out
    }

    pub fn hit_test(&self, area: Rect, column: u16, row: u16) -> Option<ChipHit> {
        if column < area.x || row < area.y {
            return None;
        }
        let (col, row) = (column - area.x, row - area.y);
        self.layout(area.width).into_iter().find_map(|(rect, chip)| {
            if row != rect.y || col < rect.x || col >= rect.x + rect.width {
                return None;
            }
            let delete_start = rect.x + chip.body_width();
            Some(if col >= delete_start {
                ChipHit::Delete(chip.id.clone())
            } else {
                ChipHit::Body(chip.id.clone())
            })
        })
    }
}

impl Renderable for ChipContainer {
    fn render(&self, area: Rect, buf: &mut Buffer) {
        for (rect, chip) in self.layout(area.width) {
            let target = Rect::new(area.x + rect.x, area.y + rect.y, rect.width, 1).intersection(area);
            if !target.is_empty() {
                chip.line().render(target, buf);
            }
        }
    }

    fn desired_height(&self, width: u16) -> u16 {
        self.layout(width)
            .last()
            .map_or(0, |(rect, _)| rect.y + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_input_protocol::FileBlob;
    use chat_input_protocol::PickedFile;
    use pretty_assertions::assert_eq;

    fn descriptor(name: &str, mime: &str, size: usize) -> FileDescriptor {
        FileDescriptor::from_picked(PickedFile::new(
            name,
            mime,
            FileBlob::new(vec![0u8; size]),
        ))
    }

    fn row_text(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn chip_truncates_name_and_labels_type() {
        let file = descriptor("quarterly-report-final.pdf", "application/pdf", 1_572_864);
        let chip = AttachmentChip::new(&file, &DefaultFileIcons);
        assert_eq!(chip.name, "quarterly-...");
        assert_eq!(chip.kind_label, "PDF");
        assert_eq!(chip.size, "1.50 MB");
    }

    #[test]
    fn markup_escapes_file_name() {
        let mut file = descriptor("<img onerror=x>.png", "image/png", 10);
        file.id = FileId::from("file-1");
        let chip = AttachmentChip::new(&file, &DefaultFileIcons);
        let markup = chip.to_markup();
        assert!(markup.contains("<div class=\"ql-file-name\">&lt;img onerr...</div>"));
        assert!(markup.contains("data-file-id=\"file-1\""));
        assert!(!markup.contains("<img"));
    }

    #[test]
    fn renders_chips_and_hit_tests_delete_glyph() {
        let mut container = ChipContainer::default();
        let file = descriptor("a.csv", "text/csv", 0);
        let chip = AttachmentChip::new(&file, &DefaultFileIcons);
        let width = chip.width();
        container.insert(chip);

        let area = Rect::new(0, 0, 40, container.desired_height(40));
        let mut buf = Buffer::empty(area);
        container.render(area, &mut buf);
        assert_eq!(row_text(&buf, 0).trim_end(), "[▤ a.csv CSV · 0.00 MB ✕]");

        assert_eq!(
            container.hit_test(area, width - 2, 0),
            Some(ChipHit::Delete(file.id.clone()))
        );
        assert_eq!(container.hit_test(area, 1, 0), Some(ChipHit::Body(file.id.clone())));
        assert_eq!(container.hit_test(area, width + 3, 0), None);
    }

    #[test]
    fn chips_wrap_onto_new_rows() {
        let mut container = ChipContainer::default();
        for name in ["one.pdf", "two.pdf", "three.pdf"] {
            container.insert(AttachmentChip::new(
                &descriptor(name, "application/pdf", 1),
                &DefaultFileIcons,
            ));
        }
        let width = container.chips()[0].width() + 4;
        assert_eq!(container.desired_height(width), 3);
        let second = container.chips()[1].id.clone();
        assert!(container.remove(&second));
        assert_eq!(container.chips().len(), 2);
        assert!(!container.remove(&FileId::from("missing")));
    }
}
