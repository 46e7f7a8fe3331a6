//! A small block-structured rich-text engine.
//!
//! The document is a list of blocks (paragraphs and list items), each holding
//! runs of text that share one [`InlineStyle`]. Positions are character
//! indices into the document, where every block contributes its length plus
//! one for the newline that ends it. The serialized form is the markup a
//! WYSIWYG editor would produce (`<p><br></p>` for an empty document).

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::text::Span;
use unicode_width::UnicodeWidthStr;

use chat_input_protocol::ContentNode;
use chat_input_protocol::markup;
use chat_input_protocol::markup::Token;

use super::KeyOutcome;
use super::SurfaceView;
use super::word_boundary::beginning_of_previous_word;
use super::word_boundary::end_of_next_word;
use super::wrap::cursor_row_col;
use super::wrap::wrap_ranges;
use crate::render::renderable::Renderable;
use crate::style::parse_css_color;

pub const FONT_CLASS_PREFIX: &str = "ql-font-";
pub const SIZE_CLASS_PREFIX: &str = "custom-quill-chat-size-";

const VOID_TAGS: &[&str] = &["img", "hr", "input", "meta", "link", "wbr"];
const PARAGRAPH_TAGS: &[&str] = &[
    "p",
    "div",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "blockquote",
    "pre",
];

/// A caret position (`length == 0`) or a selected range, in document
/// characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub index: usize,
    pub length: usize,
}

impl Selection {
    pub fn caret(index: usize) -> Self {
        Self { index, length: 0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Ordered,
    Bullet,
}

/// A formatting action a toolbar button or shortcut can apply.
///
/// Value formats take `None` to clear the format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatCommand {
    Bold,
    Italic,
    Underline,
    Strike,
    Font(Option<String>),
    Size(Option<String>),
    Color(Option<String>),
    Background(Option<String>),
    Link(Option<String>),
    List(ListKind),
    Clean,
}

/// Inline formats carried by a run of text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub font: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub background: Option<String>,
    pub link: Option<String>,
}

impl InlineStyle {
    fn flag(&self, command: &FormatCommand) -> Option<bool> {
        match command {
            FormatCommand::Bold => Some(self.bold),
            FormatCommand::Italic => Some(self.italic),
            FormatCommand::Underline => Some(self.underline),
            FormatCommand::Strike => Some(self.strike),
            _ => None,
        }
    }

    /// Applies `command`; `on` is used by the toggling formats.
    fn apply(&mut self, command: &FormatCommand, on: bool) {
        match command {
            FormatCommand::Bold => self.bold = on,
            FormatCommand::Italic => self.italic = on,
            FormatCommand::Underline => self.underline = on,
            FormatCommand::Strike => self.strike = on,
            FormatCommand::Font(font) => self.font = font.clone(),
            FormatCommand::Size(size) => self.size = size.clone(),
            FormatCommand::Color(color) => self.color = color.clone(),
            FormatCommand::Background(background) => self.background = background.clone(),
            FormatCommand::Link(link) => self.link = link.clone(),
            FormatCommand::List(_) | FormatCommand::Clean => {}
        }
    }

    fn terminal_style(&self) -> Style {
        let mut style = Style::default();
        if self.bold {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.italic {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if self.underline || self.link.is_some() {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        if self.strike {
            style = style.add_modifier(Modifier::CROSSED_OUT);
        }
        if self.size.as_deref() == Some("small") {
            style = style.add_modifier(Modifier::DIM);
        }
        if let Some(color) = self.color.as_deref().and_then(parse_css_color) {
            style = style.fg(color);
        } else if self.link.is_some() {
            style = style.cyan();
        }
        if let Some(color) = self.background.as_deref().and_then(parse_css_color) {
            style = style.bg(color);
        }
        style
    }

    fn has_span(&self) -> bool {
        self.font.is_some() || self.size.is_some() || self.color.is_some() || self.background.is_some()
    }

    fn write_open(&self, out: &mut String) {
        if let Some(href) = &self.link {
            out.push_str(&format!(
                "<a href=\"{}\" rel=\"noopener noreferrer\" target=\"_blank\">",
                markup::escape_attribute(href)
            ));
        }
        let classes: Vec<String> = [
            self.font.as_ref().map(|font| format!("{FONT_CLASS_PREFIX}{font}")),
            self.size.as_ref().map(|size| format!("{SIZE_CLASS_PREFIX}{size}")),
        ]
        .into_iter()
        .flatten()
        .collect();
        let mut css = String::new();
        if let Some(color) = &self.color {
            css.push_str(&format!("color: {color};"));
        }
        if let Some(background) = &self.background {
            if !css.is_empty() {
                css.push(' ');
            }
            css.push_str(&format!("background-color: {background};"));
        }
        if self.has_span() {
            out.push_str("<span");
            if !classes.is_empty() {
                out.push_str(&format!(
                    " class=\"{}\"",
                    markup::escape_attribute(&classes.join(" "))
                ));
            }
            if !css.is_empty() {
                out.push_str(&format!(" style=\"{}\"", markup::escape_attribute(&css)));
            }
            out.push('>');
        }
        if self.bold {
            out.push_str("<strong>");
        }
        if self.italic {
            out.push_str("<em>");
        }
        if self.underline {
            out.push_str("<u>");
        }
        if self.strike {
            out.push_str("<s>");
        }
    }

    fn write_close(&self, out: &mut String) {
        if self.strike {
            out.push_str("</s>");
        }
        if self.underline {
            out.push_str("</u>");
        }
        if self.italic {
            out.push_str("</em>");
        }
        if self.bold {
            out.push_str("</strong>");
        }
        if self.has_span() {
            out.push_str("</span>");
        }
        if self.link.is_some() {
            out.push_str("</a>");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    OrderedItem,
    BulletItem,
}

impl From<ListKind> for BlockKind {
    fn from(kind: ListKind) -> Self {
        match kind {
            ListKind::Ordered => BlockKind::OrderedItem,
            ListKind::Bullet => BlockKind::BulletItem,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Run {
    text: String,
    style: InlineStyle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Block {
    kind: BlockKind,
    runs: Vec<Run>,
}

fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices().nth(chars).map_or(text.len(), |(idx, _)| idx)
}

impl Block {
    fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            runs: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.runs.iter().map(|run| run.text.chars().count()).sum()
    }

    fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    /// Ensures a run starts at `offset`; returns the index of that run.
    fn boundary(&mut self, offset: usize) -> usize {
        let mut start = 0;
        for idx in 0..self.runs.len() {
            if start == offset {
                return idx;
            }
            let len = self.runs[idx].text.chars().count();
            if offset < start + len {
                let split = byte_offset(&self.runs[idx].text, offset - start);
                let tail = self.runs[idx].text.split_off(split);
                let style = self.runs[idx].style.clone();
                self.runs.insert(idx + 1, Run { text: tail, style });
                return idx + 1;
            }
            start += len;
        }
        self.runs.len()
    }

    fn insert(&mut self, offset: usize, text: &str, style: InlineStyle) {
        if text.is_empty() {
            return;
        }
        let idx = self.boundary(offset);
        self.runs.insert(
            idx,
            Run {
                text: text.to_string(),
                style,
            },
        );
        self.normalize();
    }

    fn remove(&mut self, start: usize, end: usize) {
        let first = self.boundary(start);
        let last = self.boundary(end);
        self.runs.drain(first..last);
        self.normalize();
    }

    fn split_off(&mut self, offset: usize) -> Vec<Run> {
        let idx = self.boundary(offset);
        let tail = self.runs.split_off(idx);
        self.normalize();
        tail
    }

    fn restyle(&mut self, start: usize, end: usize, f: &mut impl FnMut(&mut InlineStyle)) {
        let first = self.boundary(start);
        let last = self.boundary(end);
        for run in &mut self.runs[first..last] {
            f(&mut run.style);
        }
        self.normalize();
    }

    /// Styles of the runs overlapping `start..end`.
    fn styles_in(&self, start: usize, end: usize) -> Vec<InlineStyle> {
        let mut out = Vec::new();
        let mut pos = 0;
        for run in &self.runs {
            let len = run.text.chars().count();
            if pos < end && pos + len > start {
                out.push(run.style.clone());
            }
            pos += len;
        }
        out
    }

    /// Style new text typed at `offset` picks up.
    fn style_before(&self, offset: usize) -> InlineStyle {
        let mut pos = 0;
        for run in &self.runs {
            let len = run.text.chars().count();
            if offset > pos && offset <= pos + len {
                return run.style.clone();
            }
            pos += len;
        }
        self.runs
            .first()
            .map(|run| run.style.clone())
            .unwrap_or_default()
    }

    fn normalize(&mut self) {
        self.runs.retain(|run| !run.text.is_empty());
        let mut merged: Vec<Run> = Vec::with_capacity(self.runs.len());
        for run in self.runs.drain(..) {
            match merged.last_mut() {
                Some(last) if last.style == run.style => last.text.push_str(&run.text),
                _ => merged.push(run),
            }
        }
        self.runs = merged;
    }

    fn write_markup(&self, out: &mut String) {
        if self.runs.is_empty() {
            out.push_str("<br>");
            return;
        }
        for run in &self.runs {
            run.style.write_open(out);
            out.push_str(&markup::escape_text(&run.text));
            run.style.write_close(out);
        }
    }
}

/// The rich-text engine behind the Rich editor mode.
pub trait RichEditorEngine: Renderable {
    /// Serialized markup of the document.
    fn html(&self) -> String;

    /// Plain text, one line per block, always ending in `'\n'`.
    fn text(&self) -> String;

    /// Text as displayed: blocks separated by newlines, no trailing newline.
    fn display_text(&self) -> String;

    fn nodes(&self) -> Vec<ContentNode>;

    /// Replaces the document with parsed markup. The caret is clamped.
    fn set_html(&mut self, html: &str);

    /// Document length, counting the newline ending each block.
    fn length(&self) -> usize;

    /// Current selection, or `None` when the editor is not focused.
    fn selection(&self) -> Option<Selection>;

    /// Moves the selection and focuses the editor.
    fn set_selection(&mut self, selection: Selection);

    /// Text covered by the selection, blocks joined with `'\n'`.
    fn selected_text(&self) -> String;

    /// Inline formats at the start of the selection, or the formats the next
    /// typed text will get.
    fn selection_style(&self) -> InlineStyle;

    /// Inserts text at the caret, replacing the selection. `'\n'` splits
    /// blocks.
    fn insert_text(&mut self, text: &str);

    fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome;

    /// Applies a format. Returns whether the document changed.
    fn apply(&mut self, command: &FormatCommand) -> bool;

    fn view(&self, width: u16) -> SurfaceView;

    fn set_focused(&mut self, focused: bool) -> bool;

    fn is_focused(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct BlockEditor {
    blocks: Vec<Block>,
    caret: usize,
    anchor: Option<usize>,
    pending_style: Option<InlineStyle>,
    focused: bool,
}

impl Default for BlockEditor {
    fn default() -> Self {
        Self {
            blocks: vec![Block::new(BlockKind::Paragraph)],
            caret: 0,
            anchor: None,
            pending_style: None,
            focused: false,
        }
    }
}

impl BlockEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last caret position (before the final newline).
    fn max_caret(&self) -> usize {
        self.length().saturating_sub(1)
    }

    fn locate(&self, index: usize) -> (usize, usize) {
        let mut rest = index;
        for (idx, block) in self.blocks.iter().enumerate() {
            let len = block.len();
            if rest <= len {
                return (idx, rest);
            }
            rest -= len + 1;
        }
        let last = self.blocks.len().saturating_sub(1);
        (last, self.blocks.get(last).map_or(0, Block::len))
    }

    fn doc_index(&self, block: usize, offset: usize) -> usize {
        self.blocks[..block]
            .iter()
            .map(|block| block.len() + 1)
            .sum::<usize>()
            + offset
    }

    fn selection_range(&self) -> Option<(usize, usize)> {
        let anchor = self.anchor?;
        (anchor != self.caret).then(|| (anchor.min(self.caret), anchor.max(self.caret)))
    }

    fn selected_blocks(&self) -> std::ops::RangeInclusive<usize> {
        let (start, end) = self
            .selection_range()
            .unwrap_or((self.caret, self.caret));
        self.locate(start).0..=self.locate(end).0
    }

    fn style_at_caret(&self) -> InlineStyle {
        let (block, offset) = self.locate(self.caret);
        self.blocks[block].style_before(offset)
    }

    fn move_to(&mut self, index: usize, extend: bool) -> KeyOutcome {
        if extend {
            self.anchor.get_or_insert(self.caret);
        } else {
            self.anchor = None;
        }
        self.caret = index.min(self.max_caret());
        self.pending_style = None;
        KeyOutcome::Handled
    }

    fn delete_range(&mut self, start: usize, end: usize) {
        if start < end {
            let (first_block, first_offset) = self.locate(start);
            let (last_block, last_offset) = self.locate(end);
            if first_block == last_block {
                self.blocks[first_block].remove(first_offset, last_offset);
            } else {
                let tail = self.blocks[last_block].split_off(last_offset);
                let first = &mut self.blocks[first_block];
                let len = first.len();
                first.remove(first_offset, len);
                first.runs.extend(tail);
                first.normalize();
                self.blocks.drain(first_block + 1..=last_block);
            }
        }
        self.caret = start;
        self.anchor = None;
    }

    fn delete_selection(&mut self) -> bool {
        match self.selection_range() {
            Some((start, end)) => {
                self.delete_range(start, end);
                true
            }
            None => {
                self.anchor = None;
                false
            }
        }
    }

    fn split_block(&mut self) {
        let (block, offset) = self.locate(self.caret);
        let tail = self.blocks[block].split_off(offset);
        let kind = self.blocks[block].kind;
        self.blocks.insert(block + 1, Block { kind, runs: tail });
        self.caret += 1;
    }

    fn enter(&mut self) {
        self.delete_selection();
        let (block, _) = self.locate(self.caret);
        let current = &mut self.blocks[block];
        if current.kind != BlockKind::Paragraph && current.runs.is_empty() {
            current.kind = BlockKind::Paragraph;
        } else {
            self.split_block();
        }
    }

    fn backspace(&mut self) -> KeyOutcome {
        if self.delete_selection() {
            return KeyOutcome::Edited;
        }
        let (block, offset) = self.locate(self.caret);
        if offset == 0 {
            if self.blocks[block].kind != BlockKind::Paragraph {
                self.blocks[block].kind = BlockKind::Paragraph;
                return KeyOutcome::Edited;
            }
            if block == 0 {
                return KeyOutcome::Handled;
            }
        }
        self.delete_range(self.caret - 1, self.caret);
        KeyOutcome::Edited
    }

    fn delete_forward(&mut self) -> KeyOutcome {
        if self.delete_selection() {
            return KeyOutcome::Edited;
        }
        if self.caret >= self.max_caret() {
            return KeyOutcome::Handled;
        }
        self.delete_range(self.caret, self.caret + 1);
        KeyOutcome::Edited
    }

    fn word_left(&self) -> usize {
        let (block, offset) = self.locate(self.caret);
        if offset == 0 {
            return self.caret.saturating_sub(1);
        }
        let text = self.blocks[block].text();
        let start = beginning_of_previous_word(&text, byte_offset(&text, offset));
        self.doc_index(block, text[..start].chars().count())
    }

    fn word_right(&self) -> usize {
        let (block, offset) = self.locate(self.caret);
        if offset == self.blocks[block].len() {
            return self.caret + 1;
        }
        let text = self.blocks[block].text();
        let end = end_of_next_word(&text, byte_offset(&text, offset));
        self.doc_index(block, text[..end].chars().count())
    }

    fn vertical(&self, up: bool) -> usize {
        let (block, offset) = self.locate(self.caret);
        let target = if up {
            block.checked_sub(1)
        } else {
            Some(block + 1).filter(|next| *next < self.blocks.len())
        };
        match target {
            Some(target) => self.doc_index(target, offset.min(self.blocks[target].len())),
            None if up => 0,
            None => self.max_caret(),
        }
    }

    fn for_each_block_in(&mut self, start: usize, end: usize, mut f: impl FnMut(&mut Block, usize, usize)) {
        let mut block_start = 0;
        for block in &mut self.blocks {
            let len = block.len();
            let block_end = block_start + len;
            if block_start < end && block_end > start {
                f(
                    block,
                    start.saturating_sub(block_start),
                    end.min(block_end) - block_start,
                );
            }
            block_start = block_end + 1;
        }
    }

    fn styles_in(&self, start: usize, end: usize) -> Vec<InlineStyle> {
        let mut out = Vec::new();
        let mut block_start = 0;
        for block in &self.blocks {
            let len = block.len();
            let block_end = block_start + len;
            if block_start < end && block_end > start {
                out.extend(block.styles_in(
                    start.saturating_sub(block_start),
                    end.min(block_end) - block_start,
                ));
            }
            block_start = block_end + 1;
        }
        out
    }

    fn restyle_range(&mut self, start: usize, end: usize, mut f: impl FnMut(&mut InlineStyle)) {
        self.for_each_block_in(start, end, |block, local_start, local_end| {
            block.restyle(local_start, local_end, &mut f);
        });
    }

    fn toggle_list(&mut self, kind: ListKind) -> bool {
        let target = BlockKind::from(kind);
        let range = self.selected_blocks();
        let all_set = self.blocks[range.clone()]
            .iter()
            .all(|block| block.kind == target);
        let next = if all_set { BlockKind::Paragraph } else { target };
        for block in &mut self.blocks[range] {
            block.kind = next;
        }
        true
    }

    fn styled_segments(
        block: &Block,
        block_start: usize,
        selection: Option<(usize, usize)>,
    ) -> Vec<(std::ops::Range<usize>, Style)> {
        let mut out = Vec::new();
        let mut byte = 0;
        let mut chars = block_start;
        for run in &block.runs {
            let style = run.style.terminal_style();
            let run_chars = run.text.chars().count();
            let mut cuts = vec![0, run_chars];
            if let Some((start, end)) = selection {
                for point in [start, end] {
                    if point > chars && point < chars + run_chars {
                        cuts.push(point - chars);
                    }
                }
            }
            cuts.sort_unstable();
            cuts.dedup();
            for pair in cuts.windows(2) {
                let (from, to) = (pair[0], pair[1]);
                let selected =
                    selection.is_some_and(|(start, end)| chars + from >= start && chars + to <= end);
                let range = byte + byte_offset(&run.text, from)..byte + byte_offset(&run.text, to);
                let style = if selected {
                    style.add_modifier(Modifier::REVERSED)
                } else {
                    style
                };
                out.push((range, style));
            }
            byte += run.text.len();
            chars += run_chars;
        }
        out
    }
}

impl RichEditorEngine for BlockEditor {
    fn html(&self) -> String {
        let mut out = String::new();
        let mut open_list: Option<BlockKind> = None;
        for block in &self.blocks {
            if open_list.is_some_and(|kind| kind != block.kind) {
                out.push_str(list_close(open_list));
                open_list = None;
            }
            match block.kind {
                BlockKind::Paragraph => {
                    out.push_str("<p>");
                    block.write_markup(&mut out);
                    out.push_str("</p>");
                }
                kind => {
                    if open_list.is_none() {
                        out.push_str(if kind == BlockKind::OrderedItem {
                            "<ol>"
                        } else {
                            "<ul>"
                        });
                        open_list = Some(kind);
                    }
                    out.push_str("<li>");
                    block.write_markup(&mut out);
                    out.push_str("</li>");
                }
            }
        }
        out.push_str(list_close(open_list));
        out
    }

    fn text(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            out.push_str(&block.text());
            out.push('\n');
        }
        out
    }

    fn display_text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn nodes(&self) -> Vec<ContentNode> {
        self.blocks
            .iter()
            .map(|block| match block.kind {
                BlockKind::Paragraph => ContentNode::Paragraph { text: block.text() },
                BlockKind::OrderedItem | BlockKind::BulletItem => ContentNode::ListItem {
                    ordered: block.kind == BlockKind::OrderedItem,
                    text: block.text(),
                },
            })
            .collect()
    }

    fn set_html(&mut self, html: &str) {
        let mut parser = BlockParser::default();
        for token in markup::tokenize(html) {
            parser.push(&token);
        }
        self.blocks = parser.finish();
        self.caret = self.caret.min(self.max_caret());
        self.anchor = None;
        self.pending_style = None;
    }

    fn length(&self) -> usize {
        self.blocks.iter().map(|block| block.len() + 1).sum()
    }

    fn selection(&self) -> Option<Selection> {
        if !self.focused {
            return None;
        }
        Some(match self.selection_range() {
            Some((start, end)) => Selection {
                index: start,
                length: end - start,
            },
            None => Selection::caret(self.caret),
        })
    }

    fn set_selection(&mut self, selection: Selection) {
        let max = self.max_caret();
        let start = selection.index.min(max);
        let end = (selection.index + selection.length).min(max);
        self.anchor = (end > start).then_some(start);
        self.caret = end;
        self.pending_style = None;
        self.focused = true;
    }

    fn selected_text(&self) -> String {
        self.selection_range()
            .map(|(start, end)| self.text().chars().skip(start).take(end - start).collect())
            .unwrap_or_default()
    }

    fn selection_style(&self) -> InlineStyle {
        match self.selection_range() {
            Some((start, end)) => self
                .styles_in(start, end)
                .into_iter()
                .next()
                .unwrap_or_default(),
            None => self
                .pending_style
                .clone()
                .unwrap_or_else(|| self.style_at_caret()),
        }
    }

    fn insert_text(&mut self, text: &str) {
        self.delete_selection();
        let style = self
            .pending_style
            .take()
            .unwrap_or_else(|| self.style_at_caret());
        for (idx, piece) in text.split('\n').enumerate() {
            if idx > 0 {
                self.split_block();
            }
            let piece = piece.replace('\r', "");
            let (block, offset) = self.locate(self.caret);
            self.blocks[block].insert(offset, &piece, style.clone());
            self.caret += piece.chars().count();
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome {
        if !matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
            return KeyOutcome::Ignored;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        match key.code {
            KeyCode::Char('a') if ctrl => {
                self.anchor = Some(0);
                self.caret = self.max_caret();
                KeyOutcome::Handled
            }
            KeyCode::Char(c) if !ctrl && !alt => {
                let mut buf = [0u8; 4];
                self.insert_text(c.encode_utf8(&mut buf));
                KeyOutcome::Edited
            }
            KeyCode::Enter => {
                self.enter();
                KeyOutcome::Edited
            }
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete_forward(),
            KeyCode::Left if ctrl || alt => self.move_to(self.word_left(), shift),
            KeyCode::Right if ctrl || alt => self.move_to(self.word_right(), shift),
            KeyCode::Left => {
                if !shift && let Some((start, _)) = self.selection_range() {
                    return self.move_to(start, false);
                }
                self.move_to(self.caret.saturating_sub(1), shift)
            }
            KeyCode::Right => {
                if !shift && let Some((_, end)) = self.selection_range() {
                    return self.move_to(end, false);
                }
                self.move_to(self.caret + 1, shift)
            }
            KeyCode::Home => {
                let (block, _) = self.locate(self.caret);
                self.move_to(self.doc_index(block, 0), shift)
            }
            KeyCode::End => {
                let (block, _) = self.locate(self.caret);
                let len = self.blocks[block].len();
                self.move_to(self.doc_index(block, len), shift)
            }
            KeyCode::Up => self.move_to(self.vertical(true), shift),
            KeyCode::Down => self.move_to(self.vertical(false), shift),
            _ => KeyOutcome::Ignored,
        }
    }

    fn apply(&mut self, command: &FormatCommand) -> bool {
        match command {
            FormatCommand::List(kind) => self.toggle_list(*kind),
            FormatCommand::Clean => match self.selection_range() {
                Some((start, end)) => {
                    self.restyle_range(start, end, |style| *style = InlineStyle::default());
                    let blocks = self.selected_blocks();
                    for block in &mut self.blocks[blocks] {
                        block.kind = BlockKind::Paragraph;
                    }
                    true
                }
                None => {
                    self.pending_style = Some(InlineStyle::default());
                    false
                }
            },
            command => match self.selection_range() {
                Some((start, end)) => {
                    let on = !self
                        .styles_in(start, end)
                        .iter()
                        .all(|style| style.flag(command).unwrap_or(false));
                    self.restyle_range(start, end, |style| style.apply(command, on));
                    true
                }
                None if matches!(command, FormatCommand::Link(_)) => false,
                None => {
                    let mut style = self
                        .pending_style
                        .take()
                        .unwrap_or_else(|| self.style_at_caret());
                    let on = !style.flag(command).unwrap_or(false);
                    style.apply(command, on);
                    self.pending_style = Some(style);
                    false
                }
            },
        }
    }

    fn view(&self, width: u16) -> SurfaceView {
        let mut lines = Vec::new();
        let mut caret = None;
        let (caret_block, caret_offset) = self.locate(self.caret);
        let selection = self.selection_range();
        let mut ordinal = 0;
        let mut block_start = 0;
        for (idx, block) in self.blocks.iter().enumerate() {
            let prefix = match block.kind {
                BlockKind::OrderedItem => {
                    ordinal += 1;
                    format!("{ordinal}. ")
                }
                BlockKind::BulletItem => {
                    ordinal = 0;
                    "• ".to_string()
                }
                BlockKind::Paragraph => {
                    ordinal = 0;
                    String::new()
                }
            };
            let prefix_width = u16::try_from(prefix.width()).unwrap_or(0);
            let text = block.text();
            let rows = wrap_ranges(&text, width.saturating_sub(prefix_width));
            let segments = Self::styled_segments(block, block_start, selection);
            for (row_idx, row) in rows.iter().enumerate() {
                let mut spans: Vec<Span<'static>> = Vec::new();
                if row_idx == 0 {
                    if !prefix.is_empty() {
                        spans.push(Span::from(prefix.clone()).dim());
                    }
                } else if prefix_width > 0 {
                    spans.push(" ".repeat(usize::from(prefix_width)).into());
                }
                for (range, style) in &segments {
                    let start = range.start.max(row.start);
                    let end = range.end.min(row.end);
                    if start < end {
                        spans.push(Span::styled(text[start..end].to_string(), *style));
                    }
                }
                lines.push(Line::from(spans));
            }
            if self.focused && idx == caret_block {
                let (row, col) = cursor_row_col(&text, &rows, byte_offset(&text, caret_offset));
                caret = Some((
                    lines.len() - rows.len() + row,
                    prefix_width.saturating_add(u16::try_from(col).unwrap_or(u16::MAX)),
                ));
            }
            block_start += block.len() + 1;
        }
        SurfaceView { lines, caret }
    }

    fn set_focused(&mut self, focused: bool) -> bool {
        self.focused = focused;
        if !focused {
            self.anchor = None;
        }
        self.focused
    }

    fn is_focused(&self) -> bool {
        self.focused
    }
}

impl Renderable for BlockEditor {
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

fn list_close(kind: Option<BlockKind>) -> &'static str {
    match kind {
        Some(BlockKind::OrderedItem) => "</ol>",
        Some(BlockKind::BulletItem) => "</ul>",
        _ => "",
    }
}

/// Rebuilds blocks from markup tokens.
#[derive(Default)]
struct BlockParser {
    blocks: Vec<Block>,
    current: Option<Block>,
    lists: Vec<BlockKind>,
    styles: Vec<(String, InlineStyle)>,
}

impl BlockParser {
    fn style(&self) -> InlineStyle {
        self.styles
            .last()
            .map(|(_, style)| style.clone())
            .unwrap_or_default()
    }

    fn open_block(&mut self, kind: BlockKind) {
        self.close_block();
        self.current = Some(Block::new(kind));
    }

    fn close_block(&mut self) {
        if let Some(block) = self.current.take() {
            self.blocks.push(block);
        }
    }

    fn append(&mut self, text: &str) {
        let style = self.style();
        let block = self
            .current
            .get_or_insert_with(|| Block::new(BlockKind::Paragraph));
        let len = block.len();
        block.insert(len, text, style);
    }

    fn push_text(&mut self, text: &str) {
        if self.current.is_some() {
            self.append(&text.replace(['\r', '\n'], " "));
            return;
        }
        if text.trim().is_empty() {
            return;
        }
        for (idx, line) in text.split('\n').enumerate() {
            if idx > 0 {
                self.close_block();
            }
            self.append(line.trim_end_matches('\r'));
        }
    }

    fn push(&mut self, token: &Token<'_>) {
        match token {
            Token::Text(text) => self.push_text(text),
            Token::Open {
                name, self_closing, ..
            } => {
                let name: &str = name;
                if PARAGRAPH_TAGS.contains(&name) {
                    self.open_block(BlockKind::Paragraph);
                } else if name == "ol" {
                    self.close_block();
                    self.lists.push(BlockKind::OrderedItem);
                } else if name == "ul" {
                    self.close_block();
                    self.lists.push(BlockKind::BulletItem);
                } else if name == "li" {
                    let kind = match token.attr("data-list") {
                        Some("bullet") => BlockKind::BulletItem,
                        Some("ordered") => BlockKind::OrderedItem,
                        _ => self
                            .lists
                            .last()
                            .copied()
                            .unwrap_or(BlockKind::BulletItem),
                    };
                    self.open_block(kind);
                } else if name == "br" {
                    // A lone <br> is the empty-block placeholder.
                    if let Some(kind) = self
                        .current
                        .as_ref()
                        .filter(|block| !block.runs.is_empty())
                        .map(|block| block.kind)
                    {
                        self.open_block(kind);
                    }
                } else if !*self_closing && !VOID_TAGS.contains(&name) {
                    let style = inline_style_for(token, name, self.style());
                    self.styles.push((name.to_string(), style));
                }
            }
            Token::Close { name } => {
                let name: &str = name;
                if PARAGRAPH_TAGS.contains(&name) || name == "li" {
                    self.close_block();
                } else if name == "ol" || name == "ul" {
                    self.close_block();
                    self.lists.pop();
                } else if let Some(pos) = self.styles.iter().rposition(|(open, _)| *open == name) {
                    self.styles.truncate(pos);
                }
            }
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.close_block();
        if self.blocks.is_empty() {
            self.blocks.push(Block::new(BlockKind::Paragraph));
        }
        self.blocks
    }
}

fn inline_style_for(token: &Token<'_>, name: &str, parent: InlineStyle) -> InlineStyle {
    let mut style = parent;
    match name {
        "strong" | "b" => style.bold = true,
        "em" | "i" => style.italic = true,
        "u" => style.underline = true,
        "s" | "strike" | "del" => style.strike = true,
        "a" => style.link = token.attr("href").map(str::to_string),
        _ => {}
    }
    if let Some(class) = token.attr("class") {
        for class in class.split_whitespace() {
            if let Some(font) = class.strip_prefix(FONT_CLASS_PREFIX) {
                style.font = Some(font.to_string());
            } else if let Some(size) = class.strip_prefix(SIZE_CLASS_PREFIX) {
                style.size = Some(size.to_string());
            }
        }
    }
    if let Some(css) = token.attr("style") {
        for declaration in css.split(';') {
            let Some((property, value)) = declaration.split_once(':') else {
                continue;
            };
            let value = Some(value.trim().to_string()).filter(|value| !value.is_empty());
            match property.trim().to_ascii_lowercase().as_str() {
                "color" => style.color = value,
                "background-color" | "background" => style.background = value,
                _ => {}
            }
        }
    }
    style
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn typed(text: &str) -> BlockEditor {
        let mut editor = BlockEditor::new();
        editor.set_focused(true);
        for c in text.chars() {
            let code = if c == '\n' {
                KeyCode::Enter
            } else {
                KeyCode::Char(c)
            };
            editor.handle_key(key(code));
        }
        editor
    }

    fn select_all(editor: &mut BlockEditor) {
        editor.handle_key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL));
    }

    #[test]
    fn empty_document_serializes_as_placeholder_paragraph() {
        let editor = BlockEditor::new();
        assert_eq!(editor.html(), "<p><br></p>");
        assert_eq!(editor.text(), "\n");
        assert_eq!(editor.display_text(), "");
        assert_eq!(editor.length(), 1);
        assert!(!markup::has_visible_text(&editor.html()));
    }

    #[test]
    fn typed_text_projects_into_every_form() {
        let editor = typed("Hi\nthere");
        assert_eq!(editor.html(), "<p>Hi</p><p>there</p>");
        assert_eq!(editor.text(), "Hi\nthere\n");
        assert_eq!(editor.display_text(), "Hi\nthere");
        assert_eq!(
            editor.nodes(),
            vec![
                ContentNode::Paragraph {
                    text: "Hi".to_string()
                },
                ContentNode::Paragraph {
                    text: "there".to_string()
                },
            ]
        );
        assert_eq!(editor.length(), 9);
    }

    #[test]
    fn text_is_escaped_in_markup() {
        let editor = typed("<b> & co");
        assert_eq!(editor.html(), "<p>&lt;b&gt; &amp; co</p>");
    }

    #[test]
    fn bold_without_selection_applies_to_next_typed_text() {
        let mut editor = typed("a");
        assert!(!editor.apply(&FormatCommand::Bold));
        editor.handle_key(key(KeyCode::Char('b')));
        editor.apply(&FormatCommand::Bold);
        editor.handle_key(key(KeyCode::Char('c')));
        assert_eq!(editor.html(), "<p>a<strong>b</strong>c</p>");
    }

    #[test]
    fn formats_apply_to_selection_and_toggle_off() {
        let mut editor = typed("hello world");
        editor.set_selection(Selection {
            index: 0,
            length: 5,
        });
        assert!(editor.apply(&FormatCommand::Italic));
        assert_eq!(editor.html(), "<p><em>hello</em> world</p>");
        editor.apply(&FormatCommand::Italic);
        assert_eq!(editor.html(), "<p>hello world</p>");
    }

    #[test]
    fn color_font_and_size_serialize_as_span() {
        let mut editor = typed("hey");
        select_all(&mut editor);
        editor.apply(&FormatCommand::Color(Some("#e60000".to_string())));
        editor.apply(&FormatCommand::Font(Some("georgia".to_string())));
        editor.apply(&FormatCommand::Size(Some("large".to_string())));
        insta::assert_snapshot!(editor.html(), @r#"<p><span class="ql-font-georgia custom-quill-chat-size-large" style="color: #e60000;">hey</span></p>"#);

        editor.apply(&FormatCommand::Color(None));
        editor.apply(&FormatCommand::Font(None));
        editor.apply(&FormatCommand::Size(None));
        assert_eq!(editor.html(), "<p>hey</p>");
    }

    #[test]
    fn link_requires_a_selection() {
        let mut editor = typed("docs");
        assert!(!editor.apply(&FormatCommand::Link(Some("https://x.test".to_string()))));
        select_all(&mut editor);
        editor.apply(&FormatCommand::Link(Some("https://x.test".to_string())));
        assert_eq!(
            editor.html(),
            "<p><a href=\"https://x.test\" rel=\"noopener noreferrer\" target=\"_blank\">docs</a></p>"
        );
    }

    #[test]
    fn selection_queries_report_text_and_formats() {
        let mut editor = typed("one\ntwo");
        assert_eq!(editor.selected_text(), "");
        editor.set_selection(Selection {
            index: 2,
            length: 3,
        });
        assert_eq!(editor.selected_text(), "e\nt");
        editor.apply(&FormatCommand::Underline);
        assert!(editor.selection_style().underline);
        editor.set_selection(Selection::caret(0));
        assert!(!editor.selection_style().underline);
    }

    #[test]
    fn list_toggle_wraps_blocks() {
        let mut editor = typed("one\ntwo");
        select_all(&mut editor);
        editor.apply(&FormatCommand::List(ListKind::Ordered));
        assert_eq!(editor.html(), "<ol><li>one</li><li>two</li></ol>");
        assert_eq!(
            editor.nodes()[1],
            ContentNode::ListItem {
                ordered: true,
                text: "two".to_string()
            }
        );
        editor.apply(&FormatCommand::List(ListKind::Ordered));
        assert_eq!(editor.html(), "<p>one</p><p>two</p>");
    }

    #[test]
    fn enter_on_empty_list_item_leaves_the_list() {
        let mut editor = typed("one");
        editor.apply(&FormatCommand::List(ListKind::Bullet));
        editor.handle_key(key(KeyCode::Enter));
        assert_eq!(editor.html(), "<ul><li>one</li><li><br></li></ul>");
        editor.handle_key(key(KeyCode::Enter));
        assert_eq!(editor.html(), "<ul><li>one</li></ul><p><br></p>");
    }

    #[test]
    fn backspace_unlists_then_merges_blocks() {
        let mut editor = typed("a\nb");
        editor.apply(&FormatCommand::List(ListKind::Bullet));
        editor.handle_key(key(KeyCode::Home));
        editor.handle_key(key(KeyCode::Backspace));
        assert_eq!(editor.html(), "<p>a</p><p>b</p>");
        editor.handle_key(key(KeyCode::Backspace));
        assert_eq!(editor.html(), "<p>ab</p>");
        assert_eq!(editor.selection(), Some(Selection::caret(1)));
    }

    #[test]
    fn typing_replaces_selection_across_blocks() {
        let mut editor = typed("abc\ndef");
        editor.set_selection(Selection {
            index: 1,
            length: 5,
        });
        editor.handle_key(key(KeyCode::Char('X')));
        assert_eq!(editor.html(), "<p>aXf</p>");
    }

    #[test]
    fn set_html_parses_editor_markup() {
        let mut editor = BlockEditor::new();
        let html = "<p>a <strong>b</strong></p><ul><li>c</li></ul><p><span style=\"background-color: #ffff00;\">d</span></p>";
        editor.set_html(html);
        assert_eq!(editor.html(), html);
        assert_eq!(editor.display_text(), "a b\nc\nd");
    }

    #[test]
    fn set_html_accepts_plain_text_and_empty_markup() {
        let mut editor = BlockEditor::new();
        editor.set_html("Hi");
        assert_eq!(editor.html(), "<p>Hi</p>");
        editor.set_html("");
        assert_eq!(editor.html(), "<p><br></p>");
        editor.set_html("<p><br></p>");
        assert_eq!(editor.length(), 1);
        editor.set_html("<ol><li data-list=\"bullet\">x</li></ol>");
        assert_eq!(editor.html(), "<ul><li>x</li></ul>");
    }

    #[test]
    fn selection_is_hidden_while_unfocused() {
        let mut editor = typed("abc");
        assert_eq!(editor.selection(), Some(Selection::caret(3)));
        editor.set_focused(false);
        assert_eq!(editor.selection(), None);
        editor.set_selection(Selection::caret(1));
        assert!(editor.is_focused());
        assert_eq!(editor.selection(), Some(Selection::caret(1)));
    }

    #[test]
    fn view_prefixes_list_items() {
        let mut editor = typed("one\ntwo");
        select_all(&mut editor);
        editor.apply(&FormatCommand::List(ListKind::Ordered));
        editor.set_selection(Selection::caret(7));
        let view = editor.view(20);
        let rows: Vec<String> = view
            .lines
            .iter()
            .map(|line| line.spans.iter().map(|span| span.content.as_ref()).collect())
            .collect();
        assert_eq!(rows, vec!["1. one".to_string(), "2. two".to_string()]);
        assert_eq!(view.caret, Some((1, 6)));
    }
}
