use std::sync::Arc;

use crossterm::event::KeyEvent;
use ratatui::text::Line;

use chat_input_protocol::ChangeEvent;
use chat_input_protocol::ContentNode;
use chat_input_protocol::ContentSnapshot;
use chat_input_protocol::EditorMode;
use chat_input_protocol::markup::has_visible_text;
use chat_input_protocol::markup::visible_text;

use super::KeyOutcome;
use super::SurfaceView;
use super::block_editor::BlockEditor;
use super::block_editor::FormatCommand;
use super::block_editor::RichEditorEngine;
use super::block_editor::Selection;
use super::registry::RichEditorRegistry;
use super::registry::ToolbarItem;
use super::text_surface::EditableSurface;
use super::text_surface::TextSurface;
use super::wrap::wrap_ranges;
use crate::file_pick::PickRequest;
use crate::handlers::FileActionHandler;

/// An editing surface owned by the caller, used in [`EditorMode::Custom`].
///
/// The raw value is whatever markup the surface produces; the input only
/// reads its visible text.
pub trait CustomSurface {
    fn value(&self) -> String;

    fn set_value(&mut self, value: &str);

    fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome;

    /// Returns whether the paste changed the value.
    fn handle_paste(&mut self, _text: &str) -> bool {
        false
    }

    fn view(&self, width: u16) -> SurfaceView;

    /// Best-effort focus. Returns whether the surface took focus.
    fn focus(&mut self) -> bool {
        false
    }

    fn blur(&mut self) {}

    fn is_focused(&self) -> bool {
        false
    }
}

/// Palette and whitelist positions of the toolbar's cycling buttons.
#[derive(Debug, Default)]
struct ToolbarCursor {
    font: Option<String>,
    size: Option<String>,
    color: Option<usize>,
    background: Option<usize>,
}

pub struct RichAdapter {
    engine: Box<dyn RichEditorEngine>,
    registry: Arc<RichEditorRegistry>,
    file_action: Option<FileActionHandler>,
    cursor: ToolbarCursor,
}

pub struct PlainAdapter {
    surface: Box<dyn EditableSurface>,
}

pub struct CustomAdapter {
    surface: Option<Box<dyn CustomSurface>>,
    value: String,
}

/// The editing back-end of a message input. The variant is chosen once and
/// never changes.
pub enum EditorAdapter {
    Rich(RichAdapter),
    Plain(PlainAdapter),
    Custom(CustomAdapter),
}

impl EditorAdapter {
    pub fn for_mode(mode: EditorMode, registry: Arc<RichEditorRegistry>) -> Self {
        match mode {
            EditorMode::Rich => Self::rich(Box::new(BlockEditor::new()), registry),
            EditorMode::Plain => Self::plain(Box::new(TextSurface::new())),
            EditorMode::Custom => Self::custom(None),
        }
    }

    pub fn rich(engine: Box<dyn RichEditorEngine>, registry: Arc<RichEditorRegistry>) -> Self {
        Self::Rich(RichAdapter {
            engine,
            registry,
            file_action: None,
            cursor: ToolbarCursor::default(),
        })
    }

    pub fn plain(surface: Box<dyn EditableSurface>) -> Self {
        Self::Plain(PlainAdapter { surface })
    }

    pub fn custom(surface: Option<Box<dyn CustomSurface>>) -> Self {
        let value = surface.as_ref().map(|s| s.value()).unwrap_or_default();
        Self::Custom(CustomAdapter { surface, value })
    }

    pub fn mode(&self) -> EditorMode {
        match self {
            EditorAdapter::Rich(_) => EditorMode::Rich,
            EditorAdapter::Plain(_) => EditorMode::Plain,
            EditorAdapter::Custom(_) => EditorMode::Custom,
        }
    }

    /// The content in the back-end's native form: markup for Rich and
    /// Custom, text for Plain.
    pub fn raw_value(&self) -> String {
        match self {
            EditorAdapter::Rich(rich) => rich.engine.html(),
            EditorAdapter::Plain(plain) => plain.surface.text().to_string(),
            EditorAdapter::Custom(custom) => custom
                .surface
                .as_ref()
                .map_or_else(|| custom.value.clone(), |surface| surface.value()),
        }
    }

    pub fn extract_content(&self, raw_value: &str) -> ContentSnapshot {
        match self {
            EditorAdapter::Rich(rich) => {
                if rich.engine.html() == raw_value {
                    engine_snapshot(rich.engine.as_ref())
                } else {
                    let mut scratch = BlockEditor::new();
                    scratch.set_html(raw_value);
                    engine_snapshot(&scratch)
                }
            }
            // Plain text stands in for markup and there is no block structure.
            EditorAdapter::Plain(_) => ContentSnapshot {
                html: Some(raw_value.to_string()),
                text: Some(raw_value.to_string()),
                display_text: Some(raw_value.to_string()),
                nodes: Some(Vec::new()),
            },
            EditorAdapter::Custom(_) => ContentSnapshot {
                html: None,
                text: Some(raw_value.to_string()),
                display_text: Some(visible_text(raw_value)),
                nodes: None,
            },
        }
    }

    pub fn notify_change(&self, raw_value: &str) -> ChangeEvent {
        ChangeEvent {
            raw_value: raw_value.to_string(),
            content: self.extract_content(raw_value),
        }
    }

    /// Whether `raw_value` has anything worth sending. Markup counts only by
    /// its visible text, so formatting-only content is empty.
    pub fn is_sendable(&self, raw_value: &str) -> bool {
        match self {
            EditorAdapter::Plain(_) => !raw_value.trim().is_empty(),
            EditorAdapter::Rich(_) | EditorAdapter::Custom(_) => has_visible_text(raw_value),
        }
    }

    pub fn focus(&mut self) -> bool {
        match self {
            EditorAdapter::Rich(rich) => rich.engine.set_focused(true),
            EditorAdapter::Plain(plain) => plain.surface.set_focused(true),
            EditorAdapter::Custom(custom) => custom.surface.as_mut().is_some_and(|s| s.focus()),
        }
    }

    pub fn blur(&mut self) {
        match self {
            EditorAdapter::Rich(rich) => {
                rich.engine.set_focused(false);
            }
            EditorAdapter::Plain(plain) => {
                plain.surface.set_focused(false);
            }
            EditorAdapter::Custom(custom) => {
                if let Some(surface) = custom.surface.as_mut() {
                    surface.blur();
                }
            }
        }
    }

    pub fn is_focused(&self) -> bool {
        match self {
            EditorAdapter::Rich(rich) => rich.engine.is_focused(),
            EditorAdapter::Plain(plain) => plain.surface.is_focused(),
            EditorAdapter::Custom(custom) => custom.surface.as_ref().is_some_and(|s| s.is_focused()),
        }
    }

    /// Installs the picker opened by the rich toolbar's file action. Other
    /// modes have no file action and drop the handler.
    pub fn register_file_action(&mut self, handler: FileActionHandler) {
        let mode = self.mode();
        match self {
            EditorAdapter::Rich(rich) => rich.file_action = Some(handler),
            EditorAdapter::Plain(_) | EditorAdapter::Custom(_) => {
                tracing::debug!("{mode} editor has no file action");
            }
        }
    }

    pub fn has_file_action(&self) -> bool {
        matches!(self, EditorAdapter::Rich(rich) if rich.file_action.is_some())
    }

    /// Hands `request` to the registered picker. Returns `false` when there
    /// is none.
    pub fn open_file_picker(&mut self, request: PickRequest) -> bool {
        match self {
            EditorAdapter::Rich(RichAdapter {
                file_action: Some(handler),
                ..
            }) => {
                handler(request);
                true
            }
            _ => false,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome {
        match self {
            EditorAdapter::Rich(rich) => match rich.registry.item_for_shortcut(&key) {
                Some(item) => rich.apply_toolbar(item),
                None => rich.engine.handle_key(key),
            },
            EditorAdapter::Plain(plain) => plain.surface.handle_key(key),
            EditorAdapter::Custom(custom) => custom
                .surface
                .as_mut()
                .map_or(KeyOutcome::Ignored, |surface| surface.handle_key(key)),
        }
    }

    /// Inserts pasted text at the caret. Returns whether the content changed.
    pub fn handle_paste(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        match self {
            EditorAdapter::Rich(rich) => {
                rich.engine.insert_text(&text);
                true
            }
            EditorAdapter::Plain(plain) => {
                plain.surface.insert_str(&text);
                true
            }
            EditorAdapter::Custom(custom) => custom
                .surface
                .as_mut()
                .is_some_and(|surface| surface.handle_paste(&text)),
        }
    }

    /// Pushes a value into the surface. Returns whether the surface content
    /// was replaced.
    pub fn set_value(&mut self, raw_value: &str) -> bool {
        match self {
            EditorAdapter::Rich(rich) => {
                if rich.engine.html() == raw_value {
                    return false;
                }
                rich.engine.set_html(raw_value);
                true
            }
            EditorAdapter::Plain(plain) => {
                if plain.surface.text() == raw_value {
                    return false;
                }
                plain.surface.set_text(raw_value);
                true
            }
            EditorAdapter::Custom(custom) => {
                let current = custom
                    .surface
                    .as_ref()
                    .map_or_else(|| custom.value.clone(), |surface| surface.value());
                if current == raw_value {
                    return false;
                }
                custom.value = raw_value.to_string();
                if let Some(surface) = custom.surface.as_mut() {
                    surface.set_value(raw_value);
                }
                true
            }
        }
    }

    pub fn clear(&mut self) {
        match self {
            EditorAdapter::Rich(rich) => rich.engine.set_html(""),
            EditorAdapter::Plain(plain) => plain.surface.set_text(""),
            EditorAdapter::Custom(custom) => {
                custom.value.clear();
                if let Some(surface) = custom.surface.as_mut() {
                    surface.set_value("");
                }
            }
        }
    }

    pub fn move_caret_to_end(&mut self) {
        match self {
            EditorAdapter::Rich(rich) => {
                let end = rich.engine.length();
                rich.engine.set_selection(Selection::caret(end));
            }
            EditorAdapter::Plain(plain) => plain.surface.move_cursor_to_end(),
            EditorAdapter::Custom(_) => {}
        }
    }

    /// The selection to restore after an attachment is embedded. Without a
    /// selection the caret goes to the end of the document.
    pub fn caret_for_embed(&self) -> Option<Selection> {
        match self {
            EditorAdapter::Rich(rich) => Some(
                rich.engine
                    .selection()
                    .unwrap_or_else(|| Selection::caret(rich.engine.length())),
            ),
            EditorAdapter::Plain(_) | EditorAdapter::Custom(_) => None,
        }
    }

    pub fn restore_caret(&mut self, selection: Selection) {
        if let EditorAdapter::Rich(rich) = self {
            rich.engine.set_selection(selection);
        }
    }

    pub fn apply_toolbar(&mut self, item: ToolbarItem) -> KeyOutcome {
        match self {
            EditorAdapter::Rich(rich) => rich.apply_toolbar(item),
            EditorAdapter::Plain(_) | EditorAdapter::Custom(_) => KeyOutcome::Ignored,
        }
    }

    /// Enabled toolbar items with their icons. Empty outside Rich mode.
    pub fn toolbar(&self) -> Vec<(ToolbarItem, String)> {
        match self {
            EditorAdapter::Rich(rich) => rich
                .registry
                .items()
                .map(|item| (item, rich.registry.icon(item).to_string()))
                .collect(),
            EditorAdapter::Plain(_) | EditorAdapter::Custom(_) => Vec::new(),
        }
    }

    /// Whether the surface shows nothing, so the placeholder may be drawn.
    pub fn is_blank(&self) -> bool {
        match self {
            EditorAdapter::Rich(rich) => rich.engine.length() <= 1 && {
                let nodes = rich.engine.nodes();
                matches!(nodes.as_slice(), [ContentNode::Paragraph { .. }])
            },
            EditorAdapter::Plain(plain) => plain.surface.text().is_empty(),
            EditorAdapter::Custom(_) => !has_visible_text(&self.raw_value()),
        }
    }

    pub fn view(&self, width: u16) -> SurfaceView {
        match self {
            EditorAdapter::Rich(rich) => rich.engine.view(width),
            EditorAdapter::Plain(plain) => plain.surface.view(width),
            EditorAdapter::Custom(custom) => match custom.surface.as_ref() {
                Some(surface) => surface.view(width),
                None => read_only_view(&visible_text(&custom.value), width),
            },
        }
    }
}

impl RichAdapter {
    fn apply_toolbar(&mut self, item: ToolbarItem) -> KeyOutcome {
        if !self.registry.allows(item) {
            return KeyOutcome::Ignored;
        }
        let command = match item {
            ToolbarItem::File => return KeyOutcome::FileAction,
            ToolbarItem::Font => {
                self.cursor.font = self.registry.next_font(self.cursor.font.as_deref());
                FormatCommand::Font(self.cursor.font.clone())
            }
            ToolbarItem::Size => {
                self.cursor.size = self.registry.next_size(self.cursor.size.as_deref());
                FormatCommand::Size(self.cursor.size.clone())
            }
            ToolbarItem::Color | ToolbarItem::Background => {
                let background = item == ToolbarItem::Background;
                let slot = if background {
                    &mut self.cursor.background
                } else {
                    &mut self.cursor.color
                };
                let idx = self.registry.next_palette_index(*slot);
                *slot = Some(idx);
                match self.registry.palette.get(idx) {
                    Some(entry) => entry.command(background),
                    None => return KeyOutcome::Ignored,
                }
            }
            ToolbarItem::Bold => FormatCommand::Bold,
            ToolbarItem::Italic => FormatCommand::Italic,
            ToolbarItem::Underline => FormatCommand::Underline,
            ToolbarItem::Strike => FormatCommand::Strike,
            ToolbarItem::Link => match self.link_command() {
                Some(command) => command,
                None => return KeyOutcome::Handled,
            },
            ToolbarItem::OrderedList | ToolbarItem::BulletList => {
                match RichEditorRegistry::list_command(item) {
                    Some(command) => command,
                    None => return KeyOutcome::Ignored,
                }
            }
            ToolbarItem::Clean => FormatCommand::Clean,
        };
        tracing::trace!("toolbar {item:?} -> {command:?}");
        if self.engine.apply(&command) {
            KeyOutcome::Edited
        } else {
            KeyOutcome::Handled
        }
    }

    /// Unlinks a linked selection, otherwise links the selected text to
    /// itself when it reads as a URL.
    fn link_command(&self) -> Option<FormatCommand> {
        if self.engine.selection().is_none_or(|sel| sel.length == 0) {
            return None;
        }
        if self.engine.selection_style().link.is_some() {
            return Some(FormatCommand::Link(None));
        }
        let selected = self.engine.selected_text();
        let target = selected.trim();
        if target.is_empty() || target.contains(char::is_whitespace) {
            return None;
        }
        let parsed = url::Url::parse(target)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .or_else(|| url::Url::parse(&format!("https://{target}")).ok())?;
        Some(FormatCommand::Link(Some(parsed.to_string())))
    }
}

fn engine_snapshot(engine: &dyn RichEditorEngine) -> ContentSnapshot {
    ContentSnapshot {
        html: Some(engine.html()),
        text: Some(engine.text()),
        display_text: Some(engine.display_text()),
        nodes: Some(engine.nodes()),
    }
}

fn read_only_view(text: &str, width: u16) -> SurfaceView {
    let lines = wrap_ranges(text, width)
        .into_iter()
        .map(|row| Line::from(text[row].to_string()))
        .collect();
    SurfaceView { lines, caret: None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyCode;
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(adapter: &mut EditorAdapter, text: &str) {
        for c in text.chars() {
            adapter.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn rich() -> EditorAdapter {
        let mut adapter = EditorAdapter::for_mode(EditorMode::Rich, RichEditorRegistry::shared());
        adapter.focus();
        adapter
    }

    #[test]
    fn plain_content_reports_text_in_every_string_projection() {
        let adapter = EditorAdapter::for_mode(EditorMode::Plain, RichEditorRegistry::shared());
        let event = adapter.notify_change("Hi\n\nthere");
        assert_eq!(
            event,
            ChangeEvent {
                raw_value: "Hi\n\nthere".to_string(),
                content: ContentSnapshot {
                    html: Some("Hi\n\nthere".to_string()),
                    text: Some("Hi\n\nthere".to_string()),
                    display_text: Some("Hi\n\nthere".to_string()),
                    nodes: Some(Vec::new()),
                },
            }
        );
    }

    #[test]
    fn rich_content_reports_every_projection() {
        let mut adapter = rich();
        type_text(&mut adapter, "Hi");
        let raw = adapter.raw_value();
        assert_eq!(raw, "<p>Hi</p>");
        let content = adapter.extract_content(&raw);
        assert_eq!(content.text.as_deref(), Some("Hi\n"));
        assert_eq!(content.display_text.as_deref(), Some("Hi"));
        assert_eq!(
            content.nodes,
            Some(vec![ContentNode::Paragraph {
                text: "Hi".to_string()
            }])
        );

        let other = adapter.extract_content("<ul><li>x</li></ul>");
        assert_eq!(other.html.as_deref(), Some("<ul><li>x</li></ul>"));
        assert_eq!(other.display_text.as_deref(), Some("x"));
    }

    #[test]
    fn custom_content_is_judged_by_visible_text() {
        let mut adapter = EditorAdapter::custom(None);
        assert!(adapter.set_value("<p><strong></strong></p>"));
        assert!(!adapter.is_sendable(&adapter.raw_value()));
        assert!(adapter.is_blank());
        let content = adapter.extract_content("<p>a &amp; b</p>");
        assert_eq!(content.html, None);
        assert_eq!(content.nodes, None);
        assert_eq!(content.text.as_deref(), Some("<p>a &amp; b</p>"));
        assert_eq!(content.display_text.as_deref(), Some("a & b\n"));
        assert!(!adapter.focus());
    }

    #[test]
    fn sendability_per_mode() {
        let plain = EditorAdapter::for_mode(EditorMode::Plain, RichEditorRegistry::shared());
        assert!(!plain.is_sendable("  \n "));
        assert!(plain.is_sendable("<b></b>"));
        let rich = rich();
        assert!(!rich.is_sendable("<p><br></p>"));
        assert!(rich.is_sendable("<p>x</p>"));
    }

    #[test]
    fn rich_shortcuts_dispatch_toolbar_commands() {
        let mut adapter = rich();
        type_text(&mut adapter, "hey");
        adapter.handle_key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL));
        let outcome = adapter.handle_key(KeyEvent::new(KeyCode::Char('b'), KeyModifiers::CONTROL));
        assert_eq!(outcome, KeyOutcome::Edited);
        assert_eq!(adapter.raw_value(), "<p><strong>hey</strong></p>");
        assert_eq!(
            adapter.handle_key(KeyEvent::new(KeyCode::Char('o'), KeyModifiers::CONTROL)),
            KeyOutcome::FileAction
        );
    }

    #[test]
    fn color_cycles_palette_and_remove_clears() {
        let mut adapter = rich();
        type_text(&mut adapter, "c");
        adapter.handle_key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL));
        assert_eq!(adapter.apply_toolbar(ToolbarItem::Color), KeyOutcome::Edited);
        assert_eq!(
            adapter.raw_value(),
            "<p><span style=\"color: #000000;\">c</span></p>"
        );
        let palette_len = RichEditorRegistry::shared().palette.len();
        for _ in 1..palette_len {
            adapter.apply_toolbar(ToolbarItem::Color);
        }
        assert_eq!(adapter.raw_value(), "<p>c</p>");
    }

    #[test]
    fn link_uses_selected_text_and_toggles_off() {
        let mut adapter = rich();
        type_text(&mut adapter, "example.com");
        assert_eq!(adapter.apply_toolbar(ToolbarItem::Link), KeyOutcome::Handled);
        adapter.handle_key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL));
        assert_eq!(adapter.apply_toolbar(ToolbarItem::Link), KeyOutcome::Edited);
        assert_eq!(
            adapter.raw_value(),
            "<p><a href=\"https://example.com/\" rel=\"noopener noreferrer\" target=\"_blank\">example.com</a></p>"
        );
        assert_eq!(adapter.apply_toolbar(ToolbarItem::Link), KeyOutcome::Edited);
        assert_eq!(adapter.raw_value(), "<p>example.com</p>");
    }

    #[test]
    fn file_action_goes_to_registered_picker_in_rich_mode_only() {
        let requests = Rc::new(RefCell::new(Vec::new()));
        let request = crate::file_pick::FilePickTracker::default().begin(".pdf");

        let mut plain = EditorAdapter::for_mode(EditorMode::Plain, RichEditorRegistry::shared());
        let sink = Rc::clone(&requests);
        plain.register_file_action(Box::new(move |req| sink.borrow_mut().push(req)));
        assert!(!plain.open_file_picker(request.clone()));

        let mut adapter = rich();
        assert!(!adapter.open_file_picker(request.clone()));
        let sink = Rc::clone(&requests);
        adapter.register_file_action(Box::new(move |req| sink.borrow_mut().push(req)));
        assert!(adapter.open_file_picker(request.clone()));
        assert_eq!(*requests.borrow(), vec![request]);
    }

    #[test]
    fn embed_caret_falls_back_to_document_end() {
        let mut adapter = rich();
        type_text(&mut adapter, "abc");
        adapter.blur();
        assert_eq!(adapter.caret_for_embed(), Some(Selection::caret(4)));
        adapter.restore_caret(Selection::caret(1));
        assert!(adapter.is_focused());
        assert_eq!(adapter.caret_for_embed(), Some(Selection::caret(1)));
    }

    #[test]
    fn paste_normalizes_line_endings() {
        let mut adapter = EditorAdapter::for_mode(EditorMode::Plain, RichEditorRegistry::shared());
        assert!(adapter.handle_paste("a\r\nb\rc"));
        assert_eq!(adapter.raw_value(), "a\nb\nc");
        assert!(!adapter.handle_paste(""));
        assert!(!adapter.set_value("a\nb\nc"));
        adapter.clear();
        assert!(adapter.is_blank());
    }
}
