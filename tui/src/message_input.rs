//! The composed message input: attach button, toolbar, editor, chips and
//! send button, plus the notice row for rejected attachments.

use std::cell::Cell;
use std::sync::Arc;

use crossterm::event::KeyEvent;
use crossterm::event::MouseButton;
use crossterm::event::MouseEvent;
use crossterm::event::MouseEventKind;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::text::Span;
use unicode_width::UnicodeWidthStr;

use chat_input_protocol::AllowedFileTypes;
use chat_input_protocol::AttachmentRejected;
use chat_input_protocol::EditorMode;
use chat_input_protocol::FileDescriptor;
use chat_input_protocol::FileId;
use chat_input_protocol::PickedFile;

use crate::composer::CompositionController;
use crate::composer::InputResult;
use crate::composer::PasteResult;
use crate::editor::CustomSurface;
use crate::editor::EditorAdapter;
use crate::editor::SurfaceView;
use crate::editor::chip::ChipHit;
use crate::editor::chip::DefaultFileIcons;
use crate::editor::chip::FileIconProvider;
use crate::editor::registry::RichEditorRegistry;
use crate::editor::registry::ToolbarItem;
use crate::file_pick::PickRequest;
use crate::file_pick::PickTicket;
use crate::handlers::MessageInputHandlers;
use crate::render::Insets;
use crate::render::RectExt as _;
use crate::render::renderable::Renderable;
use crate::scroll::EditorContainer;
use crate::style::inactive_style;
use crate::style::notice_style;

const ATTACH_LABEL: &str = "[+]";
const DEFAULT_SEND_LABEL: &str = "[>]";
const BUTTON_GAP: u16 = 1;

/// Options of a message input. `mode` and `fancy_scroll` are read once at
/// construction.
#[derive(Debug, Clone)]
pub struct MessageInputProps {
    /// `Some` makes the value controlled by the caller.
    pub value: Option<String>,
    pub placeholder: String,
    pub disabled: bool,
    pub send_on_return_disabled: bool,
    /// `Some` forces send-enablement instead of deriving it from the content.
    pub send_disabled: Option<bool>,
    pub fancy_scroll: bool,
    pub activate_after_change: bool,
    pub auto_focus: bool,
    pub send_button: bool,
    pub attach_button: bool,
    pub attach_disabled: bool,
    pub mode: EditorMode,
    pub allowed_files: AllowedFileTypes,
    /// Rows the editor grows to before it scrolls.
    pub max_editor_rows: u16,
    pub send_label: Option<String>,
    pub file_icons: Arc<dyn FileIconProvider>,
    pub registry: Arc<RichEditorRegistry>,
}

impl Default for MessageInputProps {
    fn default() -> Self {
        Self {
            value: None,
            placeholder: String::new(),
            disabled: false,
            send_on_return_disabled: false,
            send_disabled: None,
            fancy_scroll: true,
            activate_after_change: false,
            auto_focus: false,
            send_button: true,
            attach_button: true,
            attach_disabled: false,
            mode: EditorMode::Plain,
            allowed_files: AllowedFileTypes::default(),
            max_editor_rows: 5,
            send_label: None,
            file_icons: Arc::new(DefaultFileIcons),
            registry: RichEditorRegistry::shared(),
        }
    }
}

/// What sits under a mouse position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTarget {
    Attach,
    Send,
    Toolbar(ToolbarItem),
    ChipDelete(FileId),
    Chip(FileId),
    Editor,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct InputLayout {
    attach: Option<Rect>,
    send: Option<Rect>,
    toolbar: Option<Rect>,
    editor: Rect,
    chips: Option<Rect>,
    notice: Option<Rect>,
    height: u16,
}

pub struct MessageInput {
    controller: CompositionController,
    container: EditorContainer,
    placeholder: String,
    attach_button: bool,
    send_button: bool,
    send_label: String,
    last_area: Cell<Rect>,
}

impl MessageInput {
    pub fn new(props: MessageInputProps, handlers: MessageInputHandlers) -> Self {
        let adapter = EditorAdapter::for_mode(props.mode, props.registry.clone());
        Self::with_adapter(adapter, props, handlers)
    }

    /// A custom-mode input editing through the caller's `surface`.
    pub fn with_custom_surface(
        props: MessageInputProps,
        handlers: MessageInputHandlers,
        surface: Box<dyn CustomSurface>,
    ) -> Self {
        let props = MessageInputProps {
            mode: EditorMode::Custom,
            ..props
        };
        Self::with_adapter(EditorAdapter::custom(Some(surface)), props, handlers)
    }

    fn with_adapter(
        adapter: EditorAdapter,
        props: MessageInputProps,
        handlers: MessageInputHandlers,
    ) -> Self {
        let mut controller = CompositionController::new(adapter, &props, handlers);
        if props.auto_focus && !props.disabled {
            controller.focus();
        }
        tracing::debug!(
            "message input created (mode={}, controlled={})",
            controller.mode(),
            controller.is_controlled()
        );
        Self {
            controller,
            container: EditorContainer::new(props.fancy_scroll, props.max_editor_rows),
            placeholder: props.placeholder,
            attach_button: props.attach_button,
            send_button: props.send_button,
            send_label: props
                .send_label
                .map_or_else(|| DEFAULT_SEND_LABEL.to_string(), |label| format!("[{label}]")),
            last_area: Cell::new(Rect::default()),
        }
    }

    pub fn controller(&self) -> &CompositionController {
        &self.controller
    }

    pub fn mode(&self) -> EditorMode {
        self.controller.mode()
    }

    pub fn value(&self) -> &str {
        self.controller.value()
    }

    pub fn attachments(&self) -> &[FileDescriptor] {
        self.controller.attachments()
    }

    pub fn notice(&self) -> Option<&str> {
        self.controller.notice()
    }

    /// Imperative focus handle.
    pub fn focus(&mut self) -> bool {
        self.controller.focus()
    }

    pub fn blur(&mut self) {
        self.controller.blur();
    }

    pub fn set_value(&mut self, value: Option<String>) {
        self.controller.sync_value(value);
        self.sync_scroll();
    }

    pub fn set_send_disabled(&mut self, send_disabled: Option<bool>) {
        self.controller.set_send_disabled(send_disabled);
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.controller.set_disabled(disabled);
    }

    pub fn set_attach_disabled(&mut self, attach_disabled: bool) {
        self.controller.set_attach_disabled(attach_disabled);
    }

    pub fn set_send_on_return_disabled(&mut self, send_on_return_disabled: bool) {
        self.controller.set_send_on_return_disabled(send_on_return_disabled);
    }

    pub fn set_activate_after_change(&mut self, activate_after_change: bool) {
        self.controller.set_activate_after_change(activate_after_change);
    }

    pub fn set_placeholder(&mut self, placeholder: impl Into<String>) {
        self.placeholder = placeholder.into();
    }

    pub fn handle_key_event(&mut self, key_event: KeyEvent) -> (InputResult, bool) {
        let result = self.controller.handle_key_event(key_event);
        self.sync_scroll();
        result
    }

    pub fn handle_paste(&mut self, pasted: String) -> PasteResult {
        let result = self.controller.handle_paste(pasted);
        self.sync_scroll();
        result
    }

    /// Caller-owned surface reports new content (custom mode).
    pub fn handle_custom_change(&mut self, raw_value: &str) {
        self.controller.handle_custom_change(raw_value);
        self.sync_scroll();
    }

    /// Send button activation.
    pub fn click_send(&mut self) -> InputResult {
        let result = self.controller.send();
        self.sync_scroll();
        result
    }

    pub fn trigger_file_action(&mut self) -> Option<PickRequest> {
        self.controller.trigger_file_action()
    }

    pub fn complete_file_pick(
        &mut self,
        ticket: PickTicket,
        file: Option<PickedFile>,
    ) -> Result<Option<FileDescriptor>, AttachmentRejected> {
        let result = self.controller.complete_file_pick(ticket, file);
        self.sync_scroll();
        result
    }

    pub fn attach_file(&mut self, file: PickedFile) -> Result<FileDescriptor, AttachmentRejected> {
        let result = self.controller.attach_file(file);
        self.sync_scroll();
        result
    }

    pub fn remove_attachment(&mut self, id: &FileId) -> Option<FileDescriptor> {
        self.controller.remove_attachment(id)
    }

    pub fn dismiss_notice(&mut self) {
        self.controller.dismiss_notice();
    }

    fn sync_scroll(&mut self) {
        if self.controller.take_scroll_refresh() {
            self.container.refresh();
        }
    }

    /// Maps a screen position to the part of the input drawn there by the
    /// last render.
    pub fn hit_test(&self, column: u16, row: u16) -> Option<HitTarget> {
        let area = self.last_area.get();
        let layout = self.layout_areas(area);
        let contains = |rect: Option<Rect>| {
            rect.is_some_and(|rect| {
                column >= rect.x && column < rect.right() && row >= rect.y && row < rect.bottom()
            })
        };
        if contains(layout.attach) {
            return Some(HitTarget::Attach);
        }
        if contains(layout.send) {
            return Some(HitTarget::Send);
        }
        if let Some(toolbar) = layout.toolbar
            && contains(Some(toolbar))
        {
            return self
                .toolbar_cells(toolbar)
                .into_iter()
                .find(|(_, rect)| column >= rect.x && column < rect.right())
                .map(|(item, _)| HitTarget::Toolbar(item));
        }
        if let Some(chips) = layout.chips
            && contains(Some(chips))
        {
            return self
                .controller
                .chips()
                .hit_test(chips, column, row)
                .map(|hit| match hit {
                    ChipHit::Delete(id) => HitTarget::ChipDelete(id),
                    ChipHit::Body(id) => HitTarget::Chip(id),
                });
        }
        contains(Some(layout.editor)).then_some(HitTarget::Editor)
    }

    /// Clicks and wheel scrolling. A click on the send button can submit.
    pub fn handle_mouse(&mut self, event: MouseEvent) -> InputResult {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                match self.hit_test(event.column, event.row) {
                    Some(HitTarget::Attach) => {
                        self.controller.click_attach();
                    }
                    Some(HitTarget::Send) => return self.click_send(),
                    Some(HitTarget::Toolbar(item)) => {
                        self.controller.apply_toolbar(item);
                    }
                    Some(HitTarget::ChipDelete(id)) => {
                        self.controller.remove_attachment(&id);
                    }
                    Some(HitTarget::Editor) => {
                        self.controller.focus();
                    }
                    Some(HitTarget::Chip(_)) | None => {}
                }
                self.sync_scroll();
            }
            MouseEventKind::ScrollUp | MouseEventKind::ScrollDown
                if self.hit_test(event.column, event.row) == Some(HitTarget::Editor) =>
            {
                let delta = if event.kind == MouseEventKind::ScrollUp {
                    -1
                } else {
                    1
                };
                self.container.scroll_by(delta);
            }
            _ => {}
        }
        InputResult::None
    }

    fn editor_view(&self, width: u16) -> SurfaceView {
        self.controller
            .adapter()
            .view(self.container.content_width(width))
    }

    fn toolbar_cells(&self, toolbar: Rect) -> Vec<(ToolbarItem, Rect)> {
        let mut cells = Vec::new();
        let mut x = toolbar.x;
        for (item, icon) in self.controller.adapter().toolbar() {
            let width = u16::try_from(icon.width()).unwrap_or(u16::MAX);
            if x.saturating_add(width) > toolbar.right() {
                break;
            }
            cells.push((item, Rect::new(x, toolbar.y, width, 1)));
            x = x.saturating_add(width).saturating_add(BUTTON_GAP);
        }
        cells
    }

    fn layout_areas(&self, area: Rect) -> InputLayout {
        let mut left = area.x;
        let mut right = area.right();
        let top = area.y;
        let mut layout = InputLayout::default();

        if self.attach_button {
            let width = label_width(ATTACH_LABEL);
            layout.attach = Some(Rect::new(left, top, width.min(area.width), 1));
            left = left.saturating_add(width + BUTTON_GAP).min(right);
        }
        if self.send_button {
            let width = label_width(&self.send_label).min(right - left);
            right -= width;
            layout.send = Some(Rect::new(right, top, width, 1));
            right = right.saturating_sub(BUTTON_GAP).max(left);
        }

        let middle_width = right - left;
        let mut y = top;
        if !self.controller.adapter().toolbar().is_empty() {
            layout.toolbar = Some(Rect::new(left, y, middle_width, 1));
            y += 1;
        }
        let editor_height = self.container.height(&self.editor_view(middle_width));
        layout.editor = Rect::new(left, y, middle_width, editor_height);
        y += editor_height;

        let chips = self.controller.chips();
        if !chips.is_empty() {
            let height = chips.desired_height(middle_width);
            layout.chips = Some(Rect::new(left, y, middle_width, height));
            y += height;
        }
        if self.controller.notice().is_some() {
            layout.notice = Some(Rect::new(area.x, y, area.width, 1));
            y += 1;
        }
        layout.height = y - top;
        layout
    }

    fn render_toolbar(&self, toolbar: Rect, buf: &mut Buffer) {
        let icons = self.controller.adapter().toolbar();
        for (item, rect) in self.toolbar_cells(toolbar) {
            if let Some((_, icon)) = icons.iter().find(|(candidate, _)| *candidate == item) {
                Span::from(icon.clone()).cyan().render(rect, buf);
            }
        }
    }
}

fn label_width(label: &str) -> u16 {
    u16::try_from(label.width()).unwrap_or(u16::MAX)
}

impl Renderable for MessageInput {
    fn render(&self, area: Rect, buf: &mut Buffer) {
        self.last_area.set(area);
        let layout = self.layout_areas(area);
        let clip = |rect: Rect| rect.intersection(area);

        if let Some(attach) = layout.attach {
            let label = if self.controller.is_attach_disabled() {
                Span::styled(ATTACH_LABEL, inactive_style())
            } else {
                Span::from(ATTACH_LABEL).bold()
            };
            label.render(clip(attach), buf);
        }
        if let Some(send) = layout.send {
            let label = if self.controller.can_send() {
                Span::from(self.send_label.clone()).bold()
            } else {
                Span::styled(self.send_label.clone(), inactive_style())
            };
            label.render(clip(send), buf);
        }
        if let Some(toolbar) = layout.toolbar {
            self.render_toolbar(clip(toolbar), buf);
        }

        let editor = clip(layout.editor);
        let view = self.editor_view(layout.editor.width);
        self.container.render(&view, editor, buf);
        let placeholder: Option<Span<'_>> = (self.controller.adapter().is_blank()
            && !self.placeholder.is_empty())
        .then(|| Span::styled(self.placeholder.as_str(), inactive_style()));
        placeholder.render(editor, buf);

        if let Some(chips) = layout.chips {
            self.controller.chips().render(clip(chips), buf);
        }
        if let (Some(notice_area), Some(notice)) = (layout.notice, self.controller.notice()) {
            let indent = layout.editor.x - area.x;
            Line::styled(notice, notice_style())
                .render(clip(notice_area).inset(Insets::tlbr(0, indent, 0, 0)), buf);
        }

        if self.controller.is_disabled() {
            buf.set_style(area, inactive_style());
        }
    }

    fn desired_height(&self, width: u16) -> u16 {
        self.layout_areas(Rect {
            x: 0,
            y: 0,
            width,
            height: u16::MAX,
        })
        .height
    }

    fn cursor_pos(&self, area: Rect) -> Option<(u16, u16)> {
        if self.controller.is_disabled() {
            return None;
        }
        let layout = self.layout_areas(area);
        let view = self.editor_view(layout.editor.width);
        self.container.cursor_pos(&view, layout.editor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::KeyOutcome;
    use crate::editor::text_surface::EditableSurface;
    use crate::editor::text_surface::TextSurface;
    use chat_input_protocol::FileBlob;
    use chat_input_protocol::SendEvent;
    use chat_input_protocol::markup::escape_text;
    use chat_input_protocol::markup::visible_text;
    use crossterm::event::KeyCode;
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording(props: MessageInputProps) -> (MessageInput, Rc<RefCell<Vec<SendEvent>>>) {
        let sends = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&sends);
        let handlers = MessageInputHandlers::new()
            .on_send(move |event| sink.borrow_mut().push(event.clone()));
        (MessageInput::new(props, handlers), sends)
    }

    fn focused_props() -> MessageInputProps {
        MessageInputProps {
            auto_focus: true,
            ..MessageInputProps::default()
        }
    }

    fn type_text(input: &mut MessageInput, text: &str) {
        for c in text.chars() {
            input.handle_key_event(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
    }

    fn render_rows(input: &MessageInput, width: u16) -> Vec<String> {
        let height = input.desired_height(width);
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        input.render(area, &mut buf);
        (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| buf[(x, y)].symbol().to_string())
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect()
    }

    fn click(column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn renders_buttons_around_editor_and_placeholder() {
        let (input, _) = recording(MessageInputProps {
            placeholder: "Type a message".to_string(),
            ..focused_props()
        });
        assert_eq!(render_rows(&input, 24), vec!["[+] Type a message   [>]"]);
    }

    #[test]
    fn typing_hello_and_enter_sends_and_clears() {
        let (mut input, sends) = recording(focused_props());
        type_text(&mut input, "Hello");
        assert_eq!(render_rows(&input, 20), vec!["[+] Hello        [>]"]);

        let (result, consumed) =
            input.handle_key_event(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        assert!(consumed);
        assert!(matches!(result, InputResult::Submitted(_)));
        let sends = sends.borrow();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].raw_value, "Hello");
        assert_eq!(sends[0].content.text.as_deref(), Some("Hello"));
        assert_eq!(sends[0].content.display_text.as_deref(), Some("Hello"));
        assert!(sends[0].files.is_empty());
        assert_eq!(input.value(), "");
        assert!(input.controller().is_send_disabled());
    }

    #[test]
    fn spaces_only_never_send() {
        let (mut input, sends) = recording(focused_props());
        type_text(&mut input, "   ");
        input.handle_key_event(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(input.click_send(), InputResult::None);
        assert!(sends.borrow().is_empty());
    }

    #[test]
    fn rejected_attachment_shows_notice_row() {
        let (mut input, _) = recording(focused_props());
        let rejected = input.attach_file(PickedFile::new(
            "tool.exe",
            "application/exe",
            FileBlob::new(vec![1]),
        ));
        assert!(rejected.is_err());
        assert!(input.attachments().is_empty());
        let rows = render_rows(&input, 100);
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[1],
            "    Invalid file type. Please upload a PDF, CSV, Doc, DocX, JPEG, PNG, or XLSX file."
        );
    }

    #[test]
    fn controlled_send_button_keeps_value() {
        let (mut input, sends) = recording(MessageInputProps {
            value: Some("Hi".to_string()),
            ..MessageInputProps::default()
        });
        render_rows(&input, 20);
        assert_eq!(input.hit_test(17, 0), Some(HitTarget::Send));
        let result = input.handle_mouse(click(17, 0));
        let InputResult::Submitted(event) = result else {
            panic!("expected a submission");
        };
        assert_eq!(event.raw_value, "Hi");
        assert_eq!(sends.borrow().len(), 1);
        assert_eq!(input.value(), "Hi");
        assert_eq!(render_rows(&input, 20), vec!["[+] Hi           [>]"]);
    }

    #[test]
    fn chip_delete_click_removes_attachment() {
        let (mut input, _) = recording(focused_props());
        let file = input
            .attach_file(PickedFile::new(
                "a.pdf",
                "application/pdf",
                FileBlob::new(vec![0; 10]),
            ))
            .expect("pdf allowed");
        let rows = render_rows(&input, 40);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], "    [▤ a.pdf PDF · 0.00 MB ✕]");

        let delete_column = 4 + u16::try_from("[▤ a.pdf PDF · 0.00 MB ".chars().count()).unwrap_or(0);
        assert_eq!(
            input.hit_test(delete_column, 1),
            Some(HitTarget::ChipDelete(file.id.clone()))
        );
        input.handle_mouse(click(delete_column, 1));
        assert!(input.attachments().is_empty());
        assert_eq!(render_rows(&input, 40).len(), 1);
    }

    #[test]
    fn rich_mode_renders_toolbar_and_applies_clicked_format() {
        let (mut input, _) = recording(MessageInputProps {
            mode: EditorMode::Rich,
            ..focused_props()
        });
        type_text(&mut input, "bold");
        input.handle_key_event(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL));
        let rows = render_rows(&input, 60);
        assert!(rows[0].starts_with("[+] Aa ↕ B I U S A ▌"));
        assert_eq!(rows[1], "    bold");

        let bold_column = 4 + u16::try_from("Aa ↕ ".chars().count()).unwrap_or(0);
        assert_eq!(input.hit_test(bold_column, 0), Some(HitTarget::Toolbar(ToolbarItem::Bold)));
        input.handle_mouse(click(bold_column, 0));
        assert_eq!(input.value(), "<p><strong>bold</strong></p>");
    }

    #[test]
    fn disabled_input_dims_everything_and_hides_cursor() {
        let (mut input, _) = recording(focused_props());
        type_text(&mut input, "x");
        input.set_disabled(true);
        let area = Rect::new(0, 0, 20, 1);
        let mut buf = Buffer::empty(area);
        input.render(area, &mut buf);
        assert!(buf[(4, 0)].modifier.contains(ratatui::style::Modifier::DIM));
        assert_eq!(input.cursor_pos(area), None);
        assert_eq!(input.handle_mouse(click(17, 0)), InputResult::None);
    }

    struct ParagraphSurface {
        text: TextSurface,
    }

    impl CustomSurface for ParagraphSurface {
        fn value(&self) -> String {
            format!("<p>{}</p>", escape_text(self.text.text()))
        }

        fn set_value(&mut self, value: &str) {
            self.text.set_text(&visible_text(value));
        }

        fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome {
            self.text.handle_key(key)
        }

        fn view(&self, width: u16) -> SurfaceView {
            self.text.view(width)
        }

        fn focus(&mut self) -> bool {
            self.text.set_focused(true)
        }

        fn blur(&mut self) {
            self.text.set_focused(false);
        }

        fn is_focused(&self) -> bool {
            self.text.is_focused()
        }
    }

    #[test]
    fn custom_surface_value_is_sent_as_markup() {
        let sends = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&sends);
        let handlers = MessageInputHandlers::new()
            .on_send(move |event| sink.borrow_mut().push(event.clone()));
        let surface = ParagraphSurface {
            text: TextSurface::new(),
        };
        let mut input = MessageInput::with_custom_surface(focused_props(), handlers, Box::new(surface));
        assert_eq!(input.mode(), EditorMode::Custom);
        type_text(&mut input, "a<b");
        assert_eq!(input.value(), "<p>a&lt;b</p>");
        input.handle_key_event(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));

        let sends = sends.borrow();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].content.display_text.as_deref(), Some("a<b\n"));
        assert_eq!(sends[0].content.nodes, None);
        assert_eq!(input.value(), "");
    }

    #[test]
    fn editor_grows_then_scrolls_in_terminal() {
        let (mut input, _) = recording(MessageInputProps {
            max_editor_rows: 2,
            ..focused_props()
        });
        for line in ["one", "two", "three"] {
            type_text(&mut input, line);
            input.handle_key_event(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));
        }
        type_text(&mut input, "four");
        assert_eq!(input.desired_height(20), 2);

        let mut terminal = Terminal::new(TestBackend::new(20, 2)).expect("terminal");
        terminal
            .draw(|frame| {
                let area = frame.area();
                input.render(area, frame.buffer_mut());
                if let Some((x, y)) = input.cursor_pos(area) {
                    frame.set_cursor_position((x, y));
                }
            })
            .expect("draw");
        let buffer = terminal.backend().buffer();
        let row = |y: u16| -> String {
            (4..8).map(|x| buffer[(x, y)].symbol().to_string()).collect()
        };
        assert_eq!(row(0), "thre");
        assert_eq!(row(1), "four");
        assert_eq!(input.cursor_pos(Rect::new(0, 0, 20, 2)), Some((8, 1)));
    }
}
