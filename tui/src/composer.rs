//! The composition state machine behind [`crate::MessageInput`].
//!
//! Owns the message value (controlled or not), send-enablement, the
//! Enter-to-send rule, attachments and the file-pick round trip. Rendering
//! lives in `message_input`.

use std::path::PathBuf;

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use derive_more::IsVariant;

use chat_input_protocol::AllowedFileTypes;
use chat_input_protocol::AttachmentRejected;
use chat_input_protocol::EditorMode;
use chat_input_protocol::FileDescriptor;
use chat_input_protocol::FileId;
use chat_input_protocol::PickedFile;
use chat_input_protocol::SendEvent;

use crate::attachments::AttachmentTracker;
use crate::controllable::Controllable;
use crate::editor::EditorAdapter;
use crate::editor::KeyOutcome;
use crate::editor::chip::ChipContainer;
use crate::editor::registry::ToolbarItem;
use crate::file_pick::FilePickTracker;
use crate::file_pick::PickRequest;
use crate::file_pick::PickTicket;
use crate::handlers::MessageInputHandlers;
use crate::message_input::MessageInputProps;
use crate::pasted_path::pasted_file;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IsVariant)]
pub enum CompositionState {
    #[default]
    Idle,
    Composing,
    /// Only observable from inside the `on_send` callback.
    Sending,
}

/// Result returned when the user interacts with the input.
#[derive(Debug, Clone, PartialEq)]
pub enum InputResult {
    Submitted(SendEvent),
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteResult {
    /// The text went into the editor.
    Inserted,
    /// The paste named a file. The host reads `path` and answers with
    /// `complete_file_pick(request.ticket, ..)`.
    Attach { request: PickRequest, path: PathBuf },
    Ignored,
}

pub struct CompositionController {
    adapter: EditorAdapter,
    value: Controllable<String>,
    send_disabled: Controllable<bool>,
    attachments: AttachmentTracker,
    picks: FilePickTracker,
    handlers: MessageInputHandlers,
    allowed_files: AllowedFileTypes,
    state: CompositionState,
    disabled: bool,
    attach_disabled: bool,
    send_on_return_disabled: bool,
    activate_after_change: bool,
    /// User-facing message from the last rejected attachment.
    notice: Option<String>,
    scroll_refresh: bool,
}

impl CompositionController {
    pub fn new(
        mut adapter: EditorAdapter,
        props: &MessageInputProps,
        mut handlers: MessageInputHandlers,
    ) -> Self {
        let value = Controllable::new(props.value.clone(), adapter.raw_value());
        if value.is_controlled() {
            adapter.set_value(value.get());
        }
        if let Some(file_pick) = handlers.take_file_pick() {
            adapter.register_file_action(file_pick);
        }
        let derived = derived_send_disabled(&adapter, value.get());
        let state = if value.get().is_empty() {
            CompositionState::Idle
        } else {
            CompositionState::Composing
        };
        Self {
            adapter,
            value,
            send_disabled: Controllable::following(props.send_disabled, derived),
            attachments: AttachmentTracker::new(props.file_icons.clone()),
            picks: FilePickTracker::default(),
            handlers,
            allowed_files: props.allowed_files.clone(),
            state,
            disabled: props.disabled,
            attach_disabled: props.attach_disabled,
            send_on_return_disabled: props.send_on_return_disabled,
            activate_after_change: props.activate_after_change,
            notice: None,
            scroll_refresh: false,
        }
    }

    pub fn mode(&self) -> EditorMode {
        self.adapter.mode()
    }

    pub fn adapter(&self) -> &EditorAdapter {
        &self.adapter
    }

    /// The message value: the caller's value when controlled.
    pub fn value(&self) -> &str {
        self.value.get()
    }

    pub fn is_controlled(&self) -> bool {
        self.value.is_controlled()
    }

    pub fn state(&self) -> CompositionState {
        self.state
    }

    pub fn is_send_disabled(&self) -> bool {
        *self.send_disabled.get()
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_attach_disabled(&self) -> bool {
        self.disabled || self.attach_disabled
    }

    /// Whether a submit right now would go through.
    pub fn can_send(&self) -> bool {
        let raw = self.value.get();
        !self.disabled
            && !*self.send_disabled.get()
            && !raw.is_empty()
            && self.adapter.is_sendable(raw)
    }

    pub fn attachments(&self) -> &[FileDescriptor] {
        self.attachments.list()
    }

    pub fn chips(&self) -> &ChipContainer {
        self.attachments.chips()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn set_attach_disabled(&mut self, attach_disabled: bool) {
        self.attach_disabled = attach_disabled;
    }

    pub fn set_send_on_return_disabled(&mut self, send_on_return_disabled: bool) {
        self.send_on_return_disabled = send_on_return_disabled;
    }

    pub fn set_activate_after_change(&mut self, activate_after_change: bool) {
        self.activate_after_change = activate_after_change;
    }

    pub fn focus(&mut self) -> bool {
        self.adapter.focus()
    }

    pub fn blur(&mut self) {
        self.adapter.blur();
    }

    /// True once after any change that should re-measure the scroll
    /// container.
    pub fn take_scroll_refresh(&mut self) -> bool {
        std::mem::take(&mut self.scroll_refresh)
    }

    /// Handle a key event coming from the terminal.
    ///
    /// Enter without Shift submits unless Enter-to-send is off, and is never
    /// forwarded to the editor, even when the submit is suppressed.
    /// Other keys reach the editor only while it is focused.
    pub fn handle_key_event(&mut self, key_event: KeyEvent) -> (InputResult, bool) {
        if self.disabled || key_event.kind == KeyEventKind::Release {
            return (InputResult::None, false);
        }
        match key_event {
            KeyEvent {
                code: KeyCode::Enter,
                modifiers,
                ..
            } if !modifiers.contains(KeyModifiers::SHIFT) && !self.send_on_return_disabled => {
                (self.send(), true)
            }
            input => self.handle_editor_key(input),
        }
    }

    fn handle_editor_key(&mut self, key_event: KeyEvent) -> (InputResult, bool) {
        if !self.adapter.is_focused() {
            return (InputResult::None, false);
        }
        match self.adapter.handle_key(key_event) {
            KeyOutcome::Edited => {
                self.on_content_changed();
                (InputResult::None, true)
            }
            KeyOutcome::Handled => (InputResult::None, true),
            KeyOutcome::FileAction => {
                self.trigger_file_action();
                (InputResult::None, true)
            }
            KeyOutcome::Ignored => (InputResult::None, false),
        }
    }

    fn on_content_changed(&mut self) {
        let raw = self.adapter.raw_value();
        self.value.set(raw.clone());
        let derived = derived_send_disabled(&self.adapter, &raw);
        self.send_disabled.set(derived);
        self.state = if raw.is_empty() {
            CompositionState::Idle
        } else {
            CompositionState::Composing
        };
        let event = self.adapter.notify_change(&raw);
        self.handlers.emit_change(&event);
        self.scroll_refresh = true;
    }

    /// Submits the message if the guard allows it. A suppressed submit is
    /// silent.
    pub fn send(&mut self) -> InputResult {
        if !self.can_send() {
            tracing::trace!("send suppressed");
            return InputResult::None;
        }
        self.state = CompositionState::Sending;
        let raw_value = self.value.get().clone();
        let content = self.adapter.extract_content(&raw_value);
        let files = self.attachments.take_all();
        let event = SendEvent {
            raw_value,
            content,
            files,
        };
        tracing::info!(
            "sending message ({} chars, {} files)",
            event.raw_value.chars().count(),
            event.files.len()
        );
        self.handlers.emit_send(&event);
        for file in &event.files {
            self.handlers
                .emit_file_remove(&file.id, self.attachments.list());
        }

        if !self.value.is_controlled() {
            self.value.set(String::new());
            self.adapter.clear();
            self.send_disabled.set(true);
        }
        self.state = if self.value.get().is_empty() {
            CompositionState::Idle
        } else {
            CompositionState::Composing
        };
        self.scroll_refresh = true;
        InputResult::Submitted(event)
    }

    /// Attach button. Returns whether the click was delivered.
    pub fn click_attach(&mut self) -> bool {
        if self.is_attach_disabled() {
            return false;
        }
        self.handlers.emit_attach_click();
        true
    }

    /// Opens the registered file picker with a fresh ticket.
    pub fn trigger_file_action(&mut self) -> Option<PickRequest> {
        if self.disabled {
            return None;
        }
        let request = self.picks.begin(self.allowed_files.accept());
        if self.adapter.open_file_picker(request.clone()) {
            Some(request)
        } else {
            tracing::debug!("no file picker registered");
            self.picks.cancel(request.ticket);
            None
        }
    }

    /// Applies the picker's answer for `ticket`. Only the most recent ticket
    /// counts; `None` means the pick was cancelled.
    pub fn complete_file_pick(
        &mut self,
        ticket: PickTicket,
        file: Option<PickedFile>,
    ) -> Result<Option<FileDescriptor>, AttachmentRejected> {
        if !self.picks.finish(ticket) {
            return Ok(None);
        }
        match file {
            Some(file) => self.attach_file(file).map(Some),
            None => Ok(None),
        }
    }

    /// Validates `file` against the allow-list and tracks it. The caret is
    /// left where it was.
    pub fn attach_file(&mut self, file: PickedFile) -> Result<FileDescriptor, AttachmentRejected> {
        if let Err(err) = self.allowed_files.check(&file) {
            tracing::warn!("rejected attachment {} ({})", file.name, err.mime_type);
            self.notice = Some(err.message.clone());
            return Err(err);
        }
        let caret = self.adapter.caret_for_embed();
        let descriptor = self.attachments.attach(file);
        if let Some(selection) = caret {
            self.adapter.restore_caret(selection);
        }
        self.notice = None;
        self.handlers
            .emit_file_upload(&descriptor, self.attachments.list());
        self.scroll_refresh = true;
        Ok(descriptor)
    }

    pub fn remove_attachment(&mut self, id: &FileId) -> Option<FileDescriptor> {
        let removed = self.attachments.detach(id)?;
        self.handlers.emit_file_remove(id, self.attachments.list());
        self.scroll_refresh = true;
        Some(removed)
    }

    /// Handle a bracketed paste. In rich mode a pasted path to an existing
    /// file starts a file pick instead of inserting text.
    pub fn handle_paste(&mut self, pasted: String) -> PasteResult {
        if self.disabled {
            return PasteResult::Ignored;
        }
        if self.mode() == EditorMode::Rich
            && let Some(path) = pasted_file(&pasted)
        {
            tracing::debug!("paste names file {}", path.display());
            let request = self.picks.begin(self.allowed_files.accept());
            return PasteResult::Attach { request, path };
        }
        if self.adapter.handle_paste(&pasted) {
            self.on_content_changed();
            PasteResult::Inserted
        } else {
            PasteResult::Ignored
        }
    }

    /// Applies a toolbar button. Returns whether it did anything.
    pub fn apply_toolbar(&mut self, item: ToolbarItem) -> bool {
        if self.disabled {
            return false;
        }
        match self.adapter.apply_toolbar(item) {
            KeyOutcome::Edited => {
                self.on_content_changed();
                true
            }
            KeyOutcome::Handled => true,
            KeyOutcome::FileAction => {
                self.trigger_file_action();
                true
            }
            KeyOutcome::Ignored => false,
        }
    }

    /// A caller-owned surface reports new content.
    pub fn handle_custom_change(&mut self, raw_value: &str) {
        if self.adapter.set_value(raw_value) {
            self.on_content_changed();
        }
    }

    /// Applies the caller's next `value` prop.
    pub fn sync_value(&mut self, value: Option<String>) {
        if !self.value.sync_external(value) {
            return;
        }
        let raw = self.value.get().clone();
        if self.adapter.set_value(&raw) {
            if self.activate_after_change && !self.adapter.is_focused() {
                self.adapter.focus();
                self.adapter.move_caret_to_end();
            }
            self.scroll_refresh = true;
        }
        let derived = derived_send_disabled(&self.adapter, &raw);
        self.send_disabled.set(derived);
        self.state = if raw.is_empty() {
            CompositionState::Idle
        } else {
            CompositionState::Composing
        };
    }

    /// Applies the caller's next `send_disabled` prop. `Some` forces the flag;
    /// `None` hands it back to the content check.
    pub fn set_send_disabled(&mut self, send_disabled: Option<bool>) {
        self.send_disabled.sync_external(send_disabled);
    }
}

fn derived_send_disabled(adapter: &EditorAdapter, raw: &str) -> bool {
    raw.is_empty() || !adapter.is_sendable(raw)
}
