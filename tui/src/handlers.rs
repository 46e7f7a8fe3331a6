//! Caller-supplied callbacks. Every callback is optional; a missing one is a
//! no-op.

use chat_input_protocol::ChangeEvent;
use chat_input_protocol::FileDescriptor;
use chat_input_protocol::FileId;
use chat_input_protocol::SendEvent;

use crate::file_pick::PickRequest;

type ChangeHandler = Box<dyn FnMut(&ChangeEvent)>;
type SendHandler = Box<dyn FnMut(&SendEvent)>;
type AttachClickHandler = Box<dyn FnMut()>;
type FileUploadHandler = Box<dyn FnMut(&FileDescriptor, &[FileDescriptor])>;
type FileRemoveHandler = Box<dyn FnMut(&FileId, &[FileDescriptor])>;

/// Opens a file picker for a [`PickRequest`]. The host answers later through
/// `complete_file_pick` with the same ticket.
pub type FileActionHandler = Box<dyn FnMut(PickRequest)>;

#[derive(Default)]
pub struct MessageInputHandlers {
    on_change: Option<ChangeHandler>,
    on_send: Option<SendHandler>,
    on_attach_click: Option<AttachClickHandler>,
    on_file_upload: Option<FileUploadHandler>,
    on_file_remove: Option<FileRemoveHandler>,
    on_file_pick: Option<FileActionHandler>,
}

impl MessageInputHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_change(mut self, handler: impl FnMut(&ChangeEvent) + 'static) -> Self {
        self.on_change = Some(Box::new(handler));
        self
    }

    pub fn on_send(mut self, handler: impl FnMut(&SendEvent) + 'static) -> Self {
        self.on_send = Some(Box::new(handler));
        self
    }

    pub fn on_attach_click(mut self, handler: impl FnMut() + 'static) -> Self {
        self.on_attach_click = Some(Box::new(handler));
        self
    }

    pub fn on_file_upload(
        mut self,
        handler: impl FnMut(&FileDescriptor, &[FileDescriptor]) + 'static,
    ) -> Self {
        self.on_file_upload = Some(Box::new(handler));
        self
    }

    pub fn on_file_remove(
        mut self,
        handler: impl FnMut(&FileId, &[FileDescriptor]) + 'static,
    ) -> Self {
        self.on_file_remove = Some(Box::new(handler));
        self
    }

    /// Native file picker used by the rich editor's "file" toolbar action.
    pub fn on_file_pick(mut self, handler: impl FnMut(PickRequest) + 'static) -> Self {
        self.on_file_pick = Some(Box::new(handler));
        self
    }

    pub(crate) fn take_file_pick(&mut self) -> Option<FileActionHandler> {
        self.on_file_pick.take()
    }

    pub(crate) fn emit_change(&mut self, event: &ChangeEvent) {
        if let Some(handler) = self.on_change.as_mut() {
            handler(event);
        }
    }

    pub(crate) fn emit_send(&mut self, event: &SendEvent) {
        if let Some(handler) = self.on_send.as_mut() {
            handler(event);
        }
    }

    pub(crate) fn emit_attach_click(&mut self) {
        if let Some(handler) = self.on_attach_click.as_mut() {
            handler();
        }
    }

    pub(crate) fn emit_file_upload(&mut self, file: &FileDescriptor, all: &[FileDescriptor]) {
        if let Some(handler) = self.on_file_upload.as_mut() {
            handler(file, all);
        }
    }

    pub(crate) fn emit_file_remove(&mut self, file_id: &FileId, all: &[FileDescriptor]) {
        if let Some(handler) = self.on_file_remove.as_mut() {
            handler(file_id, all);
        }
    }
}

impl std::fmt::Debug for MessageInputHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageInputHandlers")
            .field("on_change", &self.on_change.is_some())
            .field("on_send", &self.on_send.is_some())
            .field("on_attach_click", &self.on_attach_click.is_some())
            .field("on_file_upload", &self.on_file_upload.is_some())
            .field("on_file_remove", &self.on_file_remove.is_some())
            .field("on_file_pick", &self.on_file_pick.is_some())
            .finish()
    }
}
