//! Data types shared by the message input component and its hosts.
//!
//! Nothing in this crate touches a terminal; it only describes content,
//! attachments and the events a message input emits.

pub mod attachment;
pub mod content;
pub mod file_label;
pub mod markup;

pub use attachment::AllowedFileTypes;
pub use attachment::AttachmentRejected;
pub use attachment::FileBlob;
pub use attachment::FileDescriptor;
pub use attachment::FileId;
pub use attachment::PickedFile;
pub use content::ChangeEvent;
pub use content::ContentNode;
pub use content::ContentSnapshot;
pub use content::EditorMode;
pub use content::SendEvent;
