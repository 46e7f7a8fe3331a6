// Forbid accidental stdout/stderr writes in the library portion of the TUI.
#![deny(clippy::print_stdout, clippy::print_stderr)]

//! A chat message input for ratatui applications.
//!
//! [`MessageInput`] composes an editor (rich, plain or caller supplied), an
//! attach button, a send button and the chips of pending attachments. Hosts
//! feed it terminal events and receive [`InputResult::Submitted`] when a
//! message is sent.

mod attachments;
mod composer;
mod controllable;
pub mod editor;
mod file_pick;
mod handlers;
mod message_input;
mod pasted_path;
pub mod render;
mod scroll;
mod style;

pub use composer::CompositionController;
pub use composer::CompositionState;
pub use composer::InputResult;
pub use composer::PasteResult;
pub use controllable::Controllable;
pub use editor::CustomSurface;
pub use editor::EditorAdapter;
pub use editor::KeyOutcome;
pub use editor::SurfaceView;
pub use editor::chip::DefaultFileIcons;
pub use editor::chip::FileIconProvider;
pub use editor::registry::RichEditorRegistry;
pub use editor::registry::ToolbarItem;
pub use file_pick::FilePickError;
pub use file_pick::PickRequest;
pub use file_pick::PickTicket;
pub use file_pick::read_picked_file;
pub use handlers::MessageInputHandlers;
pub use message_input::HitTarget;
pub use message_input::MessageInput;
pub use message_input::MessageInputProps;
pub use pasted_path::pasted_file;
pub use pasted_path::pasted_path;
pub use render::renderable::Renderable;
pub use style::parse_css_color;
