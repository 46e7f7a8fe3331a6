use serde::Deserialize;
use serde::Serialize;
use strum_macros::Display;

use crate::attachment::FileDescriptor;

/// Which editing back-end a message input uses. Fixed when the input is
/// created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EditorMode {
    /// Block-structured WYSIWYG editor with a toolbar and attachment chips.
    Rich,
    /// Minimal editable text surface.
    #[default]
    Plain,
    /// Editing surface owned by the caller.
    Custom,
}

impl EditorMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rich" => Some(Self::Rich),
            "plain" => Some(Self::Plain),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// One structural node of the editor content.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentNode {
    Paragraph { text: String },
    ListItem { ordered: bool, text: String },
}

/// The projections of the current editor content. A projection the back-end
/// cannot provide is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ContentSnapshot {
    /// Serialized markup.
    pub html: Option<String>,
    /// Plain text as reported by the editor.
    pub text: Option<String>,
    /// Text as it is displayed to the user.
    pub display_text: Option<String>,
    pub nodes: Option<Vec<ContentNode>>,
}

/// Emitted on every content mutation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChangeEvent {
    /// Content in the back-end's native representation.
    pub raw_value: String,
    pub content: ContentSnapshot,
}

/// Emitted on a successful submission.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SendEvent {
    pub raw_value: String,
    pub content: ContentSnapshot,
    /// Attachments pending on the message when it was sent.
    #[serde(default)]
    pub files: Vec<FileDescriptor>,
}
