//! Files attached to an in-flight message.
//!
//! A [`PickedFile`] is what a file picker hands back. Once it passes the
//! [`AllowedFileTypes`] check it becomes a tracked [`FileDescriptor`] with a
//! generated [`FileId`].

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::file_label::mime_short_label;

/// Identifier of a tracked attachment, unique within the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    /// Generates a fresh, time-ordered id (`file-<uuid v7>`).
    pub fn generate() -> Self {
        Self(format!("file-{}", Uuid::now_v7()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FileId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for FileId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque, cheaply clonable handle to the file contents.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct FileBlob(Arc<[u8]>);

impl FileBlob {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for FileBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileBlob({} bytes)", self.0.len())
    }
}

/// A file selected by the user that is not tracked yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PickedFile {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub blob: FileBlob,
}

impl PickedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, blob: FileBlob) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes: blob.len() as u64,
            blob,
        }
    }

    /// Builds a picked file from a path and its contents, guessing the MIME
    /// type from the extension.
    pub fn from_path(path: &Path, bytes: Vec<u8>) -> Self {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        Self::new(name, mime_type, FileBlob::new(bytes))
    }
}

/// A file currently pending on the message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub id: FileId,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    #[serde(skip)]
    pub blob: FileBlob,
}

impl FileDescriptor {
    pub fn from_picked(file: PickedFile) -> Self {
        Self {
            id: FileId::generate(),
            name: file.name,
            mime_type: file.mime_type,
            size_bytes: file.size_bytes,
            blob: file.blob,
        }
    }
}

/// Raised when a picked file is not on the allow-list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AttachmentRejected {
    pub mime_type: String,
    pub message: String,
}

const DEFAULT_ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "text/csv",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "image/jpeg",
    "image/png",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

const DEFAULT_ACCEPT: &str = ".pdf,.csv,.doc,.docx,.jpeg,.jpg,.png,.xlsx";

const DEFAULT_REJECTION_MESSAGE: &str =
    "Invalid file type. Please upload a PDF, CSV, Doc, DocX, JPEG, PNG, or XLSX file.";

/// MIME allow-list applied before a picked file is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedFileTypes {
    mime_types: Vec<String>,
    accept: String,
    rejection_message: String,
}

impl Default for AllowedFileTypes {
    fn default() -> Self {
        Self {
            mime_types: DEFAULT_ALLOWED_MIME_TYPES
                .iter()
                .map(ToString::to_string)
                .collect(),
            accept: DEFAULT_ACCEPT.to_string(),
            rejection_message: DEFAULT_REJECTION_MESSAGE.to_string(),
        }
    }
}

impl AllowedFileTypes {
    /// Builds an allow-list from explicit MIME types. The picker filter and the
    /// rejection message are derived from the list.
    pub fn from_mime_types<I, S>(mime_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mime_types: Vec<String> = mime_types
            .into_iter()
            .map(|mime| mime.into().trim().to_ascii_lowercase())
            .filter(|mime| !mime.is_empty())
            .collect();
        let accept = mime_types.join(",");
        let mut labels: Vec<&'static str> = Vec::new();
        for mime in &mime_types {
            let label = mime_short_label(mime);
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
        let rejection_message = format!(
            "Invalid file type. Please upload a {} file.",
            join_with_or(&labels)
        );
        Self {
            mime_types,
            accept,
            rejection_message,
        }
    }

    pub fn mime_types(&self) -> &[String] {
        &self.mime_types
    }

    /// Filter string handed to the file picker.
    pub fn accept(&self) -> &str {
        &self.accept
    }

    pub fn is_allowed(&self, mime_type: &str) -> bool {
        self.mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(mime_type))
    }

    pub fn check(&self, file: &PickedFile) -> Result<(), AttachmentRejected> {
        if self.is_allowed(&file.mime_type) {
            Ok(())
        } else {
            Err(AttachmentRejected {
                mime_type: file.mime_type.clone(),
                message: self.rejection_message.clone(),
            })
        }
    }
}

fn join_with_or(labels: &[&str]) -> String {
    match labels {
        [] => "supported".to_string(),
        [only] => (*only).to_string(),
        [first, second] => format!("{first} or {second}"),
        [init @ .., last] => format!("{}, or {last}", init.join(", ")),
    }
}
