//! Bookkeeping for the asynchronous file-picker round trip.
//!
//! Opening the picker issues a [`PickRequest`] carrying a fresh
//! [`PickTicket`]. Only the completion for the most recent ticket is applied;
//! a newer pick supersedes an older one without cancelling it.

use std::path::Path;
use std::path::PathBuf;

use chat_input_protocol::PickedFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PickTicket(u64);

/// Handed to the host's file picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickRequest {
    pub ticket: PickTicket,
    /// Picker filter (extensions or MIME types, comma separated).
    pub accept: String,
}

#[derive(Debug, Default)]
pub(crate) struct FilePickTracker {
    next: u64,
    pending: Option<PickTicket>,
}

impl FilePickTracker {
    pub(crate) fn begin(&mut self, accept: &str) -> PickRequest {
        self.next += 1;
        let ticket = PickTicket(self.next);
        if let Some(previous) = self.pending.replace(ticket) {
            tracing::debug!("file pick {previous:?} superseded by {ticket:?}");
        }
        PickRequest {
            ticket,
            accept: accept.to_string(),
        }
    }

    pub(crate) fn cancel(&mut self, ticket: PickTicket) {
        if self.pending == Some(ticket) {
            self.pending = None;
        }
    }

    /// Consumes `ticket` if it is the pending one.
    pub(crate) fn finish(&mut self, ticket: PickTicket) -> bool {
        if self.pending == Some(ticket) {
            self.pending = None;
            true
        } else {
            tracing::debug!("dropping stale file pick completion {ticket:?}");
            false
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FilePickError {
    #[error("{} is not a file", .0.display())]
    NotAFile(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reads a picked file from disk. This is the only asynchronous step of the
/// attachment flow.
pub async fn read_picked_file(path: &Path) -> Result<PickedFile, FilePickError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|source| FilePickError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    if !metadata.is_file() {
        return Err(FilePickError::NotAFile(path.to_path_buf()));
    }
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| FilePickError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!("read picked file {} ({} bytes)", path.display(), bytes.len());
    Ok(PickedFile::from_path(path, bytes))
}
