//! Files pending on the in-flight message and their chips.

use std::sync::Arc;

use chat_input_protocol::FileDescriptor;
use chat_input_protocol::FileId;
use chat_input_protocol::PickedFile;

use crate::editor::chip::AttachmentChip;
use crate::editor::chip::ChipContainer;
use crate::editor::chip::FileIconProvider;

/// Tracked attachments, in insertion order. Each file has exactly one chip.
pub struct AttachmentTracker {
    files: Vec<FileDescriptor>,
    chips: ChipContainer,
    icons: Arc<dyn FileIconProvider>,
}

impl AttachmentTracker {
    pub fn new(icons: Arc<dyn FileIconProvider>) -> Self {
        Self {
            files: Vec::new(),
            chips: ChipContainer::default(),
            icons,
        }
    }

    /// Starts tracking `file` and adds its chip.
    pub fn attach(&mut self, file: PickedFile) -> FileDescriptor {
        let descriptor = FileDescriptor::from_picked(file);
        self.chips
            .insert(AttachmentChip::new(&descriptor, self.icons.as_ref()));
        self.files.push(descriptor.clone());
        tracing::debug!(
            "attached {} as {} ({} tracked)",
            descriptor.name,
            descriptor.id,
            self.files.len()
        );
        descriptor
    }

    /// Stops tracking `id`. Unknown ids are a no-op.
    pub fn detach(&mut self, id: &FileId) -> Option<FileDescriptor> {
        let idx = self.files.iter().position(|file| file.id == *id)?;
        self.chips.remove(id);
        Some(self.files.remove(idx))
    }

    pub fn list(&self) -> &[FileDescriptor] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Empties the tracker, removing every chip.
    pub fn take_all(&mut self) -> Vec<FileDescriptor> {
        self.chips.clear();
        std::mem::take(&mut self.files)
    }

    pub fn chips(&self) -> &ChipContainer {
        &self.chips
    }
}
