use crate::core::error::DochatError;
use crate::storage::DocumentRepository;

pub mod encoder;

/// A file the user has selected but not yet sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAttachment {
    pub name: String,
    pub media_type: String,
    pub raw_bytes: Vec<u8>,
}

/// Read a document through the repository boundary into a pending attachment.
///
/// The media type is derived from the file name the same way the encoder
/// classifies it; a read failure is an encoding error because it makes the
/// whole send unbuildable.
pub async fn load_attachment(
    repo: &dyn DocumentRepository,
    path: &str,
    name: &str,
) -> Result<PendingAttachment, DochatError> {
    let raw_bytes = repo
        .read(path)
        .await
        .map_err(|e| DochatError::Encoding(format!("Failed to read {}: {}", path, e)))?;
    Ok(PendingAttachment {
        name: name.to_string(),
        media_type: encoder::media_type_for(name).to_string(),
        raw_bytes,
    })
}

/// Holds selected files until the next send drains them.
///
/// Duplicates by name are permitted. Draining clears the queue even when the
/// send that drained it later fails; attachments are not retained for
/// resubmission.
#[derive(Debug, Default)]
pub struct AttachmentQueue {
    pending: Vec<PendingAttachment>,
}

impl AttachmentQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, attachment: PendingAttachment) {
        self.pending.push(attachment);
    }

    /// Atomically read-and-clear, in enqueue order.
    pub fn drain_for_send(&mut self) -> Vec<PendingAttachment> {
        std::mem::take(&mut self.pending)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// File names currently queued, for display.
    pub fn names(&self) -> Vec<&str> {
        self.pending.iter().map(|a| a.name.as_str()).collect()
    }
}
