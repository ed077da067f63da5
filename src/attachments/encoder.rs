use crate::attachments::PendingAttachment;
use crate::conversation::{InlineData, Part};
use crate::core::error::DochatError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// How an attachment is carried in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Binary,
    Text,
}

/// Classify by file extension.
///
/// Unrecognized extensions (and names without one) default to Text rather
/// than being rejected; an unknown binary format will then fail UTF-8 decode
/// in `encode` and abort the send.
pub fn classify(name: &str) -> AttachmentKind {
    match extension(name).as_deref() {
        Some("pdf" | "doc" | "docx" | "jpg" | "jpeg" | "png") => AttachmentKind::Binary,
        _ => AttachmentKind::Text,
    }
}

/// Declared media type for a file name, keyed on the same extension table.
pub fn media_type_for(name: &str) -> &'static str {
    match extension(name).as_deref() {
        Some("pdf") => "application/pdf",
        Some("doc" | "docx") => "application/msword",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "text/plain",
    }
}

fn extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() {
        // dotfiles like ".env" have no extension
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Turn a pending attachment into a request-ready part.
///
/// Binary files are base64-encoded into an attachment part carrying the
/// declared media type. Text files become a plain text part; the media type
/// is not retained. Invalid UTF-8 in a text file is fatal to the whole send,
/// never skipped.
pub fn encode(attachment: PendingAttachment) -> Result<Part, DochatError> {
    match classify(&attachment.name) {
        AttachmentKind::Binary => Ok(Part::Attachment {
            media_type: attachment.media_type,
            data: InlineData::Base64(STANDARD.encode(&attachment.raw_bytes)),
        }),
        AttachmentKind::Text => {
            let text = String::from_utf8(attachment.raw_bytes).map_err(|e| {
                DochatError::Encoding(format!(
                    "{} is not valid UTF-8: {}",
                    attachment.name, e
                ))
            })?;
            Ok(Part::Text(text))
        }
    }
}
