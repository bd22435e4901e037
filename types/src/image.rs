use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest attachment accepted for inline upload (8 MiB of raw bytes).
pub const MAX_ATTACHMENT_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("unsupported image type: {0:?} (expected png, jpg, gif, or webp)")]
    UnsupportedType(String),
    #[error("attachment is empty")]
    Empty,
    #[error("attachment is {actual} bytes, over the {limit} byte limit")]
    TooLarge { actual: usize, limit: usize },
}

/// A user-supplied image staged for a chat turn.
///
/// Bytes are base64-encoded eagerly at staging time; the wire format for
/// Gemini `inline_data` wants base64 anyway, and holding the encoded
/// form means nothing re-reads the file at submit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    data: String,
    mime: &'static str,
    file_name: String,
    raw_len: usize,
}

impl ImageAttachment {
    /// Build an attachment from raw file bytes and the source file name.
    ///
    /// The MIME type is inferred from the file extension; unknown
    /// extensions are rejected here, before anything is staged.
    pub fn from_bytes(file_name: &str, bytes: &[u8]) -> Result<Self, AttachmentError> {
        if bytes.is_empty() {
            return Err(AttachmentError::Empty);
        }
        if bytes.len() > MAX_ATTACHMENT_BYTES {
            return Err(AttachmentError::TooLarge {
                actual: bytes.len(),
                limit: MAX_ATTACHMENT_BYTES,
            });
        }

        let mime = mime_for(file_name)?;
        Ok(Self {
            data: BASE64.encode(bytes),
            mime,
            file_name: file_name.to_string(),
            raw_len: bytes.len(),
        })
    }

    /// Base64-encoded image bytes, ready for Gemini `inline_data`.
    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }

    #[must_use]
    pub fn mime(&self) -> &'static str {
        self.mime
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Size of the original (un-encoded) bytes.
    #[must_use]
    pub fn raw_len(&self) -> usize {
        self.raw_len
    }
}

fn mime_for(file_name: &str) -> Result<&'static str, AttachmentError> {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "gif" => Ok("image/gif"),
        "webp" => Ok("image/webp"),
        _ => Err(AttachmentError::UnsupportedType(ext)),
    }
}

/// An image produced by the backend, held as inline base64 data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    data: String,
    mime: String,
}

impl GeneratedImage {
    #[must_use]
    pub fn new(data: String, mime: String) -> Self {
        Self { data, mime }
    }

    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }

    #[must_use]
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Decoded size in bytes, without allocating the decoded buffer.
    ///
    /// Saturates to zero on payloads shorter than one base64 quantum, so
    /// a malformed backend reply renders as a 0-byte placeholder instead
    /// of panicking the render loop.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        let padding = self.data.bytes().rev().take_while(|b| *b == b'=').count();
        ((self.data.len() / 4) * 3).saturating_sub(padding)
    }

    /// Decode back to raw bytes, e.g. for `:save`.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(&self.data)
    }
}
