//! Attachment and inline-image metadata.
//!
//! Only descriptive fields live here. Payload bytes are resolved separately
//! by [`crate::parser::payload`] and looked up by filename at write time.

/// Placeholder used when a part carries no filename.
pub const UNKNOWN_FILENAME: &str = "unknown";

/// Content type used when a part does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Metadata about a downloadable attachment.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AttachmentMeta {
    /// Filename from `Content-Disposition`/`Content-Type`, or [`UNKNOWN_FILENAME`].
    pub filename: String,

    /// MIME content type (e.g. `"application/pdf"`).
    pub content_type: String,

    /// Decoded size in bytes.
    pub size_bytes: u64,
}

/// Metadata about a part with `Content-Disposition: inline`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InlineImageMeta {
    /// `Content-ID` without the surrounding angle brackets. May be empty.
    pub content_id: String,

    /// Filename of the part. May be empty.
    pub filename: String,

    /// MIME content type. May be empty.
    pub content_type: String,
}
