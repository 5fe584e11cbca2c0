//! Recovery of attachment bytes from the parser's part bodies.
//!
//! `mail-parser` hands back a part body as binary, as text, or (for nested
//! structures) as several byte chunks. Text bodies of attachments are often
//! base64 that was not transfer-decoded, so the representation alone does not
//! say what the bytes are. [`resolve_payload`] tries, in this fixed order:
//!
//! 1. [`Payload::Binary`]: the bytes as they are.
//! 2. [`Payload::Text`]: the text with all whitespace removed, as standard base64.
//! 3. [`Payload::Text`]: the UTF-8 bytes of the text. A Rust `str` is always
//!    valid UTF-8, so this step cannot fail and no single-byte fallback is needed.
//! 4. [`Payload::Chunked`]: the chunks concatenated.
//!
//! Base64 must come before plain text: most real attachments are base64.

use std::borrow::Cow;
use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use mail_parser::{Message, MessagePart, MimeHeaders, PartType};

use crate::model::attachment::UNKNOWN_FILENAME;
use crate::parser::mime;

/// A part body as the parser represents it.
#[derive(Debug, Clone)]
pub enum Payload<'a> {
    /// Already-decoded bytes.
    Binary(Cow<'a, [u8]>),
    /// Text that may be base64 or genuine text content.
    Text(Cow<'a, str>),
    /// Bytes split over several chunks.
    Chunked(Vec<Cow<'a, [u8]>>),
}

/// Which step of the chain produced the bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    Binary,
    Base64Text,
    PlainText,
    ChunkedBytes,
}

/// Bytes recovered from a [`Payload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPayload {
    pub bytes: Vec<u8>,
    pub strategy: DecodeStrategy,
}

/// Run the decoding chain. Returns `None` when nothing usable comes out.
pub fn resolve_payload(payload: &Payload<'_>) -> Option<ResolvedPayload> {
    let (bytes, strategy) = match payload {
        Payload::Binary(data) => (data.to_vec(), DecodeStrategy::Binary),
        Payload::Text(text) => match decode_base64_text(text) {
            Some(bytes) => (bytes, DecodeStrategy::Base64Text),
            None => (text.as_bytes().to_vec(), DecodeStrategy::PlainText),
        },
        Payload::Chunked(chunks) => (chunks.concat(), DecodeStrategy::ChunkedBytes),
    };

    if bytes.is_empty() {
        None
    } else {
        Some(ResolvedPayload { bytes, strategy })
    }
}

/// Strip whitespace (line wrapping included) and decode as standard base64.
fn decode_base64_text(text: &str) -> Option<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }
    BASE64.decode(compact.as_bytes()).ok()
}

/// Describe a message part as a [`Payload`].
pub fn part_payload<'a>(message: &'a Message<'a>, part: &'a MessagePart<'a>) -> Payload<'a> {
    match &part.body {
        PartType::Binary(data) | PartType::InlineBinary(data) => {
            Payload::Binary(Cow::Borrowed(data.as_ref()))
        }
        PartType::Text(text) | PartType::Html(text) => Payload::Text(Cow::Borrowed(text.as_ref())),
        // Attached messages are stored as their raw RFC 5322 bytes.
        PartType::Message(_) => Payload::Binary(Cow::Borrowed(part.contents())),
        PartType::Multipart(children) => Payload::Chunked(
            children
                .iter()
                .filter_map(|&id| message.part(id))
                .map(|child| Cow::Borrowed(child.contents()))
                .collect(),
        ),
    }
}

/// Resolved payloads of every non-body part, keyed by filename.
///
/// Walks the same parts as the attachment and inline-image lists.
///
/// Parts sharing a filename keep the last payload seen. Parts whose payload
/// cannot be recovered are left out; the caller sees them as missing.
pub fn collect_payloads(message: &Message<'_>) -> HashMap<String, Vec<u8>> {
    let mut payloads = HashMap::new();

    for part in mime::content_parts(message) {
        let filename = part.attachment_name().unwrap_or(UNKNOWN_FILENAME).to_string();
        match resolve_payload(&part_payload(message, part)) {
            Some(resolved) => {
                tracing::debug!(
                    filename = %filename,
                    strategy = ?resolved.strategy,
                    size = resolved.bytes.len(),
                    "Resolved attachment payload"
                );
                payloads.insert(filename, resolved.bytes);
            }
            None => {
                tracing::warn!(filename = %filename, "Attachment payload is not recoverable");
            }
        }
    }

    payloads
}
