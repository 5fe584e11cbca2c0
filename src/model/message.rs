//! The parsed form of a single message.

use chrono::{DateTime, Utc};

use super::attachment::{AttachmentMeta, InlineImageMeta};

/// Everything the writer needs from a raw message.
///
/// Produced by [`crate::parser::mime::parse`] and consumed once by the
/// artifact writer. Addresses are bare (`user@domain`), without display names.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ParsedMessage {
    /// Decoded subject line, empty if missing.
    pub subject: String,

    /// Address of the first `From:` mailbox, empty if missing.
    pub sender_address: String,

    /// Everything after the last `@` of `sender_address`.
    pub sender_domain: String,

    /// `To:` addresses in header order.
    pub recipients: Vec<String>,

    /// `Cc:` addresses in header order.
    pub cc_recipients: Vec<String>,

    /// `Date:` header, or the wall-clock time at parse time.
    pub sent_at: DateTime<Utc>,

    /// Plain-text body, or Markdown converted from the HTML body.
    pub body_text: String,

    /// Raw HTML body, empty if the message has none.
    pub body_html: String,

    /// Parts that are not inline.
    pub attachments: Vec<AttachmentMeta>,

    /// Parts with `Content-Disposition: inline`.
    pub inline_images: Vec<InlineImageMeta>,
}

/// Domain part of an address: the substring after the last `@`, or empty.
pub fn sender_domain(address: &str) -> String {
    address
        .rsplit_once('@')
        .map(|(_, domain)| domain.to_string())
        .unwrap_or_default()
}
