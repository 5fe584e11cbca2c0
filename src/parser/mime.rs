//! MIME message parsing: headers, body selection, HTML-to-Markdown, part classification.

use chrono::{DateTime, Utc};
use mail_parser::{Address, HeaderName, Message, MessagePart, MessageParser, MimeHeaders, PartType};

use crate::error::{ConvertError, Result};
use crate::model::attachment::{
    AttachmentMeta, InlineImageMeta, DEFAULT_CONTENT_TYPE, UNKNOWN_FILENAME,
};
use crate::model::message::{sender_domain, ParsedMessage};

/// Parse a complete raw message (headers + body) into a [`ParsedMessage`].
///
/// Fails only when the bytes are not a message at all: empty input, input
/// `mail-parser` rejects, or input without a single standard header. A
/// missing or unparseable `Date:` falls back to the current time.
pub fn parse(raw_message: &[u8]) -> Result<ParsedMessage> {
    let message_bytes = skip_from_line(raw_message);
    if message_bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ConvertError::MalformedMessage("empty input".into()));
    }

    let msg = MessageParser::default()
        .parse(message_bytes)
        .ok_or_else(|| ConvertError::MalformedMessage("not a MIME message".into()))?;

    // Free text parses as one unknown header; require a real one.
    if !msg
        .headers()
        .iter()
        .any(|h| !matches!(h.name, HeaderName::Other(_)))
    {
        return Err(ConvertError::MalformedMessage("no message headers found".into()));
    }

    let sender_address = msg
        .from()
        .and_then(|from| from.first())
        .and_then(|addr| addr.address())
        .unwrap_or_default()
        .to_string();

    let sent_at = msg
        .date()
        .and_then(|d| DateTime::<Utc>::from_timestamp(d.to_timestamp(), 0))
        .unwrap_or_else(|| {
            tracing::debug!("No usable Date header, using current time");
            Utc::now()
        });

    let body_html = msg
        .html_bodies()
        .filter(|part| part.attachment_name().is_none())
        .find_map(|part| match &part.body {
            PartType::Html(html) => Some(html.to_string()),
            _ => None,
        })
        .unwrap_or_default();

    // `text_bodies` also lists HTML parts when no text/plain alternative exists.
    // Blank text counts as missing so an HTML alternative still gets converted.
    let body_text = msg
        .text_bodies()
        .filter(|part| part.attachment_name().is_none())
        .find_map(|part| match &part.body {
            PartType::Text(text) => Some(text.to_string()),
            _ => None,
        })
        .filter(|text| !text.trim().is_empty());
    let body_text = match body_text {
        Some(text) => text,
        None if !body_html.is_empty() => html_to_markdown(&body_html),
        None => String::new(),
    };

    let (attachments, inline_images) = classify_parts(&msg);

    Ok(ParsedMessage {
        subject: msg.subject().unwrap_or_default().to_string(),
        sender_domain: sender_domain(&sender_address),
        sender_address,
        recipients: address_list(msg.to()),
        cc_recipients: address_list(msg.cc()),
        sent_at,
        body_text,
        body_html,
        attachments,
        inline_images,
    })
}

/// Bare addresses of an address header, in order.
fn address_list(header: Option<&Address<'_>>) -> Vec<String> {
    header
        .map(|list| {
            list.iter()
                .filter_map(|addr| addr.address().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// Every part that is not a message body, in MIME order.
///
/// `mail-parser` files inline text parts under the bodies even when they
/// carry a filename; such parts are included here. Multipart containers and
/// nameless body parts are not.
pub(crate) fn content_parts<'a, 'x>(
    msg: &'a Message<'x>,
) -> impl Iterator<Item = &'a MessagePart<'x>> + 'a {
    msg.parts
        .iter()
        .enumerate()
        .filter(move |(id, part)| {
            if matches!(part.body, PartType::Multipart(_)) {
                return false;
            }
            let is_body = msg.text_body.contains(id) || msg.html_body.contains(id);
            !is_body || part.attachment_name().is_some()
        })
        .map(|(_, part)| part)
}

/// Split the non-body parts into attachments and inline images.
///
/// `Content-Disposition: inline` is the only discriminator. Every other
/// part, with or without a disposition, is an attachment.
fn classify_parts(msg: &Message<'_>) -> (Vec<AttachmentMeta>, Vec<InlineImageMeta>) {
    let mut attachments = Vec::new();
    let mut inline_images = Vec::new();

    for part in content_parts(msg) {
        let content_type = part.content_type().map(|ct: &mail_parser::ContentType| {
            let main = ct.ctype();
            match ct.subtype() {
                Some(sub) => format!("{main}/{sub}"),
                None => main.to_string(),
            }
        });

        let is_inline = part
            .content_disposition()
            .map(|d: &mail_parser::ContentType| d.ctype().eq_ignore_ascii_case("inline"))
            .unwrap_or(false);

        if is_inline {
            inline_images.push(InlineImageMeta {
                content_id: part
                    .content_id()
                    .map(|id| id.trim().trim_start_matches('<').trim_end_matches('>').to_string())
                    .unwrap_or_default(),
                filename: part.attachment_name().unwrap_or_default().to_string(),
                content_type: content_type.unwrap_or_default(),
            });
        } else {
            attachments.push(AttachmentMeta {
                filename: part
                    .attachment_name()
                    .unwrap_or(UNKNOWN_FILENAME)
                    .to_string(),
                content_type: content_type.unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
                size_bytes: part.contents().len() as u64,
            });
        }
    }

    (attachments, inline_images)
}

/// Skip a leading BOM and an mbox `From ` separator line.
pub(crate) fn skip_from_line(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);

    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}

/// Convert an HTML body to Markdown with ATX (`#`) headings.
///
/// If the converter errors out the HTML is kept as is; Markdown allows raw HTML.
pub fn html_to_markdown(html: &str) -> String {
    use htmd::options::{HeadingStyle, Options};

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "head"])
        .options(Options {
            heading_style: HeadingStyle::Atx,
            ..Default::default()
        })
        .build();

    match converter.convert(html) {
        Ok(md) => md.trim().to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "HTML to Markdown conversion failed, keeping HTML");
            html.trim().to_string()
        }
    }
}
