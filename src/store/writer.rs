//! Writing a parsed message to disk as Markdown plus an `attachments/` folder.
//!
//! Layout of a project directory:
//!
//! ```text
//! <project>/
//!   2024-03-05_14-30-00_hello-world.md
//!   attachments/
//!     report.pdf
//!     logo.png
//! ```
//!
//! The Markdown file is created with `create_new`, so an existing file with
//! the same name is never overwritten, even by a concurrent conversion.

use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{ConvertError, Result};
use crate::model::artifact::WrittenArtifact;
use crate::model::attachment::UNKNOWN_FILENAME;
use crate::model::message::ParsedMessage;
use crate::normalize::slugify;

/// Name of the attachments folder inside a project.
pub const ATTACHMENTS_DIR: &str = "attachments";

/// Slug used when the subject yields nothing.
pub const EMPTY_SLUG: &str = "untitled";

/// Timestamp format of the front-matter `date` value.
const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Front-matter keys sorted before `date`.
#[derive(Debug, Serialize)]
struct LeadingKeys<'a> {
    attachments: &'a [String],
    cc: &'a [String],
}

/// Front-matter keys sorted after `date`.
#[derive(Debug, Serialize)]
struct TrailingKeys<'a> {
    from: &'a str,
    subject: &'a str,
    to: &'a [String],
}

/// Attachment files written for one message.
#[derive(Debug, Default)]
struct StoredAttachments {
    /// Part filename to the name it was stored under.
    names: HashMap<String, String>,
    saved: Vec<String>,
    skipped: Vec<String>,
}

/// Writes messages into project directories.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    max_slug_length: usize,
}

impl ArtifactWriter {
    pub fn new(max_slug_length: usize) -> Self {
        Self { max_slug_length }
    }

    /// Markdown filename for a message: `YYYY-MM-DD_HH-MM-SS_<slug>.md`.
    pub fn filename_for(&self, message: &ParsedMessage) -> String {
        let mut slug = slugify(&message.subject, self.max_slug_length);
        if slug.is_empty() {
            slug = EMPTY_SLUG.to_string();
        }
        let date = message.sent_at.format("%Y-%m-%d_%H-%M-%S");
        format!("{date}_{slug}.md")
    }

    /// Write `message` into `project_dir`.
    ///
    /// The Markdown filename is reserved first, so a duplicate writes nothing.
    /// `payloads` maps part filenames to decoded bytes. Parts without a
    /// payload (or with an empty one) are reported in
    /// [`WrittenArtifact::skipped_attachments`] instead of failing. The front
    /// matter lists attachments under the names they were stored as.
    ///
    /// If a later step fails the reserved Markdown file is removed again;
    /// attachments already written stay.
    pub fn write(
        &self,
        project_dir: &Path,
        project_name: &str,
        message: &ParsedMessage,
        payloads: &HashMap<String, Vec<u8>>,
    ) -> Result<WrittenArtifact> {
        let attachments_dir = project_dir.join(ATTACHMENTS_DIR);
        std::fs::create_dir_all(&attachments_dir)
            .map_err(|e| ConvertError::io(&attachments_dir, e))?;

        let filename = self.filename_for(message);
        let md_path = project_dir.join(&filename);

        let file = match OpenOptions::new().write(true).create_new(true).open(&md_path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(ConvertError::DuplicateArtifact {
                    project: project_name.to_string(),
                    filename,
                });
            }
            Err(e) => return Err(ConvertError::io(&md_path, e)),
        };

        let stored = match fill_document(file, &md_path, &attachments_dir, message, payloads) {
            Ok(stored) => stored,
            Err(e) => {
                if let Err(rm) = std::fs::remove_file(&md_path) {
                    tracing::warn!(path = %md_path.display(), error = %rm, "Could not remove partial file");
                }
                return Err(e);
            }
        };

        tracing::info!(
            path = %md_path.display(),
            saved = stored.saved.len(),
            skipped = stored.skipped.len(),
            "Wrote message"
        );

        Ok(WrittenArtifact {
            filename,
            path: md_path,
            saved_attachments: stored.saved,
            skipped_attachments: stored.skipped,
        })
    }
}

impl Default for ArtifactWriter {
    fn default() -> Self {
        Self::new(crate::normalize::DEFAULT_SLUG_LENGTH)
    }
}

/// Write the attachments, then the document into the reserved `file`.
fn fill_document(
    mut file: File,
    md_path: &Path,
    attachments_dir: &Path,
    message: &ParsedMessage,
    payloads: &HashMap<String, Vec<u8>>,
) -> Result<StoredAttachments> {
    let stored = write_attachments(attachments_dir, message, payloads)?;

    let listed: Vec<String> = message
        .attachments
        .iter()
        .map(|a| {
            let key = part_key(&a.filename);
            stored.names.get(key).cloned().unwrap_or_else(|| key.to_string())
        })
        .collect();

    let document = render_markdown(message, &listed)?;
    file.write_all(document.as_bytes())
        .map_err(|e| ConvertError::io(md_path, e))?;
    Ok(stored)
}

/// Write every attachment and inline image that has a payload.
///
/// Parts sharing a filename share one payload and are written once. An
/// existing file is never overwritten; the new one gets a numeric suffix.
fn write_attachments(
    attachments_dir: &Path,
    message: &ParsedMessage,
    payloads: &HashMap<String, Vec<u8>>,
) -> Result<StoredAttachments> {
    let names = message
        .attachments
        .iter()
        .map(|a| part_key(&a.filename))
        .chain(message.inline_images.iter().map(|i| part_key(&i.filename)));

    let mut seen = HashSet::new();
    let mut stored = StoredAttachments::default();

    for key in names {
        if !seen.insert(key) {
            continue;
        }
        match payloads.get(key).filter(|p| !p.is_empty()) {
            Some(payload) => {
                let path = unique_path(&attachments_dir.join(safe_attachment_name(key)));
                std::fs::write(&path, payload).map_err(|e| ConvertError::io(&path, e))?;
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    stored.names.insert(key.to_string(), name.to_string());
                    stored.saved.push(name.to_string());
                }
            }
            None => {
                tracing::warn!(
                    error = %ConvertError::PayloadUnrecoverable(key.to_string()),
                    "Skipping attachment"
                );
                stored.skipped.push(key.to_string());
            }
        }
    }

    Ok(stored)
}

/// Payload key of a part filename.
fn part_key(name: &str) -> &str {
    if name.is_empty() {
        UNKNOWN_FILENAME
    } else {
        name
    }
}

/// Serialize front matter and body: `---\n<yaml>---\n\n<body>`.
///
/// Keys are written in sorted order. `date` is single-quoted so YAML 1.1
/// readers load it as a string, not a timestamp; `serde_yaml` leaves such
/// strings plain, so that line is written directly between the other keys.
pub fn render_markdown(message: &ParsedMessage, attachments: &[String]) -> Result<String> {
    let leading = serde_yaml::to_string(&LeadingKeys {
        attachments,
        cc: &message.cc_recipients,
    })?;
    let trailing = serde_yaml::to_string(&TrailingKeys {
        from: &message.sender_address,
        subject: &message.subject,
        to: &message.recipients,
    })?;
    let date = message.sent_at.format(DATE_FORMAT);

    let mut out = String::with_capacity(
        leading.len() + trailing.len() + message.body_text.len() + 48,
    );
    out.push_str("---\n");
    out.push_str(&leading);
    out.push_str(&format!("date: '{date}'\n"));
    out.push_str(&trailing);
    if !trailing.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("---\n\n");
    out.push_str(&message.body_text);
    Ok(out)
}

/// Make a part filename safe to join onto the attachments folder.
///
/// Keeps the last path component, replaces control characters and `:` with
/// `_`, and strips leading dots so `..` and hidden files cannot appear.
fn safe_attachment_name(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = last
        .chars()
        .map(|c| if c.is_control() || c == ':' { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.');

    if cleaned.is_empty() {
        UNKNOWN_FILENAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// If `path` already exists, append a counter to make it unique.
fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = path.parent().unwrap_or(Path::new("."));

    for i in 1..1000 {
        let candidate = if ext.is_empty() {
            parent.join(format!("{stem}_{i}"))
        } else {
            parent.join(format!("{stem}_{i}.{ext}"))
        };
        if !candidate.exists() {
            return candidate;
        }
    }

    parent.join(format!("{stem}_dup.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attachment::{AttachmentMeta, InlineImageMeta};
    use chrono::{TimeZone, Utc};

    fn message(subject: &str, body: &str) -> ParsedMessage {
        ParsedMessage {
            subject: subject.to_string(),
            sender_address: "alice@example.com".to_string(),
            sender_domain: "example.com".to_string(),
            recipients: vec!["bob@example.org".to_string()],
            cc_recipients: Vec::new(),
            sent_at: Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap(),
            body_text: body.to_string(),
            body_html: String::new(),
            attachments: Vec::new(),
            inline_images: Vec::new(),
        }
    }

    fn split_front_matter(doc: &str) -> (serde_yaml::Value, &str) {
        let rest = doc.strip_prefix("---\n").expect("opening marker");
        let (yaml, body) = rest.split_once("---\n\n").expect("closing marker");
        (serde_yaml::from_str(yaml).expect("valid yaml"), body)
    }

    #[test]
    fn test_filename_format() {
        let writer = ArtifactWriter::default();
        assert_eq!(
            writer.filename_for(&message("Hello, World!", "")),
            "2024-03-05_14-30-00_hello-world.md"
        );
        assert_eq!(
            writer.filename_for(&message("", "")),
            "2024-03-05_14-30-00_untitled.md"
        );
        assert_eq!(
            ArtifactWriter::new(5).filename_for(&message("abcdefgh", "")),
            "2024-03-05_14-30-00_abcde.md"
        );
    }

    #[test]
    fn test_round_trip_front_matter() {
        let tmp = tempfile::tempdir().unwrap();
        let project = tmp.path().join("Acme");
        let written = ArtifactWriter::default()
            .write(&project, "Acme", &message("Hello, World!", "hi"), &HashMap::new())
            .unwrap();

        assert_eq!(written.filename, "2024-03-05_14-30-00_hello-world.md");
        assert_eq!(written.path, project.join(&written.filename));
        assert!(project.join(ATTACHMENTS_DIR).is_dir());

        let doc = std::fs::read_to_string(&written.path).unwrap();
        let (fm, body) = split_front_matter(&doc);
        assert_eq!(fm["subject"].as_str(), Some("Hello, World!"));
        assert_eq!(fm["from"].as_str(), Some("alice@example.com"));
        assert_eq!(fm["to"][0].as_str(), Some("bob@example.org"));
        assert_eq!(fm["cc"].as_sequence().map(Vec::len), Some(0));
        assert_eq!(fm["date"].as_str(), Some("2024-03-05T14:30:00"));
        assert_eq!(fm["attachments"].as_sequence().map(Vec::len), Some(0));
        assert_eq!(body, "hi");
    }

    #[test]
    fn test_rendered_bytes() {
        let doc = render_markdown(&message("Hello, World!", "hi"), &[]).unwrap();
        assert_eq!(
            doc,
            "---\n\
             attachments: []\n\
             cc: []\n\
             date: '2024-03-05T14:30:00'\n\
             from: alice@example.com\n\
             subject: Hello, World!\n\
             to:\n\
             - bob@example.org\n\
             ---\n\
             \n\
             hi"
        );

        let mut msg = message("Offer", "");
        msg.cc_recipients = vec!["boss@example.com".into()];
        let doc = render_markdown(&msg, &["report.pdf".to_string()]).unwrap();
        assert!(doc.starts_with(
            "---\nattachments:\n- report.pdf\ncc:\n- boss@example.com\ndate: '2024-03-05T14:30:00'\n"
        ));
        assert!(doc.contains("\nsubject: Offer\nto:\n"));
        assert!(doc.ends_with("---\n\n"));
    }

    #[test]
    fn test_duplicate_is_rejected_without_touching_file() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::default();
        let first = writer
            .write(tmp.path(), "Acme", &message("Same", "first"), &HashMap::new())
            .unwrap();

        let err = writer
            .write(tmp.path(), "Acme", &message("Same", "second"), &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, ConvertError::DuplicateArtifact { .. }));
        assert!(std::fs::read_to_string(&first.path).unwrap().ends_with("first"));
    }

    #[test]
    fn test_attachments_written_and_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let mut msg = message("With files", "body");
        msg.attachments = vec![
            AttachmentMeta {
                filename: "report.pdf".into(),
                content_type: "application/pdf".into(),
                size_bytes: 3,
            },
            AttachmentMeta {
                filename: "missing.bin".into(),
                content_type: "application/octet-stream".into(),
                size_bytes: 0,
            },
        ];
        msg.inline_images = vec![InlineImageMeta {
            content_id: "logo@x".into(),
            filename: "logo.png".into(),
            content_type: "image/png".into(),
        }];

        let payloads = HashMap::from([
            ("report.pdf".to_string(), b"pdf".to_vec()),
            ("logo.png".to_string(), b"png".to_vec()),
        ]);

        let written = ArtifactWriter::default()
            .write(tmp.path(), "Acme", &msg, &payloads)
            .unwrap();

        assert_eq!(written.saved_attachments, vec!["report.pdf", "logo.png"]);
        assert_eq!(written.skipped_attachments, vec!["missing.bin"]);
        let dir = tmp.path().join(ATTACHMENTS_DIR);
        assert_eq!(std::fs::read(dir.join("report.pdf")).unwrap(), b"pdf");
        assert_eq!(std::fs::read(dir.join("logo.png")).unwrap(), b"png");
        assert!(!dir.join("missing.bin").exists());

        // Inline images are stored but not listed in the front matter.
        let doc = std::fs::read_to_string(&written.path).unwrap();
        let (fm, _) = split_front_matter(&doc);
        let listed: Vec<&str> = fm["attachments"]
            .as_sequence()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(listed, vec!["report.pdf", "missing.bin"]);
    }

    #[test]
    fn test_listed_attachments_point_at_own_payload() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::default();
        let report = AttachmentMeta {
            filename: "report.pdf".into(),
            content_type: "application/pdf".into(),
            size_bytes: 2,
        };

        let mut first = message("One", "");
        first.attachments = vec![report.clone()];
        let mut second = first.clone();
        second.subject = "Two".into();

        let runs = [(&first, b"v1".to_vec()), (&second, b"v2".to_vec())];
        let mut stored_names = Vec::new();
        for (msg, bytes) in runs {
            let payloads = HashMap::from([("report.pdf".to_string(), bytes.clone())]);
            let written = writer.write(tmp.path(), "Acme", msg, &payloads).unwrap();

            let doc = std::fs::read_to_string(&written.path).unwrap();
            let (fm, _) = split_front_matter(&doc);
            let listed = fm["attachments"][0].as_str().unwrap().to_string();
            assert_eq!(written.saved_attachments, vec![listed.clone()]);
            assert_eq!(
                std::fs::read(tmp.path().join(ATTACHMENTS_DIR).join(&listed)).unwrap(),
                bytes
            );
            stored_names.push(listed);
        }
        assert_eq!(stored_names, vec!["report.pdf", "report_1.pdf"]);
    }

    #[test]
    fn test_unsafe_names_are_listed_as_stored() {
        let tmp = tempfile::tempdir().unwrap();
        let mut msg = message("Paths", "");
        msg.attachments = vec![AttachmentMeta {
            filename: "../secret.txt".into(),
            content_type: "text/plain".into(),
            size_bytes: 1,
        }];
        let payloads = HashMap::from([("../secret.txt".to_string(), b"x".to_vec())]);

        let written = ArtifactWriter::default()
            .write(tmp.path(), "Acme", &msg, &payloads)
            .unwrap();
        let doc = std::fs::read_to_string(&written.path).unwrap();
        let (fm, _) = split_front_matter(&doc);
        assert_eq!(fm["attachments"][0].as_str(), Some("secret.txt"));
        assert!(tmp.path().join(ATTACHMENTS_DIR).join("secret.txt").exists());
    }

    #[test]
    fn test_safe_attachment_name() {
        assert_eq!(safe_attachment_name("report.pdf"), "report.pdf");
        assert_eq!(safe_attachment_name("../../etc/passwd"), "passwd");
        assert_eq!(safe_attachment_name("C:\\Users\\x\\doc.txt"), "doc.txt");
        assert_eq!(safe_attachment_name(".."), UNKNOWN_FILENAME);
        assert_eq!(safe_attachment_name(".hidden"), "hidden");
        assert_eq!(safe_attachment_name("a:b\u{0}.txt"), "a_b_.txt");
        assert_eq!(safe_attachment_name("smlouva – návrh.docx"), "smlouva – návrh.docx");
    }
}
