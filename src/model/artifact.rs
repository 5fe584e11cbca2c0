//! Result types returned once a message has been stored.

use std::path::PathBuf;

/// What the artifact writer put on disk for one message.
#[derive(Debug, Clone)]
pub struct WrittenArtifact {
    /// Generated Markdown filename (`YYYY-MM-DD_HH-MM-SS_<slug>.md`).
    pub filename: String,

    /// Full path of the Markdown file.
    pub path: PathBuf,

    /// Names of the files written under `attachments/`.
    pub saved_attachments: Vec<String>,

    /// Parts that had no usable payload and were skipped.
    pub skipped_attachments: Vec<String>,
}

/// Response of a successful conversion, as handed to the transport layer.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConversionOutcome {
    /// Always `"success"`.
    pub status: &'static str,
    /// Normalized project name.
    pub project_name: String,
    /// Generated Markdown filename.
    pub filename: String,
    /// Full path of the Markdown file.
    pub path: PathBuf,
    /// `true` if the project directory did not exist before this conversion.
    pub created_project: bool,
    pub saved_attachments: Vec<String>,
    pub skipped_attachments: Vec<String>,
}

impl ConversionOutcome {
    pub fn new(project_name: String, created_project: bool, artifact: WrittenArtifact) -> Self {
        Self {
            status: "success",
            project_name,
            filename: artifact.filename,
            path: artifact.path,
            created_project,
            saved_attachments: artifact.saved_attachments,
            skipped_attachments: artifact.skipped_attachments,
        }
    }
}
