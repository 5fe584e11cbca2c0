//! Centralized error types for eml2md.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the eml2md library.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// The project name is empty once normalized.
    #[error("Invalid project name: '{0}'")]
    InvalidIdentifier(String),

    /// The input does not look like an `.eml` file.
    #[error("Not an email file (expected .eml): {0}")]
    NotAnEmail(String),

    /// The raw input could not be parsed as a MIME message.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// A Markdown file with the generated name already exists in the project.
    #[error("File {filename} already exists in project {project}")]
    DuplicateArtifact { project: String, filename: String },

    /// A single attachment payload could not be recovered. Never aborts a conversion.
    #[error("Attachment '{0}' has no recoverable payload")]
    PayloadUnrecoverable(String),

    /// The requested project does not exist under any root.
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Front matter could not be serialized.
    #[error("Front matter serialization failed: {0}")]
    FrontMatter(#[from] serde_yaml::Error),
}

/// Convenience alias for `Result<T, ConvertError>`.
pub type Result<T> = std::result::Result<T, ConvertError>;

/// How a transport layer should report a failure to its client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Bad input from the caller (HTTP 400).
    InvalidInput,
    /// The target already exists (HTTP 409).
    Conflict,
    /// Unknown project on a read-only lookup (HTTP 404).
    NotFound,
    /// Everything else (HTTP 500).
    Internal,
}

impl FailureClass {
    /// The HTTP status code this class corresponds to.
    pub fn status_code(self) -> u16 {
        match self {
            Self::InvalidInput => 400,
            Self::Conflict => 409,
            Self::NotFound => 404,
            Self::Internal => 500,
        }
    }
}

impl ConvertError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Classify this error for the transport layer.
    pub fn class(&self) -> FailureClass {
        match self {
            Self::InvalidIdentifier(_) | Self::NotAnEmail(_) => FailureClass::InvalidInput,
            Self::DuplicateArtifact { .. } => FailureClass::Conflict,
            Self::ProjectNotFound(_) => FailureClass::NotFound,
            Self::MalformedMessage(_)
            | Self::PayloadUnrecoverable(_)
            | Self::Io { .. }
            | Self::FrontMatter(_) => FailureClass::Internal,
        }
    }

    /// Short machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier(_) => "invalid_identifier",
            Self::NotAnEmail(_) => "not_an_email",
            Self::MalformedMessage(_) => "malformed_message",
            Self::DuplicateArtifact { .. } => "duplicate_artifact",
            Self::PayloadUnrecoverable(_) => "payload_unrecoverable",
            Self::ProjectNotFound(_) => "project_not_found",
            Self::Io { .. } => "filesystem_failure",
            Self::FrontMatter(_) => "front_matter",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classes_map_to_status_codes() {
        let dup = ConvertError::DuplicateArtifact {
            project: "Acme".into(),
            filename: "x.md".into(),
        };
        assert_eq!(dup.class().status_code(), 409);
        assert_eq!(
            ConvertError::InvalidIdentifier("***".into()).class(),
            FailureClass::InvalidInput
        );
        assert_eq!(ConvertError::ProjectNotFound("x".into()).class().status_code(), 404);
        assert_eq!(
            ConvertError::MalformedMessage("empty".into()).class().status_code(),
            500
        );
    }

    #[test]
    fn test_duplicate_message_names_file_and_project() {
        let dup = ConvertError::DuplicateArtifact {
            project: "Acme".into(),
            filename: "2024-03-05_14-30-00_hi.md".into(),
        };
        let msg = dup.to_string();
        assert!(msg.contains("Acme"));
        assert!(msg.contains("2024-03-05_14-30-00_hi.md"));
        assert_eq!(dup.kind(), "duplicate_artifact");
    }
}
