//! End-to-end conversion of a raw message into a stored Markdown artifact.

use std::io::Read;
use std::path::Path;

use crate::config::Config;
use crate::error::{ConvertError, Result};
use crate::model::artifact::ConversionOutcome;
use crate::model::message::ParsedMessage;
use crate::normalize::normalize_identifier;
use crate::parser::{mime, payload};
use crate::store::project::{self, ProjectRoots};
use crate::store::staging::StagedMessage;
use crate::store::writer::ArtifactWriter;

/// Converts messages into a project tree.
///
/// Holds no mutable state; one instance can serve any number of conversions.
#[derive(Debug, Clone)]
pub struct Converter {
    roots: ProjectRoots,
    staging_dir: std::path::PathBuf,
    max_message_size: u64,
    writer: ArtifactWriter,
}

impl Converter {
    pub fn new(config: &Config) -> Self {
        Self {
            roots: config.storage.roots(),
            staging_dir: config.storage.staging_dir(),
            max_message_size: config.convert.max_message_size,
            writer: ArtifactWriter::new(config.convert.max_slug_length),
        }
    }

    /// Convert a message read from `input` into project `project_name`.
    ///
    /// The project name is validated before anything touches the filesystem.
    /// The raw message is staged for the duration of the call and removed
    /// afterwards, whether the conversion succeeds or not.
    pub fn convert(&self, input: &mut dyn Read, project_name: &str) -> Result<ConversionOutcome> {
        let project_name = validate_project_name(project_name)?;

        let staged = StagedMessage::stage(&self.staging_dir, input, self.max_message_size)?;
        let raw = staged.read()?;
        let outcome = self.convert_bytes(&raw, &project_name)?;
        staged.release()?;

        Ok(outcome)
    }

    /// Convert an `.eml` file. Paths without the `.eml` extension are rejected.
    pub fn convert_file(&self, path: &Path, project_name: &str) -> Result<ConversionOutcome> {
        if !has_eml_extension(path) {
            return Err(ConvertError::NotAnEmail(path.display().to_string()));
        }
        validate_project_name(project_name)?;

        let mut file = std::fs::File::open(path).map_err(|e| ConvertError::io(path, e))?;
        self.convert(&mut file, project_name)
    }

    /// Parse, resolve the project and write. `project_name` must already be normalized.
    fn convert_bytes(&self, raw: &[u8], project_name: &str) -> Result<ConversionOutcome> {
        let message = mime::parse(raw)?;
        // Payloads come from a second pass over the raw bytes, keyed by filename.
        let payloads = mail_parser::MessageParser::default()
            .parse(mime::skip_from_line(raw))
            .map(|msg| payload::collect_payloads(&msg))
            .unwrap_or_default();

        let resolution = project::resolve(project_name, &self.roots);
        let artifact =
            self.writer
                .write(&resolution.project_dir, project_name, &message, &payloads)?;

        tracing::info!(
            project = project_name,
            filename = %artifact.filename,
            created_project = resolution.created,
            "Converted message"
        );
        Ok(ConversionOutcome::new(
            project_name.to_string(),
            resolution.created,
            artifact,
        ))
    }
}

/// Parse a message without storing anything.
pub fn inspect(input: &mut dyn Read) -> Result<ParsedMessage> {
    let mut raw = Vec::new();
    input
        .read_to_end(&mut raw)
        .map_err(|e| ConvertError::io("<input>", e))?;
    mime::parse(&raw)
}

/// Normalize a user-supplied project name, rejecting names that normalize to nothing.
pub fn validate_project_name(raw: &str) -> Result<String> {
    let normalized = normalize_identifier(raw.trim());
    if normalized.is_empty() {
        return Err(ConvertError::InvalidIdentifier(raw.to_string()));
    }
    Ok(normalized)
}

fn has_eml_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("eml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_project_name() {
        assert_eq!(validate_project_name("  Acme Corp ").unwrap(), "Acme_Corp");
        assert!(matches!(
            validate_project_name(""),
            Err(ConvertError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            validate_project_name("***"),
            Err(ConvertError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_has_eml_extension() {
        assert!(has_eml_extension(Path::new("a/b/message.eml")));
        assert!(has_eml_extension(Path::new("MESSAGE.EML")));
        assert!(!has_eml_extension(Path::new("message.txt")));
        assert!(!has_eml_extension(Path::new("eml")));
    }
}
