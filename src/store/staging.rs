//! Per-conversion temporary storage for the raw message.
//!
//! The raw upload is written to a named temporary file before parsing and
//! removed when the conversion finishes. Dropping a [`StagedMessage`]
//! without calling [`StagedMessage::release`] also removes the file.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{ConvertError, Result};

/// Prefix of every staged file name.
const STAGING_PREFIX: &str = "eml2md-";

/// A raw message staged on disk.
#[derive(Debug)]
pub struct StagedMessage {
    file: NamedTempFile,
}

impl StagedMessage {
    /// Copy `input` into a new temporary file under `dir`, reading at most `max_size` bytes.
    ///
    /// Input larger than `max_size` is rejected as malformed.
    pub fn stage(dir: &Path, input: &mut dyn Read, max_size: u64) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|e| ConvertError::io(dir, e))?;
        let mut file = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(".eml")
            .tempfile_in(dir)
            .map_err(|e| ConvertError::io(dir, e))?;

        let path = file.path().to_path_buf();
        // One byte over the limit is enough to detect oversized input.
        let len = std::io::copy(&mut input.take(max_size.saturating_add(1)), file.as_file_mut())
            .map_err(|e| ConvertError::io(&path, e))?;
        if len > max_size {
            return Err(ConvertError::MalformedMessage(format!(
                "message exceeds {max_size} bytes"
            )));
        }
        file.as_file_mut()
            .flush()
            .map_err(|e| ConvertError::io(&path, e))?;

        tracing::debug!(path = %path.display(), bytes = len, "Staged raw message");
        Ok(Self { file })
    }

    /// Path of the staged file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Read the staged bytes back.
    pub fn read(&self) -> Result<Vec<u8>> {
        std::fs::read(self.path()).map_err(|e| ConvertError::io(self.path(), e))
    }

    /// Remove the staged file.
    pub fn release(self) -> Result<()> {
        let path: PathBuf = self.file.path().to_path_buf();
        self.file.close().map_err(|e| ConvertError::io(&path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_and_release() {
        let tmp = tempfile::tempdir().unwrap();
        let mut input: &[u8] = b"Subject: hi\r\n\r\nbody";
        let staged = StagedMessage::stage(tmp.path(), &mut input, 1024).unwrap();

        let path = staged.path().to_path_buf();
        assert!(path.exists());
        assert!(path.starts_with(tmp.path()));
        assert_eq!(staged.read().unwrap(), b"Subject: hi\r\n\r\nbody");

        staged.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_file() {
        let tmp = tempfile::tempdir().unwrap();
        let mut input: &[u8] = b"x";
        let path = {
            let staged = StagedMessage::stage(tmp.path(), &mut input, 10).unwrap();
            staged.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_oversized_input_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut input: &[u8] = b"0123456789";
        let err = StagedMessage::stage(tmp.path(), &mut input, 5).unwrap_err();
        assert!(matches!(err, ConvertError::MalformedMessage(_)));
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }
}
