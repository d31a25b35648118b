//! Input buffers handed to the orchestrator at submission time.
//!
//! The caller owns its buffers; [`CountInput`] is the copy the orchestrator
//! validates and turns into a request payload.

use std::path::Path;

use anyhow::{Context, Result};

use crate::constants::{MAX_FILE_SIZE, SUPPORTED_EXTENSIONS};
use crate::error::ValidationError;
use crate::history;

/// Which buffer a submission reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Text,
    File,
}

/// A document attached for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Reads and validates a file from disk.
    ///
    /// # Errors
    ///
    /// Fails with a [`ValidationError`] for unsupported extensions or files
    /// over the size limit, or with an I/O error if the file cannot be read.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow::anyhow!("Not a file: {}", path.display()))?;
        let meta = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        validate_file(&name, meta.len())?;
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Self::new(name, bytes))
    }
}

/// Checks extension and size before anything is uploaded.
pub fn validate_file(name: &str, size: u64) -> Result<(), ValidationError> {
    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ValidationError::UnsupportedFileType(format!(".{ext}")));
    }
    if size > MAX_FILE_SIZE {
        return Err(ValidationError::FileTooLarge(size));
    }
    Ok(())
}

/// What a validated submission sends to every selected model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountPayload {
    Text(String),
    File(FileUpload),
}

impl CountPayload {
    /// Display string recorded in history for this payload.
    pub fn preview(&self) -> String {
        match self {
            Self::Text(text) => history::preview(text),
            Self::File(file) => file.name.clone(),
        }
    }
}

/// Snapshot of the caller's input buffers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountInput {
    pub mode: InputMode,
    pub text: String,
    pub file: Option<FileUpload>,
}

impl CountInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            mode: InputMode::Text,
            text: text.into(),
            file: None,
        }
    }

    pub fn file(file: Option<FileUpload>) -> Self {
        Self {
            mode: InputMode::File,
            text: String::new(),
            file,
        }
    }

    /// Validates the buffer for the active mode and builds the payload.
    pub fn to_payload(&self) -> Result<CountPayload, ValidationError> {
        match self.mode {
            InputMode::Text => {
                if self.text.trim().is_empty() {
                    return Err(ValidationError::EmptyText);
                }
                Ok(CountPayload::Text(self.text.clone()))
            }
            InputMode::File => self
                .file
                .clone()
                .map(CountPayload::File)
                .ok_or(ValidationError::NoFile),
        }
    }
}
