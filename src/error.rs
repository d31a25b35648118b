//! Error taxonomy for the synchronization engine.
//!
//! [`ClientError`] is what counting and catalog requests surface; its
//! variants split caller mistakes ([`ValidationError`]) from unreachable
//! servers and from server-reported failures. [`ChannelError`] belongs to the
//! push channel and never reaches the counting error slot.

use thiserror::Error;

/// A request was rejected before any I/O took place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no model selected")]
    NoModelSelected,
    #[error("empty text")]
    EmptyText,
    #[error("no file")]
    NoFile,
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("file too large: {0} bytes")]
    FileTooLarge(u64),
    #[error("invalid model name")]
    InvalidModelName,
}

/// Failure of a request/response operation against the counting service.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// Pre-flight check failed; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The server could not be reached or the exchange broke off.
    #[error("{0}")]
    Transport(String),
    /// The server answered with a non-success status.
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        code: Option<String>,
    },
    /// A newer `count_tokens` call started before this one finished.
    #[error("superseded by a newer count request")]
    Superseded,
}

impl ClientError {
    /// Builds an [`ClientError::Api`] from a status and an optional parsed body.
    ///
    /// Falls back to `"HTTP error <status>"` when the body carries no message.
    pub fn api(status: u16, message: Option<String>, code: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("HTTP error {status}"));
        Self::Api {
            status,
            message,
            code,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Failure of the push channel transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("invalid push endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("socket error: {0}")]
    Socket(String),
}
