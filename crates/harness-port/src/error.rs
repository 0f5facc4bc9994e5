//! Error taxonomy for loading, rewriting, and writing documents.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortError {
    /// Metadata block is unterminated or not a well-formed key/value mapping.
    #[error("malformed metadata block in {identity}: {reason}")]
    Parse { identity: String, reason: String },

    /// Input directory does not exist; callers treat this as a skipped batch.
    #[error("directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    /// Rule configuration rejected at load time (bad regex, missing field).
    #[error("invalid rule #{index}: {reason}")]
    InvalidRule { index: usize, reason: String },

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("git {command} failed: {message}")]
    Sync { command: String, message: String },
}

impl PortError {
    pub(crate) fn parse(identity: &str, reason: impl Into<String>) -> Self {
        PortError::Parse {
            identity: identity.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PortError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for failures the batch runner downgrades to a warning.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PortError::MissingDirectory(_))
    }
}

pub type Result<T> = std::result::Result<T, PortError>;
