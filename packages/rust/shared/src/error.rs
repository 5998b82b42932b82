//! Error types for Chatdesk.
//!
//! Library crates use [`ChatdeskError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Chatdesk operations.
///
/// Note that the turn pipeline itself never hands one of these to its caller
/// for empty submissions, failed reads or dictation errors; those are
/// outcomes, not failures. Errors come out of capabilities and config.
#[derive(Debug, thiserror::Error)]
pub enum ChatdeskError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A file-reading capability failed to produce a payload.
    #[error("read error: {0}")]
    Read(String),

    /// A host capability (dictation) failed or is unavailable.
    #[error("capability error: {0}")]
    Capability(String),

    /// Data validation error (bad accept list, unknown mode, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ChatdeskError>;

impl ChatdeskError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a read error from any displayable message.
    pub fn read(msg: impl Into<String>) -> Self {
        Self::Read(msg.into())
    }

    /// Create a capability error from any displayable message.
    pub fn capability(msg: impl Into<String>) -> Self {
        Self::Capability(msg.into())
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
