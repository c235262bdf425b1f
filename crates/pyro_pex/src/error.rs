//! Error types for module header operations.

use std::path::PathBuf;

/// Errors that can occur while reading or rewriting a module header.
#[derive(Debug, thiserror::Error)]
pub enum PexError {
    /// The file is not a compiled module this codec understands, or its
    /// header is cut short.
    #[error("invalid module header in {path}: {reason}")]
    Format {
        /// The module file path.
        path: PathBuf,
        /// Description of the format problem.
        reason: String,
    },

    /// An I/O error occurred while reading or writing the module.
    #[error("module I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl PexError {
    /// Returns `true` if this is a format error rather than an I/O failure.
    pub fn is_format(&self) -> bool {
        matches!(self, PexError::Format { .. })
    }
}
