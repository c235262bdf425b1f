//! Error types for planning, dispatch and post-processing.

use std::path::PathBuf;

/// Errors that abort a build step.
///
/// A script that fails to compile is not an error: it is recorded as a
/// failed [`CompileOutcome`](crate::CompileOutcome) and counted.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A script or folder named by the project does not exist.
    #[error("{kind} not found: {path}")]
    MissingPath {
        /// What the path was supposed to be ("script", "folder").
        kind: &'static str,
        /// The missing path.
        path: PathBuf,
    },

    /// An I/O error occurred while scanning sources or writing logs.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An external tool could not be started or exited unsuccessfully.
    #[error("{tool} failed: {reason}")]
    Tool {
        /// Name of the tool step ("package", "zip").
        tool: &'static str,
        /// Exit status or launch error.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_display() {
        let err = BuildError::MissingPath {
            kind: "folder",
            path: PathBuf::from("/mods/Scripts/Source/Missing"),
        };
        assert_eq!(
            err.to_string(),
            "folder not found: /mods/Scripts/Source/Missing"
        );
    }

    #[test]
    fn tool_display() {
        let err = BuildError::Tool {
            tool: "package",
            reason: "exit status: 1".to_string(),
        };
        assert_eq!(err.to_string(), "package failed: exit status: 1");
    }

    #[test]
    fn io_display() {
        let err = BuildError::Io {
            path: PathBuf::from("logs"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("I/O error at logs"));
    }
}
