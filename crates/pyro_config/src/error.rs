//! Error types for project loading and resolution.

use pyro_common::GameType;

/// Errors that can occur when loading, validating or resolving a `pyro.toml`
/// project description.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the project file.
    #[error("failed to read project: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse project: {0}")]
    ParseError(String),

    /// A required field is missing from the project.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A project value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// The game install directory is not usable.
    #[error("invalid game path: {0}")]
    GamePath(String),

    /// The install locator could not find the game.
    #[error("cannot locate {game} install: {reason}")]
    Locator {
        /// The game that was looked up.
        game: GameType,
        /// Why the lookup failed.
        reason: String,
    },

    /// A remote source URL does not belong to a supported host.
    #[error("unsupported remote URL '{0}'")]
    UnsupportedRemote(String),
}
