//! Project file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// Default project file name.
pub const PROJECT_FILE: &str = "pyro.toml";

/// Loads and validates a project description.
///
/// `path` may name the project file itself or a directory containing
/// `pyro.toml`.
pub fn load_project(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let file = if path.is_dir() {
        path.join(PROJECT_FILE)
    } else {
        path.to_path_buf()
    };
    let content = std::fs::read_to_string(&file)?;
    load_project_from_str(&content)
}

/// Parses and validates a project description from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_project_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_project(&config)?;
    Ok(config)
}

/// Validates that required fields are present and toggles have their tables.
fn validate_project(config: &ProjectConfig) -> Result<(), ConfigError> {
    let p = &config.project;
    if p.name.trim().is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if p.imports.is_empty() {
        return Err(ConfigError::MissingField("project.imports".to_string()));
    }
    if p.scripts.is_empty() && config.folders.is_empty() {
        return Err(ConfigError::ValidationError(
            "project must list at least one script or folder".to_string(),
        ));
    }
    if p.package && config.package.is_none() {
        return Err(ConfigError::MissingField("package".to_string()));
    }
    if p.zip && config.zip.is_none() {
        return Err(ConfigError::MissingField("zip".to_string()));
    }
    if config.build.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "build.timeout_secs must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
