//! Discovery of game install directories.
//!
//! Looking up where a game is installed is platform specific. The lookup
//! sits behind [`InstallLocator`] so resolution code never branches on the
//! host platform: Windows hosts query the registry, other hosts get a
//! locator that always reports the game as not found.

use crate::error::ConfigError;
use pyro_common::GameType;
use std::path::PathBuf;
use std::process::Command;

/// Finds the install directory of a game.
pub trait InstallLocator {
    /// Returns the install directory of `game`.
    fn installed_path(&self, game: GameType) -> Result<PathBuf, ConfigError>;
}

/// Returns the registry key holding a game's install path.
pub fn registry_key(game: GameType) -> String {
    format!(
        r"HKLM\SOFTWARE\WOW6432Node\Bethesda Softworks\{}",
        game.registry_name()
    )
}

/// Registry value name holding the install path.
pub const REGISTRY_VALUE: &str = "Installed Path";

/// Looks up install paths with `reg.exe query`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegistryLocator;

impl InstallLocator for RegistryLocator {
    fn installed_path(&self, game: GameType) -> Result<PathBuf, ConfigError> {
        let key = registry_key(game);
        let output = Command::new("reg")
            .args(["query", &key, "/v", REGISTRY_VALUE])
            .output()
            .map_err(|e| ConfigError::Locator {
                game,
                reason: format!("failed to run reg.exe: {e}"),
            })?;

        if !output.status.success() {
            return Err(ConfigError::Locator {
                game,
                reason: format!("registry key '{key}' not found"),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout);
        parse_reg_query(&text).ok_or_else(|| ConfigError::Locator {
            game,
            reason: format!("no '{REGISTRY_VALUE}' value under '{key}'"),
        })
    }
}

/// Extracts the install path from `reg query` output.
///
/// The value line looks like `    Installed Path    REG_SZ    C:\Games\Skyrim\`.
pub fn parse_reg_query(output: &str) -> Option<PathBuf> {
    output.lines().find_map(|line| {
        let line = line.trim();
        let rest = line.strip_prefix(REGISTRY_VALUE)?;
        let (_, value) = rest.split_once("REG_SZ")?;
        let value = value.trim();
        (!value.is_empty()).then(|| PathBuf::from(value))
    })
}

/// A locator for hosts without an install registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLocator;

impl InstallLocator for NoLocator {
    fn installed_path(&self, game: GameType) -> Result<PathBuf, ConfigError> {
        Err(ConfigError::Locator {
            game,
            reason: "install lookup is not available on this platform; set project.game_path"
                .to_string(),
        })
    }
}

/// Returns the locator for the current host.
pub fn default_locator() -> Box<dyn InstallLocator> {
    if cfg!(windows) {
        Box::new(RegistryLocator)
    } else {
        Box::new(NoLocator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_keys() {
        assert_eq!(
            registry_key(GameType::Fo4),
            r"HKLM\SOFTWARE\WOW6432Node\Bethesda Softworks\Fallout4"
        );
        assert_eq!(
            registry_key(GameType::Sse),
            r"HKLM\SOFTWARE\WOW6432Node\Bethesda Softworks\Skyrim Special Edition"
        );
    }

    #[test]
    fn parse_query_output() {
        let out = "\r\nHKEY_LOCAL_MACHINE\\SOFTWARE\\WOW6432Node\\Bethesda Softworks\\Skyrim\r\n    Installed Path    REG_SZ    D:\\Steam\\steamapps\\common\\Skyrim\\\r\n\r\n";
        assert_eq!(
            parse_reg_query(out),
            Some(PathBuf::from("D:\\Steam\\steamapps\\common\\Skyrim\\"))
        );
    }

    #[test]
    fn parse_query_output_without_value() {
        assert_eq!(parse_reg_query("ERROR: The system was unable to find"), None);
        assert_eq!(parse_reg_query("    Installed Path    REG_SZ    "), None);
    }

    #[test]
    fn no_locator_always_fails() {
        let err = NoLocator.installed_path(GameType::Tes5).unwrap_err();
        assert!(matches!(err, ConfigError::Locator { game: GameType::Tes5, .. }));
    }
}
