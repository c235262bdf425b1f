//! Supported game titles and their per-title conventions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A game title whose Papyrus scripts Pyro can build.
///
/// Each title carries its own flags file name, install folder name and
/// output layout convention.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    /// Fallout 4.
    Fo4,
    /// Skyrim Special Edition.
    Sse,
    /// Skyrim (original release).
    #[serde(alias = "tesv")]
    Tes5,
}

impl GameType {
    /// All supported titles, in detection priority order.
    pub const ALL: [GameType; 3] = [GameType::Fo4, GameType::Sse, GameType::Tes5];

    /// Returns the title's display name, which is also its install folder name.
    pub fn display_name(&self) -> &'static str {
        match self {
            GameType::Fo4 => "Fallout 4",
            GameType::Sse => "Skyrim Special Edition",
            GameType::Tes5 => "Skyrim",
        }
    }

    /// Returns the compiler flags file shipped with the title.
    pub fn flags_file(&self) -> &'static str {
        match self {
            GameType::Fo4 => "Institute_Papyrus_Flags.flg",
            GameType::Sse | GameType::Tes5 => "TESV_Papyrus_Flags.flg",
        }
    }

    /// Returns the name used for the title under the Bethesda Softworks registry key.
    pub fn registry_name(&self) -> String {
        match self {
            GameType::Fo4 => self.display_name().replace(' ', ""),
            _ => self.display_name().to_string(),
        }
    }

    /// Returns `true` if compiled modules keep their namespace folders.
    ///
    /// Fallout 4 scripts live in namespaces that map to subfolders of the
    /// output directory. Skyrim titles write every module flat.
    pub fn preserves_namespaces(&self) -> bool {
        matches!(self, GameType::Fo4)
    }

    /// Detects a title from the components of a path.
    ///
    /// Matches folder names case-insensitively, accepting `Fallout4` as
    /// well as `Fallout 4`.
    pub fn from_path_components(path: &str) -> Option<GameType> {
        let parts: Vec<String> = path
            .split(['/', '\\'])
            .map(|p| p.to_lowercase())
            .collect();
        let has = |name: &str| parts.iter().any(|p| p == name);

        if has("fallout 4") || has("fallout4") {
            return Some(GameType::Fo4);
        }
        if has("skyrim special edition") {
            return Some(GameType::Sse);
        }
        if has("skyrim") {
            return Some(GameType::Tes5);
        }
        None
    }

    /// Detects a title from the final component of an install path.
    pub fn from_path_suffix(path: &str) -> Option<GameType> {
        let trimmed = path.trim_end_matches(['/', '\\']).to_lowercase();
        GameType::ALL
            .into_iter()
            .find(|g| trimmed.ends_with(&g.display_name().to_lowercase()))
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Error type for parsing game type names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseGameTypeError {
    /// The input string that failed to parse.
    pub input: String,
}

impl fmt::Display for ParseGameTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid game type: '{}' (expected fo4, sse, or tes5)",
            self.input
        )
    }
}

impl std::error::Error for ParseGameTypeError {}

impl FromStr for GameType {
    type Err = ParseGameTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fo4" => Ok(GameType::Fo4),
            "sse" => Ok(GameType::Sse),
            "tes5" | "tesv" => Ok(GameType::Tes5),
            _ => Err(ParseGameTypeError {
                input: s.to_string(),
            }),
        }
    }
}
