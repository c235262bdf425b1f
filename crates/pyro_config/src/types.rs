//! Project description types deserialized from `pyro.toml`.

use pyro_common::GameType;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// The top-level project description parsed from `pyro.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Core project settings (game, paths, pipeline toggles, sources).
    pub project: ProjectMeta,
    /// Folders scanned for scripts.
    #[serde(default)]
    pub folders: Vec<FolderSpec>,
    /// Build settings (incremental, parallelism, timeouts).
    #[serde(default)]
    pub build: BuildSettings,
    /// Archive packaging settings, required when `project.package` is set.
    #[serde(default)]
    pub package: Option<PackageSettings>,
    /// Zip settings, required when `project.zip` is set.
    #[serde(default)]
    pub zip: Option<ZipSettings>,
}

/// The `[project]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectMeta {
    /// The project name, used as the default archive name.
    pub name: String,
    /// The game the scripts target. Inferred from paths when absent.
    #[serde(default)]
    pub game: Option<GameType>,
    /// The game install directory.
    #[serde(default)]
    pub game_path: Option<String>,
    /// Path to the compiler executable.
    #[serde(default)]
    pub compiler: Option<String>,
    /// Compiler flags file, either a bare file name found on the import
    /// path or a path relative to the project.
    #[serde(default)]
    pub flags: Option<String>,
    /// Output directory for compiled modules.
    #[serde(default)]
    pub output: Option<String>,
    /// Directory remote sources are fetched into.
    #[serde(default)]
    pub temp: Option<String>,
    /// Pass `-op` to the compiler.
    #[serde(default)]
    pub optimize: bool,
    /// Pass `-r` to the compiler (Fallout 4 only).
    #[serde(default)]
    pub release: bool,
    /// Pass `-final` to the compiler (Fallout 4 only).
    #[serde(default, rename = "final")]
    pub final_: bool,
    /// Scrub author and machine names from compiled modules.
    #[serde(default)]
    pub anonymize: bool,
    /// Pack compiled modules into a game archive.
    #[serde(default)]
    pub package: bool,
    /// Zip the output directory.
    #[serde(default)]
    pub zip: bool,
    /// Import search paths, in priority order.
    #[serde(default)]
    pub imports: Vec<String>,
    /// Explicit script paths.
    #[serde(default)]
    pub scripts: Vec<String>,
}

/// One `[[folders]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct FolderSpec {
    /// Folder path, relative to the project or a remote URL.
    pub path: String,
    /// Only scan the folder itself, not its subfolders.
    #[serde(default)]
    pub no_recurse: bool,
}

/// The `[build]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSettings {
    /// Skip scripts whose module is newer than the source.
    #[serde(default = "default_true")]
    pub incremental: bool,
    /// Compile on more than one worker.
    #[serde(default = "default_true")]
    pub parallel: bool,
    /// Maximum number of workers. Zero picks the processor count.
    #[serde(default)]
    pub worker_limit: usize,
    /// Run post-processing steps even when some scripts failed.
    #[serde(default)]
    pub ignore_errors: bool,
    /// Per-invocation compiler timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Directory for per-run log files.
    #[serde(default)]
    pub log_path: Option<String>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            incremental: true,
            parallel: true,
            worker_limit: 0,
            ignore_errors: false,
            timeout_secs: default_timeout_secs(),
            log_path: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Default per-invocation compiler timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// The `[package]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageSettings {
    /// Path to the archive tool.
    pub archiver: String,
    /// Directory the archive is written to.
    pub output: String,
    /// Archive base name. Defaults to the project name.
    #[serde(default)]
    pub name: Option<String>,
}

/// The `[zip]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct ZipSettings {
    /// Path to the zip tool.
    pub archiver: String,
    /// Directory the zip file is written to.
    pub output: String,
    /// Zip base name. Defaults to the project name.
    #[serde(default)]
    pub name: Option<String>,
    /// Compression method.
    #[serde(default)]
    pub compression: ZipCompression,
}

/// Zip compression method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZipCompression {
    /// No compression.
    Store,
    /// Deflate compression (default).
    #[default]
    Deflate,
}

impl ZipCompression {
    /// Returns the lowercase name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            ZipCompression::Store => "store",
            ZipCompression::Deflate => "deflate",
        }
    }
}

impl fmt::Display for ZipCompression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ZipCompression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "store" => Ok(ZipCompression::Store),
            "deflate" => Ok(ZipCompression::Deflate),
            other => Err(format!(
                "invalid compression '{other}' (expected store or deflate)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_settings_defaults() {
        let b = BuildSettings::default();
        assert!(b.incremental);
        assert!(b.parallel);
        assert_eq!(b.worker_limit, 0);
        assert!(!b.ignore_errors);
        assert_eq!(b.timeout_secs, 30);
    }

    #[test]
    fn empty_build_table_uses_defaults() {
        let b: BuildSettings = toml::from_str("").unwrap();
        assert!(b.incremental);
        assert_eq!(b.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn final_is_a_keyword_rename() {
        let meta: ProjectMeta = toml::from_str(
            r#"
name = "m"
final = true
"#,
        )
        .unwrap();
        assert!(meta.final_);
        assert!(!meta.release);
    }

    #[test]
    fn zip_compression_parse() {
        assert_eq!("store".parse::<ZipCompression>(), Ok(ZipCompression::Store));
        assert_eq!(
            "DEFLATE".parse::<ZipCompression>(),
            Ok(ZipCompression::Deflate)
        );
        assert!("lzma".parse::<ZipCompression>().is_err());
        assert_eq!(ZipCompression::default(), ZipCompression::Deflate);
    }

    #[test]
    fn folder_recurses_by_default() {
        let f: FolderSpec = toml::from_str(r#"path = "scripts""#).unwrap();
        assert!(!f.no_recurse);
    }
}
