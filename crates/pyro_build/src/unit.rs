//! Source units: one script and where its module goes.

use crate::error::BuildError;
use pyro_common::GameType;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// One script source and its compiled module location.
///
/// Created once per run during discovery and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// Absolute path of the script.
    pub path: PathBuf,
    /// Path relative to the import root the script lives under, using `/`.
    pub namespace_id: String,
    /// Modification time of the script.
    pub source_mtime: SystemTime,
    /// Where the compiled module is written.
    pub output: PathBuf,
    /// Modification time of the module, if it has been built before.
    pub output_mtime: Option<SystemTime>,
}

impl SourceUnit {
    /// Builds a unit for the script at `path`, reading both timestamps.
    pub fn from_disk(
        path: &Path,
        imports: &[PathBuf],
        output_dir: &Path,
        game: GameType,
    ) -> Result<Self, BuildError> {
        let meta = std::fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => BuildError::MissingPath {
                kind: "script",
                path: path.to_path_buf(),
            },
            _ => BuildError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;
        let source_mtime = meta.modified().map_err(|e| BuildError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let namespace_id = namespace_id(path, imports);
        let output = output_path(&namespace_id, output_dir, game);
        let output_mtime = std::fs::metadata(&output)
            .and_then(|m| m.modified())
            .ok();

        Ok(Self {
            path: path.to_path_buf(),
            namespace_id,
            source_mtime,
            output,
            output_mtime,
        })
    }

    /// Returns `true` if the module is missing or older than the script.
    pub fn is_stale(&self) -> bool {
        match self.output_mtime {
            None => true,
            Some(out) => self.source_mtime > out,
        }
    }
}

/// Strips the longest import root that contains `path`.
///
/// Falls back to the file name when no import root matches.
pub fn namespace_id(path: &Path, imports: &[PathBuf]) -> String {
    let relative = imports
        .iter()
        .filter_map(|root| path.strip_prefix(root).ok().map(|rel| (root, rel)))
        .max_by_key(|(root, _)| root.components().count())
        .map(|(_, rel)| rel.to_path_buf())
        .or_else(|| path.file_name().map(PathBuf::from))
        .unwrap_or_else(|| path.to_path_buf());

    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Maps a namespace identifier to its module path.
///
/// Fallout 4 keeps namespace folders under the output directory. Skyrim
/// titles write every module directly into it.
pub fn output_path(namespace_id: &str, output_dir: &Path, game: GameType) -> PathBuf {
    let relative = Path::new(namespace_id).with_extension("pex");
    if game.preserves_namespaces() {
        output_dir.join(relative)
    } else {
        match relative.file_name() {
            Some(name) => output_dir.join(name),
            None => output_dir.join(relative),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn namespace_uses_longest_import_root() {
        let imports = vec![
            PathBuf::from("/src"),
            PathBuf::from("/src/User"),
            PathBuf::from("/other"),
        ];
        assert_eq!(
            namespace_id(Path::new("/src/User/MyMod/Quest.psc"), &imports),
            "MyMod/Quest.psc"
        );
        assert_eq!(
            namespace_id(Path::new("/src/Base.psc"), &imports),
            "Base.psc"
        );
    }

    #[test]
    fn namespace_falls_back_to_file_name() {
        assert_eq!(
            namespace_id(Path::new("/elsewhere/deep/Quest.psc"), &[PathBuf::from("/src")]),
            "Quest.psc"
        );
    }

    #[test]
    fn fallout_keeps_namespace_folders() {
        assert_eq!(
            output_path("MyMod/Quest.psc", Path::new("/out"), GameType::Fo4),
            PathBuf::from("/out/MyMod/Quest.pex")
        );
    }

    #[test]
    fn skyrim_output_is_flat() {
        assert_eq!(
            output_path("MyMod/Quest.psc", Path::new("/out"), GameType::Sse),
            PathBuf::from("/out/Quest.pex")
        );
    }

    #[test]
    fn staleness() {
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let mut unit = SourceUnit {
            path: PathBuf::from("/src/A.psc"),
            namespace_id: "A.psc".to_string(),
            source_mtime: t,
            output: PathBuf::from("/out/A.pex"),
            output_mtime: None,
        };
        assert!(unit.is_stale());
        unit.output_mtime = Some(t);
        assert!(!unit.is_stale());
        unit.output_mtime = Some(t + Duration::from_secs(1));
        assert!(!unit.is_stale());
        unit.output_mtime = Some(t - Duration::from_secs(1));
        assert!(unit.is_stale());
    }

    #[test]
    fn from_disk_reads_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let out = dir.path().join("out");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(src.join("A.psc"), "ScriptName A").unwrap();

        let unit =
            SourceUnit::from_disk(&src.join("A.psc"), &[src.clone()], &out, GameType::Tes5)
                .unwrap();
        assert_eq!(unit.namespace_id, "A.psc");
        assert_eq!(unit.output, out.join("A.pex"));
        assert!(unit.output_mtime.is_none());

        std::fs::write(out.join("A.pex"), b"module").unwrap();
        let unit =
            SourceUnit::from_disk(&src.join("A.psc"), &[src], &out, GameType::Tes5).unwrap();
        assert!(unit.output_mtime.is_some());
    }

    #[test]
    fn from_disk_missing_script() {
        let dir = tempfile::tempdir().unwrap();
        let err = SourceUnit::from_disk(
            &dir.path().join("Missing.psc"),
            &[],
            dir.path(),
            GameType::Sse,
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::MissingPath { kind: "script", .. }));
    }
}
