//! External archive tools run after a build.
//!
//! Packaging uses BSArch and zipping uses a 7-Zip compatible command line.
//! Only the exit status of either tool matters.

use crate::error::BuildError;
use pyro_common::GameType;
use pyro_config::{ResolvedArchive, ZipCompression};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// A fully built tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// Tool executable.
    pub program: PathBuf,
    /// Arguments.
    pub args: Vec<OsString>,
    /// File the tool is expected to produce.
    pub target: PathBuf,
}

/// Returns the archive extension the game loads.
pub fn archive_extension(game: GameType) -> &'static str {
    match game {
        GameType::Fo4 => "ba2",
        GameType::Sse | GameType::Tes5 => "bsa",
    }
}

fn game_switch(game: GameType) -> &'static str {
    match game {
        GameType::Fo4 => "-fo4",
        GameType::Sse => "-sse",
        GameType::Tes5 => "-tes5",
    }
}

/// Builds `bsarch pack <input> <archive> -<game>`.
pub fn pack_command(archive: &ResolvedArchive, input: &Path, game: GameType) -> ToolCommand {
    let target = archive
        .output
        .join(format!("{}.{}", archive.name, archive_extension(game)));
    ToolCommand {
        program: archive.archiver.clone(),
        args: vec![
            "pack".into(),
            input.as_os_str().to_owned(),
            target.as_os_str().to_owned(),
            game_switch(game).into(),
        ],
        target,
    }
}

/// Builds `7z a -tzip -mm=<method> <zip> <input>/*`.
pub fn zip_command(
    archive: &ResolvedArchive,
    input: &Path,
    compression: ZipCompression,
) -> ToolCommand {
    let target = archive.output.join(format!("{}.zip", archive.name));
    let method = match compression {
        ZipCompression::Store => "Copy",
        ZipCompression::Deflate => "Deflate",
    };
    ToolCommand {
        program: archive.archiver.clone(),
        args: vec![
            "a".into(),
            "-tzip".into(),
            format!("-mm={method}").into(),
            target.as_os_str().to_owned(),
            input.join("*").into_os_string(),
        ],
        target,
    }
}

/// Runs `command`, creating the target's directory first.
pub fn run_tool(tool: &'static str, command: &ToolCommand) -> Result<(), BuildError> {
    if let Some(parent) = command.target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| BuildError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    tracing::debug!(
        tool,
        program = %command.program.display(),
        "running {:?}",
        command.args
    );
    let output = Command::new(&command.program)
        .args(&command.args)
        .output()
        .map_err(|e| BuildError::Tool {
            tool,
            reason: format!("failed to start {}: {e}", command.program.display()),
        })?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        let reason = if stderr.is_empty() {
            output.status.to_string()
        } else {
            format!("{}: {stderr}", output.status)
        };
        Err(BuildError::Tool { tool, reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archive(archiver: &str) -> ResolvedArchive {
        ResolvedArchive {
            archiver: PathBuf::from(archiver),
            output: PathBuf::from("/dist"),
            name: "MyMod".to_string(),
        }
    }

    fn strings(cmd: &ToolCommand) -> Vec<String> {
        cmd.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn pack_for_fallout() {
        let cmd = pack_command(&archive("bsarch.exe"), Path::new("/out"), GameType::Fo4);
        assert_eq!(cmd.target, PathBuf::from("/dist/MyMod.ba2"));
        assert_eq!(strings(&cmd), vec!["pack", "/out", "/dist/MyMod.ba2", "-fo4"]);
    }

    #[test]
    fn pack_for_skyrim_se() {
        let cmd = pack_command(&archive("bsarch.exe"), Path::new("/out"), GameType::Sse);
        assert_eq!(cmd.target, PathBuf::from("/dist/MyMod.bsa"));
        assert_eq!(strings(&cmd).last().unwrap(), "-sse");
    }

    #[test]
    fn zip_store() {
        let cmd = zip_command(&archive("7z"), Path::new("/out"), ZipCompression::Store);
        assert_eq!(cmd.target, PathBuf::from("/dist/MyMod.zip"));
        assert_eq!(
            strings(&cmd),
            vec!["a", "-tzip", "-mm=Copy", "/dist/MyMod.zip", "/out/*"]
        );
    }

    #[test]
    fn missing_tool_is_tool_error() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = ToolCommand {
            program: dir.path().join("no-such-tool"),
            args: vec![],
            target: dir.path().join("dist/out.zip"),
        };
        let err = run_tool("zip", &cmd).unwrap_err();
        assert!(matches!(err, BuildError::Tool { tool: "zip", .. }));
        assert!(dir.path().join("dist").is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn exit_status_decides() {
        let dir = tempfile::tempdir().unwrap();
        let ok = ToolCommand {
            program: PathBuf::from("true"),
            args: vec![],
            target: dir.path().join("a.zip"),
        };
        assert!(run_tool("zip", &ok).is_ok());

        let bad = ToolCommand {
            program: PathBuf::from("false"),
            ..ok
        };
        assert!(matches!(
            run_tool("package", &bad).unwrap_err(),
            BuildError::Tool { tool: "package", .. }
        ));
    }
}
