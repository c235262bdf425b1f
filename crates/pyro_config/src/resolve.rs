//! Project resolution: turning a parsed description into absolute paths and
//! concrete build settings.

use crate::error::ConfigError;
use crate::locate::InstallLocator;
use crate::remote::RemoteProvider;
use crate::types::{ProjectConfig, ZipCompression};
use pyro_common::GameType;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Command-line values that take precedence over the project file.
///
/// Paths are used as given; callers make them absolute first.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    /// Run post-processing steps even when some scripts failed.
    pub ignore_errors: bool,
    /// Compile every script regardless of timestamps.
    pub no_incremental: bool,
    /// Compile on a single worker.
    pub no_parallel: bool,
    /// Explicit worker count.
    pub worker_limit: Option<usize>,
    /// Compiler executable.
    pub compiler_path: Option<PathBuf>,
    /// Compiler flags file.
    pub flags_path: Option<PathBuf>,
    /// Output directory for compiled modules.
    pub output_path: Option<PathBuf>,
    /// Game type.
    pub game_type: Option<GameType>,
    /// Game install directory.
    pub game_path: Option<PathBuf>,
    /// Directory for per-run log files.
    pub log_path: Option<PathBuf>,
    /// Directory remote sources are fetched into.
    pub temp_path: Option<PathBuf>,
    /// Per-invocation compiler timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Archive tool.
    pub archiver_path: Option<PathBuf>,
    /// Archive output directory.
    pub package_path: Option<PathBuf>,
    /// Zip output directory.
    pub zip_output_path: Option<PathBuf>,
    /// Zip compression method.
    pub zip_compression: Option<ZipCompression>,
}

/// A folder to scan for scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFolder {
    /// Absolute folder path.
    pub path: PathBuf,
    /// Scan subfolders too.
    pub recursive: bool,
}

/// Resolved settings for an external archiving step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArchive {
    /// Tool executable.
    pub archiver: PathBuf,
    /// Directory the archive is written to.
    pub output: PathBuf,
    /// Archive base name.
    pub name: String,
}

/// A project with every path absolute and every setting decided.
#[derive(Debug, Clone)]
pub struct ResolvedProject {
    /// Project name.
    pub name: String,
    /// Directory containing the project file.
    pub root: PathBuf,
    /// Target game.
    pub game: GameType,
    /// Game install directory, when known.
    pub game_path: Option<PathBuf>,
    /// Compiler executable.
    pub compiler: PathBuf,
    /// Flags file. A bare file name is looked up on the import path by the compiler.
    pub flags: PathBuf,
    /// Output directory for compiled modules.
    pub output: PathBuf,
    /// Import roots, in priority order.
    pub imports: Vec<PathBuf>,
    /// Explicit scripts, in listed order.
    pub scripts: Vec<PathBuf>,
    /// Folders to scan, in listed order.
    pub folders: Vec<ResolvedFolder>,
    /// Pass `-op` to the compiler.
    pub optimize: bool,
    /// Pass `-r` to the compiler.
    pub release: bool,
    /// Pass `-final` to the compiler.
    pub final_: bool,
    /// Run the anonymize step.
    pub anonymize: bool,
    /// Run the package step.
    pub package: Option<ResolvedArchive>,
    /// Run the zip step.
    pub zip: Option<ResolvedArchive>,
    /// Zip compression method.
    pub zip_compression: ZipCompression,
    /// Filter out up-to-date scripts.
    pub incremental: bool,
    /// Run post-processing steps despite failures.
    pub ignore_errors: bool,
    /// Number of concurrent compiler invocations.
    pub worker_limit: usize,
    /// Per-invocation compiler timeout.
    pub timeout: Duration,
    /// Directory for per-run log files.
    pub log_dir: Option<PathBuf>,
}

/// Resolves a project against its root directory.
///
/// Overrides win over the project file. The locator is only consulted when
/// the game path is needed and not given.
pub fn resolve_project(
    config: &ProjectConfig,
    root: &Path,
    overrides: &Overrides,
    locator: &dyn InstallLocator,
) -> Result<ResolvedProject, ConfigError> {
    let p = &config.project;
    let at_root = |s: &str| absolutize(root, Path::new(s));

    let temp = overrides
        .temp_path
        .clone()
        .or_else(|| p.temp.as_deref().map(at_root))
        .unwrap_or_else(|| root.join(".pyro").join("remote"));

    let source_path = |s: &str| -> Result<PathBuf, ConfigError> {
        if RemoteProvider::is_remote(s) {
            let remote = RemoteProvider::parse(s)?;
            Ok(temp.join(remote.local_path()))
        } else {
            Ok(at_root(s))
        }
    };

    let imports = p
        .imports
        .iter()
        .map(|s| source_path(s))
        .collect::<Result<Vec<_>, _>>()?;

    let folders = config
        .folders
        .iter()
        .map(|f| {
            Ok(ResolvedFolder {
                path: source_path(&f.path)?,
                recursive: !f.no_recurse,
            })
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    let scripts = p
        .scripts
        .iter()
        .map(|s| find_script(root, &imports, s))
        .collect();

    let explicit_flags = overrides
        .flags_path
        .clone()
        .or_else(|| p.flags.as_deref().map(|f| resolve_flags(root, f)));

    let explicit_game_path = overrides
        .game_path
        .clone()
        .or_else(|| p.game_path.as_deref().map(at_root));

    let game = overrides
        .game_type
        .or(p.game)
        .or_else(|| detect_game(explicit_game_path.as_deref(), &imports, explicit_flags.as_deref()))
        .ok_or_else(|| {
            ConfigError::ValidationError(
                "cannot determine game type; set project.game".to_string(),
            )
        })?;

    let explicit_compiler = overrides
        .compiler_path
        .clone()
        .or_else(|| p.compiler.as_deref().map(at_root));

    let game_path = match (explicit_game_path, &explicit_compiler) {
        (Some(path), _) => Some(path),
        (None, Some(_)) => None,
        (None, None) => Some(locator.installed_path(game)?),
    };

    let compiler = match (explicit_compiler, &game_path) {
        (Some(c), _) => c,
        (None, Some(gp)) => gp.join("Papyrus Compiler").join("PapyrusCompiler.exe"),
        (None, None) => {
            return Err(ConfigError::GamePath(
                "no compiler path and no game path".to_string(),
            ))
        }
    };

    let flags = explicit_flags.unwrap_or_else(|| PathBuf::from(game.flags_file()));

    let output = overrides
        .output_path
        .clone()
        .or_else(|| p.output.as_deref().map(at_root))
        .unwrap_or_else(|| root.join("out"));

    let package = match (&config.package, p.package) {
        (Some(pkg), true) => Some(ResolvedArchive {
            archiver: overrides
                .archiver_path
                .clone()
                .unwrap_or_else(|| at_root(&pkg.archiver)),
            output: overrides
                .package_path
                .clone()
                .unwrap_or_else(|| at_root(&pkg.output)),
            name: pkg.name.clone().unwrap_or_else(|| p.name.clone()),
        }),
        _ => None,
    };

    let zip = match (&config.zip, p.zip) {
        (Some(z), true) => Some(ResolvedArchive {
            archiver: tool_path(root, &z.archiver),
            output: overrides
                .zip_output_path
                .clone()
                .unwrap_or_else(|| at_root(&z.output)),
            name: z.name.clone().unwrap_or_else(|| p.name.clone()),
        }),
        _ => None,
    };

    let zip_compression = overrides
        .zip_compression
        .or_else(|| config.zip.as_ref().map(|z| z.compression))
        .unwrap_or_default();

    let parallel = config.build.parallel && !overrides.no_parallel;
    let worker_limit = resolve_worker_limit(
        overrides.worker_limit.unwrap_or(config.build.worker_limit),
        parallel,
    );

    let log_dir = overrides
        .log_path
        .clone()
        .or_else(|| config.build.log_path.as_deref().map(at_root));

    let resolved = ResolvedProject {
        name: p.name.clone(),
        root: root.to_path_buf(),
        game,
        game_path,
        compiler,
        flags,
        output,
        imports,
        scripts,
        folders,
        optimize: p.optimize,
        release: p.release,
        final_: p.final_,
        anonymize: p.anonymize,
        package,
        zip,
        zip_compression,
        incremental: config.build.incremental && !overrides.no_incremental,
        ignore_errors: config.build.ignore_errors || overrides.ignore_errors,
        worker_limit,
        timeout: Duration::from_secs(overrides.timeout_secs.unwrap_or(config.build.timeout_secs)),
        log_dir,
    };

    tracing::debug!(
        game = %resolved.game,
        workers = resolved.worker_limit,
        compiler = %resolved.compiler.display(),
        "resolved project '{}'",
        resolved.name
    );

    Ok(resolved)
}

/// Decides how many compiler invocations may run at once.
///
/// An explicit positive value wins. Zero means one worker per processor,
/// falling back to 2 when the processor count is unavailable. A
/// non-parallel build always uses one worker.
pub fn resolve_worker_limit(explicit: usize, parallel: bool) -> usize {
    if !parallel {
        return 1;
    }
    if explicit > 0 {
        return explicit;
    }
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
}

/// Detects the game from an install path, the import roots, or the flags file.
pub fn detect_game(
    game_path: Option<&Path>,
    imports: &[PathBuf],
    flags: Option<&Path>,
) -> Option<GameType> {
    if let Some(g) = game_path.and_then(|p| GameType::from_path_suffix(&p.to_string_lossy())) {
        return Some(g);
    }
    if let Some(g) = imports
        .iter()
        .find_map(|i| GameType::from_path_components(&i.to_string_lossy()))
    {
        return Some(g);
    }
    let flags_name = flags?.file_name()?.to_string_lossy().to_lowercase();
    GameType::ALL
        .into_iter()
        .find(|g| g.flags_file().to_lowercase() == flags_name)
        .map(|g| match g {
            // The Skyrim flags file is shared; prefer the original release.
            GameType::Sse => GameType::Tes5,
            other => other,
        })
}

/// Keeps a bare known flags file name as-is for the compiler to find on
/// its import path; anything else is resolved against `base`.
pub fn resolve_flags(base: &Path, flags: &str) -> PathBuf {
    let is_known = GameType::ALL
        .iter()
        .any(|g| g.flags_file().eq_ignore_ascii_case(flags));
    if is_known {
        PathBuf::from(flags)
    } else {
        absolutize(base, Path::new(flags))
    }
}

/// Resolves an explicit script: absolute paths as-is, relative paths
/// searched in each import root, then the project root.
fn find_script(root: &Path, imports: &[PathBuf], script: &str) -> PathBuf {
    let rel = Path::new(script);
    if rel.is_absolute() {
        return normalize(rel);
    }
    imports
        .iter()
        .map(|i| normalize(&i.join(rel)))
        .find(|candidate| candidate.is_file())
        .unwrap_or_else(|| absolutize(root, rel))
}

/// Tools given as a bare name are found on `PATH`; anything with a
/// separator is resolved against the project root.
fn tool_path(root: &Path, tool: &str) -> PathBuf {
    let p = Path::new(tool);
    if p.components().count() == 1 && !p.is_absolute() {
        p.to_path_buf()
    } else {
        absolutize(root, p)
    }
}

/// Joins a relative path onto `base` and normalizes the result.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Removes `.` and folds `..` components without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_project_from_str;
    use crate::locate::NoLocator;
    use pretty_assertions::assert_eq;

    struct FixedLocator(PathBuf);

    impl InstallLocator for FixedLocator {
        fn installed_path(&self, _game: GameType) -> Result<PathBuf, ConfigError> {
            Ok(self.0.clone())
        }
    }

    fn project(extra: &str) -> ProjectConfig {
        let toml = format!(
            r#"
[project]
name = "MyMod"
game = "sse"
compiler = "tools/PapyrusCompiler.exe"
imports = ["Scripts/Source", "../Base"]
scripts = ["Quest.psc"]
{extra}
"#
        );
        load_project_from_str(&toml).unwrap()
    }

    fn resolve(config: &ProjectConfig, root: &Path) -> ResolvedProject {
        resolve_project(config, root, &Overrides::default(), &NoLocator).unwrap()
    }

    // -- paths --

    #[test]
    fn relative_paths_resolve_against_root() {
        let root = Path::new("/mods/MyMod");
        let r = resolve(&project(""), root);
        assert_eq!(
            r.imports,
            vec![
                PathBuf::from("/mods/MyMod/Scripts/Source"),
                PathBuf::from("/mods/Base")
            ]
        );
        assert_eq!(r.compiler, PathBuf::from("/mods/MyMod/tools/PapyrusCompiler.exe"));
        assert_eq!(r.output, PathBuf::from("/mods/MyMod/out"));
    }

    #[test]
    fn scripts_are_found_on_import_path() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("Base");
        std::fs::create_dir_all(&base).unwrap();
        std::fs::write(base.join("Quest.psc"), "ScriptName Quest").unwrap();
        let root = dir.path().join("MyMod");

        let r = resolve(&project(""), &root);
        assert_eq!(r.scripts, vec![normalize(&base.join("Quest.psc"))]);
    }

    #[test]
    fn missing_script_falls_back_to_root() {
        let r = resolve(&project(""), Path::new("/mods/MyMod"));
        assert_eq!(r.scripts, vec![PathBuf::from("/mods/MyMod/Quest.psc")]);
    }

    #[test]
    fn folders_keep_order_and_recursion() {
        let r = resolve(
            &project(
                r#"
[[folders]]
path = "Scripts/Source/B"
no_recurse = true

[[folders]]
path = "Scripts/Source/A"
"#,
            ),
            Path::new("/m"),
        );
        assert_eq!(
            r.folders,
            vec![
                ResolvedFolder {
                    path: PathBuf::from("/m/Scripts/Source/B"),
                    recursive: false
                },
                ResolvedFolder {
                    path: PathBuf::from("/m/Scripts/Source/A"),
                    recursive: true
                },
            ]
        );
    }

    #[test]
    fn remote_folder_maps_into_temp() {
        let r = resolve(
            &project(
                r#"
[[folders]]
path = "https://github.com/owner/repo/tree/main/Scripts/Source"
"#,
            ),
            Path::new("/m"),
        );
        assert_eq!(
            r.folders[0].path,
            PathBuf::from("/m/.pyro/remote/owner/repo/Scripts/Source")
        );
    }

    #[test]
    fn unsupported_remote_import_errors() {
        let mut config = project("");
        config.project.imports.push("https://example.com/a/b".to_string());
        let err = resolve_project(&config, Path::new("/m"), &Overrides::default(), &NoLocator)
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedRemote(_)));
    }

    #[test]
    fn normalize_folds_dots() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(normalize(Path::new("/..")), PathBuf::from("/"));
    }

    // -- game, flags, compiler --

    #[test]
    fn flags_default_by_game() {
        let r = resolve(&project(""), Path::new("/m"));
        assert_eq!(r.flags, PathBuf::from("TESV_Papyrus_Flags.flg"));
    }

    #[test]
    fn bare_flags_name_kept() {
        let r = resolve(
            &{
                let mut c = project("");
                c.project.flags = Some("Institute_Papyrus_Flags.flg".to_string());
                c
            },
            Path::new("/m"),
        );
        assert_eq!(r.flags, PathBuf::from("Institute_Papyrus_Flags.flg"));
    }

    #[test]
    fn custom_flags_resolved_against_root() {
        let mut c = project("");
        c.project.flags = Some("flags/Custom.flg".to_string());
        let r = resolve(&c, Path::new("/m"));
        assert_eq!(r.flags, PathBuf::from("/m/flags/Custom.flg"));
    }

    #[test]
    fn game_detected_from_imports() {
        let mut c = project("");
        c.project.game = None;
        c.project.imports = vec!["C:/Games/Fallout 4/Data/Scripts/Source/Base".to_string()];
        let r = resolve(&c, Path::new("/m"));
        assert_eq!(r.game, GameType::Fo4);
        assert_eq!(r.flags, PathBuf::from("Institute_Papyrus_Flags.flg"));
    }

    #[test]
    fn game_detected_from_game_path() {
        assert_eq!(
            detect_game(Some(Path::new("/games/Skyrim Special Edition")), &[], None),
            Some(GameType::Sse)
        );
    }

    #[test]
    fn game_detected_from_flags() {
        assert_eq!(
            detect_game(None, &[], Some(Path::new("Institute_Papyrus_Flags.flg"))),
            Some(GameType::Fo4)
        );
        assert_eq!(
            detect_game(None, &[], Some(Path::new("/x/TESV_Papyrus_Flags.flg"))),
            Some(GameType::Tes5)
        );
    }

    #[test]
    fn undetectable_game_errors() {
        let mut c = project("");
        c.project.game = None;
        let err =
            resolve_project(&c, Path::new("/m"), &Overrides::default(), &NoLocator).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn compiler_derived_from_located_game_path() {
        let mut c = project("");
        c.project.compiler = None;
        let locator = FixedLocator(PathBuf::from("/games/Skyrim"));
        let r = resolve_project(&c, Path::new("/m"), &Overrides::default(), &locator).unwrap();
        assert_eq!(r.game_path, Some(PathBuf::from("/games/Skyrim")));
        assert_eq!(
            r.compiler,
            PathBuf::from("/games/Skyrim/Papyrus Compiler/PapyrusCompiler.exe")
        );
    }

    #[test]
    fn locator_failure_propagates_when_needed() {
        let mut c = project("");
        c.project.compiler = None;
        let err =
            resolve_project(&c, Path::new("/m"), &Overrides::default(), &NoLocator).unwrap_err();
        assert!(matches!(err, ConfigError::Locator { .. }));
    }

    // -- build settings --

    #[test]
    fn worker_limit_rules() {
        assert_eq!(resolve_worker_limit(4, true), 4);
        assert_eq!(resolve_worker_limit(4, false), 1);
        assert!(resolve_worker_limit(0, true) >= 1);
    }

    #[test]
    fn overrides_win() {
        let c = project(
            r#"
[build]
worker_limit = 8
timeout_secs = 10
"#,
        );
        let overrides = Overrides {
            ignore_errors: true,
            no_incremental: true,
            worker_limit: Some(3),
            output_path: Some(PathBuf::from("/elsewhere")),
            game_type: Some(GameType::Fo4),
            timeout_secs: Some(5),
            ..Overrides::default()
        };
        let r = resolve_project(&c, Path::new("/m"), &overrides, &NoLocator).unwrap();
        assert!(r.ignore_errors);
        assert!(!r.incremental);
        assert_eq!(r.worker_limit, 3);
        assert_eq!(r.output, PathBuf::from("/elsewhere"));
        assert_eq!(r.game, GameType::Fo4);
        assert_eq!(r.timeout, Duration::from_secs(5));
    }

    #[test]
    fn no_parallel_forces_one_worker() {
        let overrides = Overrides {
            no_parallel: true,
            worker_limit: Some(6),
            ..Overrides::default()
        };
        let r = resolve_project(&project(""), Path::new("/m"), &overrides, &NoLocator).unwrap();
        assert_eq!(r.worker_limit, 1);
    }

    #[test]
    fn package_and_zip_resolve_only_when_enabled() {
        let extra = r#"
[package]
archiver = "tools/bsarch.exe"
output = "dist"

[zip]
archiver = "7z"
output = "dist"
compression = "store"
"#;
        let r = resolve(&project(extra), Path::new("/m"));
        assert!(r.package.is_none());
        assert!(r.zip.is_none());

        let mut c = project(extra);
        c.project.package = true;
        c.project.zip = true;
        let r = resolve(&c, Path::new("/m"));
        let pkg = r.package.unwrap();
        assert_eq!(pkg.archiver, PathBuf::from("/m/tools/bsarch.exe"));
        assert_eq!(pkg.name, "MyMod");
        let zip = r.zip.unwrap();
        assert_eq!(zip.archiver, PathBuf::from("7z"));
        assert_eq!(zip.output, PathBuf::from("/m/dist"));
        assert_eq!(r.zip_compression, ZipCompression::Store);
    }
}
