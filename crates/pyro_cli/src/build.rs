//! `pyro build`: compile a project and run its post-processing steps.
//!
//! The pipeline:
//!
//! 1. Load `pyro.toml` and resolve it with command-line overrides
//! 2. Discover scripts and drop the ones that are up to date
//! 3. Compile the rest on the worker pool
//! 4. Anonymize, package and zip, each only if enabled and nothing failed
//!    (or `--ignore-errors` is set)
//! 5. Report timing

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pyro_build::{BuildFacade, BuildLog, CancelToken, ProcessCompiler};
use pyro_common::TimeElapsed;
use pyro_config::resolve::{absolutize, resolve_flags};
use pyro_config::{default_locator, load_project, resolve_project, Overrides, ResolvedProject};

use crate::{signal, BuildArgs, GlobalArgs};

/// Exit code for a run interrupted with Ctrl-C.
const INTERRUPTED: i32 = 130;

/// Whether a post-processing step runs after compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// The step runs.
    Run,
    /// The project does not enable the step.
    Disabled,
    /// The step is enabled but this many scripts failed.
    Blocked(usize),
}

/// Decides whether an enabled step may run given the failure count.
pub fn gate(enabled: bool, failed: usize, ignore_errors: bool) -> Gate {
    if !enabled {
        Gate::Disabled
    } else if failed == 0 || ignore_errors {
        Gate::Run
    } else {
        Gate::Blocked(failed)
    }
}

/// A post-processing step, named for messages.
struct Step {
    action: &'static str,
    toggle: &'static str,
}

const ANONYMIZE: Step = Step {
    action: "anonymize scripts",
    toggle: "anonymize",
};
const PACKAGE: Step = Step {
    action: "create packages",
    toggle: "package",
};
const ZIP: Step = Step {
    action: "create zip file",
    toggle: "zip",
};

fn skip_message(step: &Step, gate: Gate) -> Option<String> {
    match gate {
        Gate::Run => None,
        Gate::Disabled => Some(format!(
            "cannot {} because {} is disabled in project",
            step.action, step.toggle
        )),
        Gate::Blocked(failed) => Some(format!(
            "cannot {} because {failed} scripts failed to compile",
            step.action
        )),
    }
}

/// Formats the closing timing line.
pub fn summary(timing: &TimeElapsed, succeeded: usize, failed: usize, discovered: usize) -> String {
    if succeeded == 0 {
        return "No scripts were compiled.".to_string();
    }
    let average = timing.average(u32::try_from(succeeded).unwrap_or(u32::MAX));
    format!(
        "Compilation time: {:.3}s ({:.3}s/script) - {succeeded} succeeded, {failed} failed ({discovered} scripts)",
        timing.total().as_secs_f64(),
        average.as_secs_f64()
    )
}

/// Turns the command-line flags into resolution overrides.
///
/// Relative paths are taken relative to `cwd`.
pub fn overrides(args: &BuildArgs, cwd: &Path) -> Overrides {
    let abs = |p: &Option<PathBuf>| p.as_deref().map(|p| absolutize(cwd, p));
    Overrides {
        ignore_errors: args.ignore_errors,
        no_incremental: args.no_incremental_build,
        no_parallel: args.no_parallel,
        worker_limit: args.worker_limit,
        compiler_path: abs(&args.compiler_path),
        flags_path: args
            .flags_path
            .as_deref()
            .map(|f| resolve_flags(cwd, &f.to_string_lossy())),
        output_path: abs(&args.output_path),
        game_type: args.game_type,
        game_path: abs(&args.game_path),
        log_path: abs(&args.log_path),
        temp_path: abs(&args.temp_path),
        timeout_secs: args.timeout,
        archiver_path: abs(&args.bsarch_path),
        package_path: abs(&args.package_path),
        zip_output_path: abs(&args.zip_output_path),
        zip_compression: args.zip_compression,
    }
}

/// Loads and resolves the project named on the command line.
pub fn resolve(args: &BuildArgs, cwd: &Path) -> Result<ResolvedProject, Box<dyn std::error::Error>> {
    let project_path = absolutize(cwd, &args.project);
    let config = load_project(&project_path)?;
    let root = if project_path.is_dir() {
        project_path
    } else {
        project_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.to_path_buf())
    };
    let locator = default_locator();
    Ok(resolve_project(
        &config,
        &root,
        &overrides(args, cwd),
        locator.as_ref(),
    )?)
}

/// Runs the `pyro build` command.
///
/// Returns exit code 0 on success, 1 if scripts failed (unless errors are
/// ignored) or a post-processing step failed, and 130 when interrupted.
pub fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let project = resolve(args, &cwd)?;

    if let Some(package) = &project.package {
        if !package.archiver.is_file() {
            return Err(format!(
                "package is enabled but the archiver was not found at {}",
                package.archiver.display()
            )
            .into());
        }
    }

    if !global.quiet {
        eprintln!("   Building {} ({})", project.name, project.game);
        for import in &project.imports {
            eprintln!("     Import {}", import.display());
        }
    }

    let log = Arc::new(match &project.log_dir {
        Some(dir) => BuildLog::with_file(dir)?,
        None => BuildLog::new(),
    });
    if let Some(path) = log.path() {
        tracing::info!("writing build log to {}", path.display());
    }

    let cancel = CancelToken::new();
    signal::cancel_on_ctrl_c(cancel.clone());

    let compiler = ProcessCompiler::from_project(&project);
    let mut build = BuildFacade::new(project, Box::new(compiler), Arc::clone(&log), cancel.clone());

    let plan = build.prepare()?;
    let discovered = plan.discovered().len();
    if !global.quiet {
        for unit in plan.discovered() {
            eprintln!("     Script {}", unit.path.display());
        }
        eprintln!(
            "  Compiling {} of {discovered} scripts",
            plan.executable_len()
        );
    }

    let mut timing = TimeElapsed::new();
    let (succeeded, failed) = build.try_compile(&mut timing)?;

    if !global.quiet {
        if let Some(report) = build.report() {
            for failure in report.failures() {
                eprintln!("error: failed to compile {}", failure.unit.namespace_id);
                for line in failure.diagnostics.lines() {
                    eprintln!("  {line}");
                }
            }
        }
    }

    if cancel.is_cancelled() {
        eprintln!("warning: build interrupted");
        return Ok(INTERRUPTED);
    }

    let ignore_errors = build.project().ignore_errors;
    let mut post_failed = false;

    let anonymize = gate(build.project().anonymize, failed, ignore_errors);
    if anonymize == Gate::Run {
        let report = build.try_anonymize();
        if !global.quiet {
            eprintln!(
                " Anonymized {} modules ({} already clean)",
                report.anonymized, report.unchanged
            );
        }
        for (path, e) in &report.failures {
            eprintln!("error: cannot anonymize {}: {e}", path.display());
        }
        post_failed |= !report.failures.is_empty();
    } else {
        warn_skipped(&ANONYMIZE, anonymize, global);
    }

    let package = gate(build.project().package.is_some(), failed, ignore_errors);
    if package == Gate::Run {
        match build.try_pack() {
            Ok(target) if !global.quiet => eprintln!("   Packaged {}", target.display()),
            Ok(_) => {}
            Err(e) => {
                eprintln!("error: {e}");
                post_failed = true;
            }
        }
    } else {
        warn_skipped(&PACKAGE, package, global);
    }

    let zip = gate(build.project().zip.is_some(), failed, ignore_errors);
    if zip == Gate::Run {
        match build.try_zip() {
            Ok(target) if !global.quiet => eprintln!("     Zipped {}", target.display()),
            Ok(_) => {}
            Err(e) => {
                eprintln!("error: {e}");
                post_failed = true;
            }
        }
    } else {
        warn_skipped(&ZIP, zip, global);
    }

    let line = summary(&timing, succeeded, failed, discovered);
    log.note(&line);
    if !global.quiet {
        eprintln!("{line}");
    }

    if post_failed || (failed > 0 && !ignore_errors) {
        Ok(1)
    } else {
        Ok(0)
    }
}

fn warn_skipped(step: &Step, gate: Gate, global: &GlobalArgs) {
    let Some(message) = skip_message(step, gate) else {
        return;
    };
    match gate {
        Gate::Blocked(_) if !global.quiet => eprintln!("warning: {message}"),
        _ => tracing::debug!("{message}"),
    }
}
