//! One build run: plan, compile, then the post-processing steps.

use crate::cancel::CancelToken;
use crate::compiler::Compiler;
use crate::dispatch;
use crate::error::BuildError;
use crate::log::BuildLog;
use crate::outcome::{CompileStatus, DispatchReport};
use crate::plan::{discover, plan, BuildPlan};
use crate::pool::map_bounded;
use crate::tools::{pack_command, run_tool, zip_command};
use pyro_common::TimeElapsed;
use pyro_config::ResolvedProject;
use pyro_pex::{AnonymizeOutcome, PexError};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

/// Totals from anonymizing the produced modules.
#[derive(Debug, Default)]
pub struct AnonymizeReport {
    /// Modules that were rewritten.
    pub anonymized: usize,
    /// Modules that were already scrubbed.
    pub unchanged: usize,
    /// Modules that could not be processed. Other modules are unaffected.
    pub failures: Vec<(PathBuf, PexError)>,
}

/// Drives a build run for a resolved project.
pub struct BuildFacade {
    project: ResolvedProject,
    compiler: Box<dyn Compiler>,
    log: Arc<BuildLog>,
    cancel: CancelToken,
    plan: Option<BuildPlan>,
    report: Option<DispatchReport>,
}

impl BuildFacade {
    /// Creates a facade. Nothing runs until [`try_compile`](Self::try_compile).
    pub fn new(
        project: ResolvedProject,
        compiler: Box<dyn Compiler>,
        log: Arc<BuildLog>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            project,
            compiler,
            log,
            cancel,
            plan: None,
            report: None,
        }
    }

    /// Returns the project being built.
    pub fn project(&self) -> &ResolvedProject {
        &self.project
    }

    /// Returns the run's log.
    pub fn log(&self) -> &BuildLog {
        &self.log
    }

    /// Discovers scripts and applies the incremental filter.
    ///
    /// Runs once; later calls return the same plan.
    pub fn prepare(&mut self) -> Result<&BuildPlan, BuildError> {
        let p = match self.plan.take() {
            Some(p) => p,
            None => {
                let units = discover(&self.project, &self.log)?;
                let p = plan(units, self.project.incremental);
                for skipped in p.skipped_outcomes() {
                    tracing::debug!("{} is up to date", skipped.unit.namespace_id);
                }
                p
            }
        };
        Ok(&*self.plan.insert(p))
    }

    /// Compiles every stale script and returns `(succeeded, failed)`.
    ///
    /// Time spent on succeeded scripts is added to `timing`. A missing
    /// script or folder aborts before anything is compiled.
    pub fn try_compile(&mut self, timing: &mut TimeElapsed) -> Result<(usize, usize), BuildError> {
        self.prepare()?;
        let Some(plan) = &self.plan else {
            return Ok((0, 0));
        };

        let report = dispatch::run(
            plan,
            self.project.worker_limit,
            self.compiler.as_ref(),
            &self.log,
            &self.cancel,
        );
        timing.merge(&report.timing);
        let counts = (report.succeeded(), report.failed());
        self.report = Some(report);
        Ok(counts)
    }

    /// Returns the compile report, once [`try_compile`](Self::try_compile) has run.
    pub fn report(&self) -> Option<&DispatchReport> {
        self.report.as_ref()
    }

    /// Returns every module this run produced or left in place.
    ///
    /// That is the modules of units that succeeded, plus those of
    /// up-to-date units that exist on disk. Each path appears once, even
    /// when a flat output layout maps several scripts to the same module.
    pub fn produced_modules(&self) -> Vec<PathBuf> {
        let mut modules = Vec::new();
        if let Some(report) = &self.report {
            modules.extend(
                report
                    .outcomes
                    .iter()
                    .filter(|o| o.status == CompileStatus::Succeeded)
                    .map(|o| (o.index, o.unit.output.clone())),
            );
        }
        if let Some(plan) = &self.plan {
            modules.extend(
                plan.skipped_outcomes()
                    .into_iter()
                    .filter(|o| o.unit.output.is_file())
                    .map(|o| (o.index, o.unit.output.clone())),
            );
        }
        modules.sort_by_key(|(index, _)| *index);
        let mut seen = HashSet::new();
        modules
            .into_iter()
            .map(|(_, path)| path)
            .filter(|path| seen.insert(path.clone()))
            .collect()
    }

    /// Scrubs author and machine names from every produced module.
    ///
    /// Modules are processed concurrently under the project's worker
    /// limit. A module that fails does not stop the others.
    pub fn try_anonymize(&self) -> AnonymizeReport {
        let modules = self.produced_modules();
        let results = map_bounded(&modules, self.project.worker_limit, |path| {
            pyro_pex::anonymize(path)
        });

        let mut report = AnonymizeReport::default();
        for (path, result) in modules.into_iter().zip(results) {
            match result {
                Ok(AnonymizeOutcome::Anonymized) => {
                    tracing::debug!("anonymized {}", path.display());
                    report.anonymized += 1;
                }
                Ok(AnonymizeOutcome::AlreadyAnonymized) => report.unchanged += 1,
                Err(e) => {
                    self.log.note(&format!("Cannot anonymize: {e}"));
                    report.failures.push((path, e));
                }
            }
        }
        report
    }

    /// Packs the output directory into a game archive.
    pub fn try_pack(&self) -> Result<PathBuf, BuildError> {
        let archive = self.project.package.as_ref().ok_or(BuildError::Tool {
            tool: "package",
            reason: "no [package] settings".to_string(),
        })?;
        let command = pack_command(archive, &self.project.output, self.project.game);
        run_tool("package", &command)?;
        self.log
            .note(&format!("Packaged {}", command.target.display()));
        Ok(command.target)
    }

    /// Zips the output directory.
    pub fn try_zip(&self) -> Result<PathBuf, BuildError> {
        let archive = self.project.zip.as_ref().ok_or(BuildError::Tool {
            tool: "zip",
            reason: "no [zip] settings".to_string(),
        })?;
        let command = zip_command(archive, &self.project.output, self.project.zip_compression);
        run_tool("zip", &command)?;
        self.log.note(&format!("Zipped {}", command.target.display()));
        Ok(command.target)
    }
}
