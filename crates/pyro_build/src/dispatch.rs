//! Bounded worker pool that runs the compiler over a build plan.

use crate::cancel::CancelToken;
use crate::compiler::{matches_error_pattern, Compiler, CompilerOutput, ExitKind};
use crate::log::{BuildLog, LogSegment};
use crate::outcome::{CompileOutcome, CompileStatus, DispatchReport};
use crate::plan::BuildPlan;
use crate::pool::map_bounded;
use crate::unit::SourceUnit;
use pyro_common::TimeElapsed;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Text recorded for units the run never got to.
pub const CANCELLED_BEFORE_DISPATCH: &str = "cancelled before dispatch";

/// Compiles every executable unit of `plan` on up to `worker_limit` workers.
///
/// A `worker_limit` of 1 (or 0) compiles sequentially on the calling
/// thread. Failed units never stop their siblings. Outcomes come back in
/// plan order. Only succeeded units contribute to the timing total.
pub fn run(
    plan: &BuildPlan,
    worker_limit: usize,
    compiler: &dyn Compiler,
    log: &BuildLog,
    cancel: &CancelToken,
) -> DispatchReport {
    let jobs: Vec<(usize, &Arc<SourceUnit>)> = plan.executable().collect();
    let outcomes = map_bounded(&jobs, worker_limit, |&(index, unit)| {
        compile_unit(index, unit, compiler, log, cancel)
    });

    let mut timing = TimeElapsed::new();
    for outcome in &outcomes {
        if outcome.status == CompileStatus::Succeeded {
            timing.add(outcome.elapsed);
        }
    }

    DispatchReport { outcomes, timing }
}

/// Compiles one unit and records its log segment.
fn compile_unit(
    index: usize,
    unit: &Arc<SourceUnit>,
    compiler: &dyn Compiler,
    log: &BuildLog,
    cancel: &CancelToken,
) -> CompileOutcome {
    let (status, elapsed, text) = if cancel.is_cancelled() {
        (
            CompileStatus::Failed,
            Duration::ZERO,
            CANCELLED_BEFORE_DISPATCH.to_string(),
        )
    } else {
        let start = Instant::now();
        let output = compiler.compile(unit, cancel);
        let elapsed = start.elapsed();
        let status = classify(&output);
        (status, elapsed, describe(&output))
    };

    let failed = status == CompileStatus::Failed;
    let mut lines = vec![format!(
        "{} {}",
        if failed { "Failed" } else { "Compiled" },
        unit.namespace_id
    )];
    lines.extend(text.lines().map(str::to_string));
    log.record(LogSegment {
        index,
        unit: unit.namespace_id.clone(),
        failed,
        lines,
    });

    CompileOutcome {
        index,
        unit: Arc::clone(unit),
        status,
        elapsed,
        diagnostics: if failed { text } else { String::new() },
    }
}

/// A unit succeeds only on exit code 0 with no error pattern in its output.
pub fn classify(output: &CompilerOutput) -> CompileStatus {
    match output.exit {
        ExitKind::Code(0) if !matches_error_pattern(&output.text) => CompileStatus::Succeeded,
        _ => CompileStatus::Failed,
    }
}

/// Returns the captured text, or a description of the exit when there is none.
fn describe(output: &CompilerOutput) -> String {
    let trimmed = output.text.trim_end();
    let reason = match output.exit {
        ExitKind::Code(0) => None,
        ExitKind::Code(code) => Some(format!("compiler exited with code {code}")),
        ExitKind::Signal => Some("compiler was terminated by a signal".to_string()),
        ExitKind::TimedOut => Some("compiler timed out and was killed".to_string()),
        ExitKind::Cancelled => Some("compilation cancelled".to_string()),
        ExitKind::SpawnFailed => None,
    };
    match (trimmed.is_empty(), reason) {
        (true, Some(reason)) => reason,
        (false, Some(reason)) => format!("{trimmed}\n{reason}"),
        (_, None) => trimmed.to_string(),
    }
}
