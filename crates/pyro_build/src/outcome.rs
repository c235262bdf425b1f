//! Per-unit compile outcomes and their aggregation.

use crate::unit::SourceUnit;
use pyro_common::TimeElapsed;
use std::sync::Arc;
use std::time::Duration;

/// Final state of one unit in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompileStatus {
    /// The compiler produced a module.
    Succeeded,
    /// The compiler failed, timed out, or the run was cancelled.
    Failed,
    /// The module was already up to date. Only the planner assigns this.
    Skipped,
}

/// The result of handling one unit.
#[derive(Debug, Clone)]
pub struct CompileOutcome {
    /// Position of the unit in the plan's discovery order.
    pub index: usize,
    /// The unit.
    pub unit: Arc<SourceUnit>,
    /// What happened.
    pub status: CompileStatus,
    /// Time from dispatch to completion. Zero for units never dispatched.
    pub elapsed: Duration,
    /// Captured compiler output when the unit failed.
    pub diagnostics: String,
}

/// Everything the dispatcher produced for a plan.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// One outcome per executable unit, in plan order.
    pub outcomes: Vec<CompileOutcome>,
    /// Accumulated time of the units that succeeded.
    pub timing: TimeElapsed,
}

impl DispatchReport {
    /// Returns the number of units with `status`.
    pub fn count(&self, status: CompileStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Returns the number of units that succeeded.
    pub fn succeeded(&self) -> usize {
        self.count(CompileStatus::Succeeded)
    }

    /// Returns the number of units that failed.
    pub fn failed(&self) -> usize {
        self.count(CompileStatus::Failed)
    }

    /// Iterates over the outcomes of failed units.
    pub fn failures(&self) -> impl Iterator<Item = &CompileOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == CompileStatus::Failed)
    }
}
