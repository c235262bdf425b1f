//! Incremental, worker-pooled build orchestration for Papyrus scripts.
//!
//! A build run discovers the scripts a project names, keeps the ones whose
//! module is missing or older than the source, and compiles them on a
//! bounded worker pool. Per-unit output is collected in a [`BuildLog`]
//! passed in by the caller, timing is accumulated per succeeded unit, and
//! the [`BuildFacade`] then runs anonymization and the external archive
//! tools over the results.

#![warn(missing_docs)]

pub mod cancel;
pub mod compiler;
pub mod dispatch;
pub mod error;
pub mod facade;
pub mod log;
pub mod outcome;
pub mod plan;
pub mod pool;
pub mod tools;
pub mod unit;

pub use cancel::CancelToken;
pub use compiler::{matches_error_pattern, Compiler, CompilerOutput, ExitKind, ProcessCompiler};
pub use dispatch::{run, CANCELLED_BEFORE_DISPATCH};
pub use error::BuildError;
pub use facade::{AnonymizeReport, BuildFacade};
pub use log::{BuildLog, LogSegment};
pub use outcome::{CompileOutcome, CompileStatus, DispatchReport};
pub use plan::{discover, plan, BuildPlan};
pub use unit::SourceUnit;
