//! Invoking the external script compiler.

use crate::cancel::CancelToken;
use crate::unit::SourceUnit;
use pyro_common::GameType;
use pyro_config::ResolvedProject;
use std::ffi::OsString;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// How a compiler invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// The process exited with a status code.
    Code(i32),
    /// The process was terminated by a signal.
    Signal,
    /// The process ran past the timeout and was killed.
    TimedOut,
    /// The run was cancelled and the process was killed.
    Cancelled,
    /// The process could not be started.
    SpawnFailed,
}

/// Exit kind and captured output of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOutput {
    /// How the process ended.
    pub exit: ExitKind,
    /// Captured stdout followed by stderr.
    pub text: String,
}

/// Compiles one unit.
///
/// Implementations must return promptly once `cancel` is tripped.
pub trait Compiler: Send + Sync {
    /// Compiles `unit` and reports how it went.
    fn compile(&self, unit: &SourceUnit, cancel: &CancelToken) -> CompilerOutput;
}

const ERROR_PATTERNS: [&str; 3] = ["compilation failed", "no output generated", "assembly failed"];

/// Returns `true` if compiler output reports a failure, whatever the exit code.
pub fn matches_error_pattern(text: &str) -> bool {
    let lower = text.to_lowercase();
    ERROR_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Interval between checks on a running compiler.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long output readers may run on after the compiler is gone.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Runs the Papyrus compiler executable once per unit.
#[derive(Debug, Clone)]
pub struct ProcessCompiler {
    /// Compiler executable.
    pub program: PathBuf,
    /// Flags file passed with `-f`.
    pub flags: PathBuf,
    /// Import roots passed with `-i`.
    pub imports: Vec<PathBuf>,
    /// Output directory passed with `-o`.
    pub output: PathBuf,
    /// Target game.
    pub game: GameType,
    /// Pass `-op`.
    pub optimize: bool,
    /// Pass `-r`.
    pub release: bool,
    /// Pass `-final`.
    pub final_: bool,
    /// Kill the compiler after this long.
    pub timeout: Duration,
}

impl ProcessCompiler {
    /// Creates a compiler for a resolved project.
    pub fn from_project(project: &ResolvedProject) -> Self {
        Self {
            program: project.compiler.clone(),
            flags: project.flags.clone(),
            imports: project.imports.clone(),
            output: project.output.clone(),
            game: project.game,
            optimize: project.optimize,
            release: project.release,
            final_: project.final_,
            timeout: project.timeout,
        }
    }

    /// Builds the command-line arguments for `unit`.
    ///
    /// Fallout 4 scripts are passed by namespace identifier so the compiler
    /// writes them into namespace folders. `-r` and `-final` are only
    /// understood by the Fallout 4 compiler.
    pub fn arguments(&self, unit: &SourceUnit) -> Vec<OsString> {
        let source: OsString = if self.game.preserves_namespaces() {
            unit.namespace_id.clone().into()
        } else {
            unit.path.clone().into_os_string()
        };

        let imports = self
            .imports
            .iter()
            .map(|p| p.to_string_lossy())
            .collect::<Vec<_>>()
            .join(";");

        let mut args = vec![
            source,
            format!("-f={}", self.flags.display()).into(),
            format!("-i={imports}").into(),
            format!("-o={}", self.output.display()).into(),
        ];
        if self.optimize {
            args.push("-op".into());
        }
        if self.game == GameType::Fo4 {
            if self.release {
                args.push("-r".into());
            }
            if self.final_ {
                args.push("-final".into());
            }
        }
        args
    }
}

impl Compiler for ProcessCompiler {
    fn compile(&self, unit: &SourceUnit, cancel: &CancelToken) -> CompilerOutput {
        if let Err(e) = std::fs::create_dir_all(&self.output) {
            return CompilerOutput {
                exit: ExitKind::SpawnFailed,
                text: format!("cannot create {}: {e}", self.output.display()),
            };
        }

        let spawned = Command::new(&self.program)
            .args(self.arguments(unit))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                return CompilerOutput {
                    exit: ExitKind::SpawnFailed,
                    text: format!("failed to start {}: {e}", self.program.display()),
                }
            }
        };

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let start = Instant::now();
        let mut note = None;
        let exit = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status.code().map_or(ExitKind::Signal, ExitKind::Code),
                Ok(None) => {}
                Err(e) => {
                    note = Some(format!("cannot wait for compiler: {e}"));
                    reap(&mut child);
                    break ExitKind::Signal;
                }
            }
            if cancel.is_cancelled() {
                reap(&mut child);
                break ExitKind::Cancelled;
            }
            if start.elapsed() >= self.timeout {
                reap(&mut child);
                break ExitKind::TimedOut;
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        // A process the compiler spawned can outlive it and hold the pipes
        // open, so readers only get until the deadline to reach end of file.
        let deadline = match exit {
            ExitKind::Code(_) => (start + self.timeout).max(Instant::now() + DRAIN_GRACE),
            _ => Instant::now() + DRAIN_GRACE,
        };
        let mut text = stdout.map(|d| d.collect(deadline)).unwrap_or_default();
        let err_text = stderr.map(|d| d.collect(deadline)).unwrap_or_default();
        for extra in [Some(err_text), note].into_iter().flatten() {
            if extra.is_empty() {
                continue;
            }
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&extra);
        }

        CompilerOutput { exit, text }
    }
}

/// Kills the child and waits for it so no zombie is left behind.
fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Output read so far from one of the compiler's pipes.
struct Drain {
    buf: Arc<Mutex<Vec<u8>>>,
    done: mpsc::Receiver<()>,
}

impl Drain {
    /// Waits for end of file until `deadline`, then returns what was read.
    fn collect(self, deadline: Instant) -> String {
        let _ = self
            .done
            .recv_timeout(deadline.saturating_duration_since(Instant::now()));
        let bytes = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        let text = String::from_utf8_lossy(&bytes).into_owned();
        text
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> Drain {
    let buf = Arc::new(Mutex::new(Vec::new()));
    let (tx, done) = mpsc::channel();
    let sink = Arc::clone(&buf);
    std::thread::spawn(move || {
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => sink
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(_) => break,
            }
        }
        let _ = tx.send(());
    });
    Drain { buf, done }
}
