//! Per-run diagnostic sink shared by the planner, dispatcher and post-processing.
//!
//! Each unit's output is pushed as one [`LogSegment`] under a single lock,
//! so segments from concurrent workers never interleave. Segments are
//! mirrored to `tracing` and, when a log directory is configured, appended to
//! a per-run log file while the same lock is held.

use crate::error::BuildError;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// All output produced for one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSegment {
    /// Position of the unit in the plan's discovery order.
    pub index: usize,
    /// Namespace identifier of the unit.
    pub unit: String,
    /// Whether the unit failed.
    pub failed: bool,
    /// Output lines, header first.
    pub lines: Vec<String>,
}

struct Inner {
    segments: Vec<LogSegment>,
    file: Option<File>,
}

/// A thread-safe, per-run log.
pub struct BuildLog {
    inner: Mutex<Inner>,
    failures: AtomicUsize,
    path: Option<PathBuf>,
}

impl BuildLog {
    /// Creates a log that only keeps segments in memory and mirrors them to `tracing`.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                segments: Vec::new(),
                file: None,
            }),
            failures: AtomicUsize::new(0),
            path: None,
        }
    }

    /// Creates a log that also appends to `<dir>/pyro-<unix-seconds>.log`.
    pub fn with_file(dir: &Path) -> Result<Self, BuildError> {
        let io_err = |path: &Path, source| BuildError::Io {
            path: path.to_path_buf(),
            source,
        };
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let path = dir.join(format!("pyro-{stamp}.log"));
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;

        Ok(Self {
            inner: Mutex::new(Inner {
                segments: Vec::new(),
                file: Some(file),
            }),
            failures: AtomicUsize::new(0),
            path: Some(path),
        })
    }

    /// Returns the log file path, if one is being written.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records one unit's output as a single uninterrupted segment.
    ///
    /// The `tracing` mirror is one event per segment, emitted under the
    /// same lock as the file write.
    pub fn record(&self, segment: LogSegment) {
        let text = segment.lines.join("\n");
        let mut inner = self.lock();
        if segment.failed {
            self.failures.fetch_add(1, Ordering::Relaxed);
            tracing::error!(unit = %segment.unit, "{text}");
        } else {
            tracing::info!(unit = %segment.unit, "{text}");
        }

        if let Some(file) = inner.file.as_mut() {
            if let Err(e) = writeln!(file, "{text}") {
                tracing::warn!("failed to write build log: {e}");
            }
        }
        inner.segments.push(segment);
    }

    /// Records a run-level message that belongs to no unit.
    pub fn note(&self, message: &str) {
        let mut inner = self.lock();
        tracing::info!("{message}");
        if let Some(file) = inner.file.as_mut() {
            if let Err(e) = writeln!(file, "{message}") {
                tracing::warn!("failed to write build log: {e}");
            }
        }
    }

    /// Returns the number of failed segments recorded so far.
    pub fn failure_count(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all segments, ordered by plan index.
    pub fn segments(&self) -> Vec<LogSegment> {
        let mut segments = self.lock().segments.clone();
        segments.sort_by_key(|s| s.index);
        segments
    }

    /// Renders every segment in plan order.
    pub fn render(&self) -> String {
        self.segments()
            .iter()
            .map(|s| s.lines.join("\n"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for BuildLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn segment(index: usize, failed: bool) -> LogSegment {
        LogSegment {
            index,
            unit: format!("Unit{index}.psc"),
            failed,
            lines: vec![
                format!("Compiling Unit{index}.psc"),
                format!("line a of {index}"),
                format!("line b of {index}"),
            ],
        }
    }

    #[test]
    fn segments_sorted_by_index() {
        let log = BuildLog::new();
        log.record(segment(2, false));
        log.record(segment(0, false));
        log.record(segment(1, true));
        let order: Vec<_> = log.segments().iter().map(|s| s.index).collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert_eq!(log.failure_count(), 1);
    }

    #[test]
    fn concurrent_segments_do_not_interleave() {
        let log = Arc::new(BuildLog::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || log.record(segment(i, i % 3 == 0)))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let segments = log.segments();
        assert_eq!(segments.len(), 8);
        for (i, s) in segments.iter().enumerate() {
            assert_eq!(s, &segment(i, i % 3 == 0));
        }
        assert_eq!(log.failure_count(), 3);
    }

    /// Collects formatted `tracing` output from any thread.
    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn mirrored_output_keeps_segments_whole() {
        let capture = Capture::default();
        let writer = capture.clone();
        let dispatch = tracing::Dispatch::new(
            tracing_subscriber::fmt()
                .with_writer(move || writer.clone())
                .with_ansi(false)
                .with_max_level(tracing::Level::DEBUG)
                .finish(),
        );

        let long_segment = |index: usize| LogSegment {
            index,
            unit: format!("Unit{index}.psc"),
            failed: index % 4 == 0,
            lines: (0..200).map(|k| format!("line {k} of {index}")).collect(),
        };

        let log = Arc::new(BuildLog::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let log = Arc::clone(&log);
                let dispatch = dispatch.clone();
                std::thread::spawn(move || {
                    tracing::dispatcher::with_default(&dispatch, || log.record(long_segment(i)))
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let text = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        for i in 0..8 {
            assert!(text.contains(&long_segment(i).lines.join("\n")));
        }
    }

    #[test]
    fn render_is_stable() {
        let log = BuildLog::new();
        log.record(segment(1, false));
        log.record(segment(0, false));
        assert_eq!(
            log.render(),
            "Compiling Unit0.psc\nline a of 0\nline b of 0\n\
             Compiling Unit1.psc\nline a of 1\nline b of 1"
        );
    }

    #[test]
    fn file_receives_whole_segments() {
        let dir = tempfile::tempdir().unwrap();
        let log = BuildLog::with_file(&dir.path().join("logs")).unwrap();
        log.note("Found 2 scripts");
        log.record(segment(0, false));
        log.record(segment(1, true));

        let path = log.path().unwrap().to_path_buf();
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("pyro-"));
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.starts_with("Found 2 scripts\n"));
        assert!(text.contains("Compiling Unit0.psc\nline a of 0\nline b of 0\n"));
        assert!(text.contains("Compiling Unit1.psc\nline a of 1\nline b of 1\n"));
    }

    #[test]
    fn in_memory_log_has_no_path() {
        assert!(BuildLog::new().path().is_none());
    }
}
