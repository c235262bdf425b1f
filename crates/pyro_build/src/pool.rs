//! Bounded parallel map shared by compilation and post-processing.

use rayon::prelude::*;

/// Applies `f` to every item on at most `worker_limit` threads.
///
/// Results keep the order of `items`. A limit of 1 (or 0), or a single
/// item, runs on the calling thread. If the pool cannot be created the
/// work falls back to sequential execution.
pub fn map_bounded<T, R, F>(items: &[T], worker_limit: usize, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    if worker_limit <= 1 || items.len() <= 1 {
        return items.iter().map(&f).collect();
    }

    // Scoped so the workers are joined before returning.
    rayon::ThreadPoolBuilder::new()
        .num_threads(worker_limit.min(items.len()))
        .build_scoped(rayon::ThreadBuilder::run, |pool| {
            pool.install(|| items.par_iter().map(&f).collect::<Vec<_>>())
        })
        .unwrap_or_else(|e| {
            tracing::warn!("failed to create worker pool ({e}), running sequentially");
            items.iter().map(&f).collect()
        })
}
