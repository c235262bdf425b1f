//! Accumulated compile timing for a build run.

use std::time::Duration;

/// Accumulates per-unit elapsed time across a build run.
///
/// Under parallel execution the wall-clock span of a run says little about
/// how long each script took, so the total is the sum of the individual
/// durations fed in by the dispatcher rather than dispatch-to-finish time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeElapsed {
    total: Duration,
    samples: u32,
}

impl TimeElapsed {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one measured duration.
    pub fn add(&mut self, elapsed: Duration) {
        self.total += elapsed;
        self.samples += 1;
    }

    /// Returns the sum of every duration added so far.
    pub fn total(&self) -> Duration {
        self.total
    }

    /// Returns the number of durations added so far.
    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Returns the total divided by `success_count`.
    ///
    /// # Panics
    ///
    /// Panics if `success_count` is zero. Callers must check for a run with
    /// no successful units before asking for an average.
    pub fn average(&self, success_count: u32) -> Duration {
        self.total / success_count
    }

    /// Merges another accumulator into this one.
    pub fn merge(&mut self, other: &TimeElapsed) {
        self.total += other.total;
        self.samples += other.samples;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_accumulator() {
        let t = TimeElapsed::new();
        assert_eq!(t.total(), Duration::ZERO);
        assert_eq!(t.samples(), 0);
    }

    #[test]
    fn total_is_sum_of_samples() {
        let mut t = TimeElapsed::new();
        t.add(Duration::from_millis(250));
        t.add(Duration::from_millis(750));
        assert_eq!(t.total(), Duration::from_secs(1));
        assert_eq!(t.samples(), 2);
    }

    #[test]
    fn average_of_one_two_three() {
        let mut t = TimeElapsed::new();
        t.add(Duration::from_secs_f64(1.0));
        t.add(Duration::from_secs_f64(2.0));
        t.add(Duration::from_secs_f64(3.0));
        assert_eq!(t.average(3), Duration::from_secs(2));
        assert!((t.average(3).as_secs_f64() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    #[should_panic]
    fn average_of_zero_successes_is_a_precondition_violation() {
        let mut t = TimeElapsed::new();
        t.add(Duration::from_secs(1));
        let _ = t.average(0);
    }

    #[test]
    fn merge_combines_totals() {
        let mut a = TimeElapsed::new();
        a.add(Duration::from_secs(1));
        let mut b = TimeElapsed::new();
        b.add(Duration::from_secs(2));
        b.add(Duration::from_secs(3));
        a.merge(&b);
        assert_eq!(a.total(), Duration::from_secs(6));
        assert_eq!(a.samples(), 3);
    }
}
