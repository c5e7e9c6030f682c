//! Streaming mean / variance tracker
//!
//! Folds latency samples into running mean, variance and standard deviation in
//! constant time and memory. Updates use Welford's method so the variance never
//! drifts negative, while the state still exposes the mean of squares.
//!
//! # Example
//!
//! ```
//! use dbpulse::stats::mean::MeanVariance;
//! use std::time::Duration;
//!
//! let tracker = MeanVariance::new();
//! tracker.add(Duration::from_nanos(10));
//! tracker.add(Duration::from_nanos(20));
//! tracker.add(Duration::from_nanos(30));
//!
//! assert_eq!(tracker.count(), 3);
//! assert_eq!(tracker.mean(), Duration::from_nanos(20));
//! ```

use crate::util::time::format_duration;
use serde::Serialize;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Point-in-time copy of the tracker state (all values in nanoseconds)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MeanVarianceState {
    pub count: u64,
    pub mean: f64,
    pub mean_of_squares: f64,
    pub variance: f64,
    pub stddev: f64,
}

#[derive(Debug, Default)]
struct Accumulator {
    count: u64,
    mean: f64,
    /// Sum of squared deviations from the running mean
    m2: f64,
}

impl Accumulator {
    fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.m2 / self.count as f64).max(0.0)
        }
    }

    fn state(&self) -> MeanVarianceState {
        let variance = self.variance();
        MeanVarianceState {
            count: self.count,
            mean: self.mean,
            mean_of_squares: variance + self.mean * self.mean,
            variance,
            stddev: variance.sqrt(),
        }
    }
}

/// Thread-safe streaming mean / variance tracker
///
/// One instance is shared by every worker feeding the same metric stream.
/// Each `add` is a single critical section, so concurrent callers produce the
/// same final state as any sequential ordering of their samples.
#[derive(Debug, Default)]
pub struct MeanVariance {
    inner: Mutex<Accumulator>,
}

impl MeanVariance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one sample into the running state
    pub fn add(&self, sample: Duration) {
        let x = sample.as_nanos() as f64;
        let mut acc = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        acc.count += 1;
        let delta = x - acc.mean;
        acc.mean += delta / acc.count as f64;
        let delta_after = x - acc.mean;
        acc.m2 += delta * delta_after;
    }

    pub fn count(&self) -> u64 {
        self.lock().count
    }

    pub fn mean(&self) -> Duration {
        Duration::from_nanos(self.lock().mean.round() as u64)
    }

    pub fn stddev(&self) -> Duration {
        Duration::from_nanos(self.lock().variance().sqrt().round() as u64)
    }

    /// Population variance in ns²
    pub fn variance(&self) -> f64 {
        self.lock().variance()
    }

    pub fn snapshot(&self) -> MeanVarianceState {
        self.lock().state()
    }

    pub fn reset(&self) {
        *self.lock() = Accumulator::default();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Accumulator> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Display for MeanVariance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.snapshot();
        write!(
            f,
            "Total: {}, Mean: {}, Standard Deviation: {}",
            state.count,
            format_duration(Duration::from_nanos(state.mean.round() as u64)),
            format_duration(Duration::from_nanos(state.stddev.round() as u64)),
        )
    }
}
