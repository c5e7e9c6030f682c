//! Fixed-bucket latency distribution
//!
//! Partitions `[0, maximum)` into `B` equal-width buckets and counts samples
//! per bucket. Anything at or above `maximum` is an outlier ("deviant").
//! Relative and absolute frequencies are derived from the counters when a
//! snapshot is taken, so the hot path is a single increment under the lock.

use super::StatsError;
use crate::util::time::format_duration;
use serde::Serialize;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug)]
struct Counters {
    population: Vec<u64>,
    outliers: u64,
    total: u64,
}

/// Thread-safe equal-width latency histogram
#[derive(Debug)]
pub struct LatencyDistribution {
    maximum: Duration,
    width_nanos: u64,
    counters: Mutex<Counters>,
}

/// Consistent copy of a distribution with derived frequencies
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionSnapshot {
    pub minimum_ns: u64,
    pub maximum_ns: u64,
    pub bucket_width_ns: u64,
    pub total: u64,
    pub in_range: u64,
    pub outliers: u64,
    pub population: Vec<u64>,
    /// `population[i] / in_range`
    pub relative: Vec<f64>,
    /// `population[i] / total`
    pub absolute: Vec<f64>,
}

impl LatencyDistribution {
    /// Build a distribution over `[0, maximum)` split into `buckets` buckets
    ///
    /// Fails if there are no buckets or the integer bucket width is 0 ns.
    pub fn new(maximum: Duration, buckets: usize) -> Result<Self, StatsError> {
        if buckets == 0 {
            return Err(StatsError::NoBuckets);
        }

        let max_nanos = u64::try_from(maximum.as_nanos()).unwrap_or(u64::MAX);
        let width_nanos = max_nanos / buckets as u64;
        if width_nanos == 0 {
            return Err(StatsError::ZeroBucketWidth { maximum, buckets });
        }

        Ok(Self {
            maximum,
            width_nanos,
            counters: Mutex::new(Counters {
                population: vec![0; buckets],
                outliers: 0,
                total: 0,
            }),
        })
    }

    pub fn add(&self, sample: Duration) {
        let mut counters = self.lock();
        counters.total += 1;

        if sample >= self.maximum {
            counters.outliers += 1;
            return;
        }

        let nanos = u64::try_from(sample.as_nanos()).unwrap_or(u64::MAX);
        let slot = (nanos / self.width_nanos) as usize;
        match counters.population.get_mut(slot) {
            Some(bucket) => *bucket += 1,
            None => counters.outliers += 1,
        }
    }

    pub fn buckets(&self) -> usize {
        self.lock().population.len()
    }

    pub fn bucket_width(&self) -> Duration {
        Duration::from_nanos(self.width_nanos)
    }

    pub fn maximum(&self) -> Duration {
        self.maximum
    }

    pub fn total(&self) -> u64 {
        self.lock().total
    }

    pub fn outliers(&self) -> u64 {
        self.lock().outliers
    }

    /// Zero every counter; bucket layout is kept
    pub fn reset(&self) {
        let mut counters = self.lock();
        counters.population.iter_mut().for_each(|p| *p = 0);
        counters.outliers = 0;
        counters.total = 0;
    }

    pub fn snapshot(&self) -> DistributionSnapshot {
        let (population, outliers, total) = {
            let counters = self.lock();
            (counters.population.clone(), counters.outliers, counters.total)
        };

        let in_range = total - outliers;
        let ratio = |num: u64, den: u64| if den == 0 { 0.0 } else { num as f64 / den as f64 };

        DistributionSnapshot {
            minimum_ns: 0,
            maximum_ns: u64::try_from(self.maximum.as_nanos()).unwrap_or(u64::MAX),
            bucket_width_ns: self.width_nanos,
            total,
            in_range,
            outliers,
            relative: population.iter().map(|&p| ratio(p, in_range)).collect(),
            absolute: population.iter().map(|&p| ratio(p, total)).collect(),
            population,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DistributionSnapshot {
    pub fn in_range_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.in_range as f64 / self.total as f64
        }
    }

    pub fn outlier_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.outliers as f64 / self.total as f64
        }
    }
}

fn join_percent(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{:.2}%", v * 100.0))
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for DistributionSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let population = self
            .population
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        writeln!(f, "Total Population: {}", self.total)?;
        writeln!(
            f,
            "Table [{}, {}] ({} buckets of {}):",
            format_duration(Duration::from_nanos(self.minimum_ns)),
            format_duration(Duration::from_nanos(self.maximum_ns)),
            self.population.len(),
            format_duration(Duration::from_nanos(self.bucket_width_ns)),
        )?;
        writeln!(
            f,
            "\tPopulation: {} ({:.2}%)",
            self.in_range,
            self.in_range_ratio() * 100.0
        )?;
        writeln!(
            f,
            "\tDeviants: {} ({:.2}%)",
            self.outliers,
            self.outlier_ratio() * 100.0
        )?;
        writeln!(f, "\t{}", population)?;
        writeln!(f, "\t{}", join_percent(&self.relative))?;
        writeln!(f, "\t{}", join_percent(&self.absolute))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn ns(n: u64) -> Duration {
        Duration::from_nanos(n)
    }

    #[test]
    fn test_bucket_assignment() {
        let dist = LatencyDistribution::new(ns(100), 5).unwrap();
        for n in [10, 10, 30, 99, 100] {
            dist.add(ns(n));
        }

        let snap = dist.snapshot();
        assert_eq!(snap.bucket_width_ns, 20);
        assert_eq!(snap.population, vec![2, 1, 0, 0, 1]);
        assert_eq!(snap.outliers, 1);
        assert_eq!(snap.total, 5);
        assert_eq!(snap.in_range, 4);
    }

    #[test]
    fn test_maximum_is_outlier() {
        let dist = LatencyDistribution::new(ns(100), 4).unwrap();
        dist.add(ns(100));
        dist.add(ns(1_000_000));
        dist.add(ns(99));

        let snap = dist.snapshot();
        assert_eq!(snap.outliers, 2);
        assert_eq!(snap.population, vec![0, 0, 0, 1]);
    }

    #[test]
    fn test_truncated_width_overflow_slot() {
        // width = 33, so 99 lands in slot 3 which does not exist
        let dist = LatencyDistribution::new(ns(100), 3).unwrap();
        dist.add(ns(99));
        dist.add(ns(98));
        dist.add(ns(0));

        let snap = dist.snapshot();
        assert_eq!(snap.population, vec![1, 0, 1]);
        assert_eq!(snap.outliers, 1);
    }

    #[test]
    fn test_invariant_population_plus_outliers() {
        let dist = LatencyDistribution::new(Duration::from_micros(50), 7).unwrap();
        for n in (0..200_000u64).step_by(37) {
            dist.add(ns(n));
        }
        let snap = dist.snapshot();
        assert_eq!(snap.population.iter().sum::<u64>() + snap.outliers, snap.total);
    }

    #[test]
    fn test_frequencies() {
        let dist = LatencyDistribution::new(ns(100), 5).unwrap();
        for n in [10, 10, 30, 99, 100] {
            dist.add(ns(n));
        }
        let snap = dist.snapshot();

        assert_eq!(snap.relative, vec![0.5, 0.25, 0.0, 0.0, 0.25]);
        assert_eq!(snap.absolute, vec![0.4, 0.2, 0.0, 0.0, 0.2]);
        assert!((snap.relative.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((snap.in_range_ratio() - 0.8).abs() < 1e-12);
        assert!((snap.outlier_ratio() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_empty_frequencies_are_zero() {
        let dist = LatencyDistribution::new(ns(100), 5).unwrap();
        let snap = dist.snapshot();
        assert!(snap.relative.iter().all(|&r| r == 0.0));
        assert!(snap.absolute.iter().all(|&a| a == 0.0));
        assert_eq!(snap.in_range_ratio(), 0.0);
    }

    #[test]
    fn test_only_outliers() {
        let dist = LatencyDistribution::new(ns(100), 5).unwrap();
        dist.add(ns(500));
        let snap = dist.snapshot();
        assert_eq!(snap.in_range, 0);
        assert!(snap.relative.iter().all(|&r| r == 0.0));
        assert_eq!(snap.outlier_ratio(), 1.0);
    }

    #[test]
    fn test_zero_width_rejected() {
        let err = LatencyDistribution::new(ns(4), 5).unwrap_err();
        assert!(matches!(err, StatsError::ZeroBucketWidth { buckets: 5, .. }));
        assert!(matches!(
            LatencyDistribution::new(ns(100), 0),
            Err(StatsError::NoBuckets)
        ));
    }

    #[test]
    fn test_reset_keeps_layout() {
        let dist = LatencyDistribution::new(ns(100), 5).unwrap();
        dist.add(ns(10));
        dist.add(ns(200));
        dist.reset();

        let snap = dist.snapshot();
        assert_eq!(snap.total, 0);
        assert_eq!(snap.outliers, 0);
        assert_eq!(snap.population, vec![0; 5]);
        assert_eq!(dist.buckets(), 5);
        assert_eq!(dist.bucket_width(), ns(20));
    }

    #[test]
    fn test_concurrent_adds() {
        let dist = Arc::new(LatencyDistribution::new(ns(1_000), 10).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let dist = Arc::clone(&dist);
                thread::spawn(move || {
                    for n in 0..2_000u64 {
                        dist.add(ns(n));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snap = dist.snapshot();
        assert_eq!(snap.total, 8_000);
        assert_eq!(snap.outliers, 4_000);
        assert!(snap.population.iter().all(|&p| p == 400));
    }

    #[test]
    fn test_report_format() {
        let dist = LatencyDistribution::new(ns(100), 5).unwrap();
        for n in [10, 10, 30, 99, 100] {
            dist.add(ns(n));
        }
        let report = dist.snapshot().to_string();

        assert!(report.starts_with("Total Population: 5\n"));
        assert!(report.contains("\tPopulation: 4 (80.00%)\n"));
        assert!(report.contains("\tDeviants: 1 (20.00%)\n"));
        assert!(report.contains("\t2, 1, 0, 0, 1\n"));
        assert!(report.contains("\t50.00%, 25.00%, 0.00%, 0.00%, 25.00%\n"));
        assert!(report.contains("\t40.00%, 20.00%, 0.00%, 0.00%, 20.00%\n"));
    }
}
