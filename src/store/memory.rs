//! In-memory store
//!
//! A process-local key/value map standing in for a real data store. It keeps
//! the same key layout a key/value cluster would see
//! (`"{session}:{partition}:{offset}:{key}:"`) and can be made slow or flaky:
//!
//! - `simulated_latency` sleeps before every operation
//! - `failure_rate` fails a random fraction of operations
//! - [`InMemoryStore::set_should_fail`] fails every operation until cleared
//! - [`InMemoryStore::corrupt`] overwrites a stored value so verification trips
//!
//! # Example
//!
//! ```
//! use dbpulse::store::DataStore;
//! use dbpulse::store::memory::InMemoryStore;
//! use dbpulse::corpus::Coordinate;
//!
//! let store = InMemoryStore::new();
//! store.create_schema("ABCDEFGHIJ", 2).unwrap();
//!
//! let at = Coordinate::new(1, 0);
//! store.write("ABCDEFGHIJ", at, "1.0.xyz", "payload").unwrap();
//! assert_eq!(store.read("ABCDEFGHIJ", at, "1.0.xyz").unwrap(), "payload");
//! ```

use super::{DataStore, StoreError};
use crate::corpus::Coordinate;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

/// Behaviour knobs for [`InMemoryStore`]
#[derive(Debug, Clone, Default)]
pub struct MemoryStoreOptions {
    /// Added to every operation
    pub simulated_latency: Duration,
    /// Fraction of operations that fail (0.0 - 1.0)
    pub failure_rate: f64,
    /// Accept sessions whose schema was created by someone else
    pub permissive: bool,
    /// Seed for the failure-injection RNG
    pub seed: Option<u64>,
}

/// Thread-safe in-memory store
#[derive(Debug)]
pub struct InMemoryStore {
    options: MemoryStoreOptions,
    /// session name -> number of partitions
    sessions: Mutex<HashMap<String, usize>>,
    data: Mutex<HashMap<String, String>>,
    rng: Mutex<Xoshiro256PlusPlus>,
    should_fail: AtomicBool,
    writes: AtomicU64,
    reads: AtomicU64,
}

impl InMemoryStore {
    /// Fast, reliable, strict store
    pub fn new() -> Self {
        Self::build(MemoryStoreOptions::default())
    }

    pub fn with_options(options: MemoryStoreOptions) -> Result<Self, StoreError> {
        if !(0.0..=1.0).contains(&options.failure_rate) {
            return Err(StoreError::InvalidOption(format!(
                "failure_rate must be within [0, 1], got {}",
                options.failure_rate
            )));
        }
        Ok(Self::build(options))
    }

    fn build(options: MemoryStoreOptions) -> Self {
        let rng = match options.seed {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };
        Self {
            options,
            sessions: Mutex::new(HashMap::new()),
            data: Mutex::new(HashMap::new()),
            rng: Mutex::new(rng),
            should_fail: AtomicBool::new(false),
            writes: AtomicU64::new(0),
            reads: AtomicU64::new(0),
        }
    }

    /// Fail every operation until cleared
    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::Relaxed);
    }

    /// Replace a stored value; returns false if nothing was stored there
    pub fn corrupt(&self, session: &str, coordinate: Coordinate, key: &str, value: &str) -> bool {
        let field = Self::field(session, coordinate, key);
        match lock(&self.data).get_mut(&field) {
            Some(stored) => {
                *stored = value.to_string();
                true
            }
            None => false,
        }
    }

    /// Successful writes so far
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Successful reads so far
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        lock(&self.data).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.data).is_empty()
    }

    fn field(session: &str, coordinate: Coordinate, key: &str) -> String {
        format!(
            "{}:{}:{}:{}:",
            session, coordinate.partition, coordinate.offset, key
        )
    }

    /// Session and partition checks, simulated latency, injected faults
    fn admit(&self, session: &str, coordinate: Coordinate, op: &str) -> Result<(), StoreError> {
        match lock(&self.sessions).get(session) {
            Some(&partitions) if coordinate.partition >= partitions => {
                return Err(StoreError::InvalidPartition {
                    partition: coordinate.partition,
                    partitions,
                });
            }
            Some(_) => {}
            None if self.options.permissive => {}
            None => {
                return Err(StoreError::UnknownSession {
                    session: session.to_string(),
                });
            }
        }

        if !self.options.simulated_latency.is_zero() {
            thread::sleep(self.options.simulated_latency);
        }

        if self.should_fail.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable(format!("{} rejected", op)));
        }
        if self.options.failure_rate > 0.0
            && lock(&self.rng).gen_bool(self.options.failure_rate)
        {
            return Err(StoreError::Unavailable(format!("injected {} failure", op)));
        }
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn create_schema(&self, session: &str, partitions: usize) -> Result<(), StoreError> {
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("schema creation rejected".to_string()));
        }
        lock(&self.sessions).insert(session.to_string(), partitions);
        Ok(())
    }

    fn write(
        &self,
        session: &str,
        coordinate: Coordinate,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        self.admit(session, coordinate, "write")?;
        lock(&self.data).insert(Self::field(session, coordinate, key), value.to_string());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn read(
        &self,
        session: &str,
        coordinate: Coordinate,
        key: &str,
    ) -> Result<String, StoreError> {
        self.admit(session, coordinate, "read")?;
        let field = Self::field(session, coordinate, key);
        let value = lock(&self.data)
            .get(&field)
            .cloned()
            .ok_or(StoreError::NotFound { key: field })?;
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(value)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    const SESSION: &str = "QWERTYUIOP";

    fn store_with_schema(partitions: usize) -> InMemoryStore {
        let store = InMemoryStore::new();
        store.create_schema(SESSION, partitions).unwrap();
        store
    }

    #[test]
    fn test_write_then_read() {
        let store = store_with_schema(2);
        let at = Coordinate::new(1, 4);
        store.write(SESSION, at, "1.4.abc", "value").unwrap();

        assert_eq!(store.read(SESSION, at, "1.4.abc").unwrap(), "value");
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.read_count(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_namespaced_keys() {
        let store = store_with_schema(1);
        store.create_schema("OTHER", 1).unwrap();
        let at = Coordinate::new(0, 0);
        store.write(SESSION, at, "k", "mine").unwrap();
        store.write("OTHER", at, "k", "theirs").unwrap();

        assert_eq!(store.read(SESSION, at, "k").unwrap(), "mine");
        assert_eq!(store.read("OTHER", at, "k").unwrap(), "theirs");
        assert_eq!(InMemoryStore::field(SESSION, at, "k"), "QWERTYUIOP:0:0:k:");
    }

    #[test]
    fn test_missing_key() {
        let store = store_with_schema(1);
        let err = store.read(SESSION, Coordinate::new(0, 9), "nope").unwrap_err();
        assert_eq!(
            err,
            StoreError::NotFound {
                key: "QWERTYUIOP:0:9:nope:".to_string()
            }
        );
        assert_eq!(store.read_count(), 0);
    }

    #[test]
    fn test_unknown_session_and_partition() {
        let store = store_with_schema(2);
        let err = store.write("NOPE", Coordinate::new(0, 0), "k", "v").unwrap_err();
        assert!(matches!(err, StoreError::UnknownSession { .. }));

        let err = store.write(SESSION, Coordinate::new(2, 0), "k", "v").unwrap_err();
        assert_eq!(
            err,
            StoreError::InvalidPartition {
                partition: 2,
                partitions: 2
            }
        );
    }

    #[test]
    fn test_should_fail() {
        let store = store_with_schema(1);
        let at = Coordinate::new(0, 0);
        store.set_should_fail(true);
        assert!(matches!(
            store.write(SESSION, at, "k", "v"),
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.create_schema("NEW", 1).is_err());

        store.set_should_fail(false);
        store.write(SESSION, at, "k", "v").unwrap();
    }

    #[test]
    fn test_failure_rate_bounds() {
        for bad in [-0.1, 1.01, f64::NAN] {
            let options = MemoryStoreOptions {
                failure_rate: bad,
                ..Default::default()
            };
            assert!(InMemoryStore::with_options(options).is_err());
        }
    }

    #[test]
    fn test_full_failure_rate() {
        let store = InMemoryStore::with_options(MemoryStoreOptions {
            failure_rate: 1.0,
            seed: Some(3),
            ..Default::default()
        })
        .unwrap();
        store.create_schema(SESSION, 1).unwrap();
        for o in 0..20 {
            assert!(store.write(SESSION, Coordinate::new(0, o), "k", "v").is_err());
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_partial_failure_rate() {
        let store = InMemoryStore::with_options(MemoryStoreOptions {
            failure_rate: 0.5,
            seed: Some(11),
            ..Default::default()
        })
        .unwrap();
        store.create_schema(SESSION, 1).unwrap();

        let failures = (0..2_000)
            .filter(|&o| store.write(SESSION, Coordinate::new(0, o), "k", "v").is_err())
            .count();
        assert!((800..1_200).contains(&failures), "failures: {}", failures);
    }

    #[test]
    fn test_corrupt() {
        let store = store_with_schema(1);
        let at = Coordinate::new(0, 1);
        assert!(!store.corrupt(SESSION, at, "k", "bad"));

        store.write(SESSION, at, "k", "good").unwrap();
        assert!(store.corrupt(SESSION, at, "k", "bad"));
        assert_eq!(store.read(SESSION, at, "k").unwrap(), "bad");
    }

    #[test]
    fn test_simulated_latency() {
        let store = InMemoryStore::with_options(MemoryStoreOptions {
            simulated_latency: Duration::from_millis(5),
            ..Default::default()
        })
        .unwrap();
        store.create_schema(SESSION, 1).unwrap();

        let start = Instant::now();
        store.write(SESSION, Coordinate::new(0, 0), "k", "v").unwrap();
        assert!(start.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn test_permissive_accepts_unknown_session() {
        let store = InMemoryStore::with_options(MemoryStoreOptions {
            permissive: true,
            ..Default::default()
        })
        .unwrap();
        let at = Coordinate::new(5, 5);
        store.write("EARLIER", at, "k", "v").unwrap();
        assert_eq!(store.read("EARLIER", at, "k").unwrap(), "v");
    }

    #[test]
    fn test_concurrent_writers() {
        let store = Arc::new(store_with_schema(4));
        let handles: Vec<_> = (0..4)
            .map(|p| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for o in 0..250 {
                        let key = format!("{}.{}.", p, o);
                        store.write(SESSION, Coordinate::new(p, o), &key, "v").unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 1_000);
        assert_eq!(store.write_count(), 1_000);
    }
}
