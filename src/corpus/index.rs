//! Data availability index
//!
//! Tracks which coordinates are known to exist in the store. Entries are only
//! appended after a successful write, so a random pick always names a record
//! that a read can reasonably expect to find.

use super::Coordinate;
use rand::Rng;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    /// Nothing has been written yet; callers skip the iteration
    #[error("availability index is empty")]
    Empty,
}

/// Append-only, thread-safe set of written coordinates
#[derive(Debug, Default)]
pub struct AvailabilityIndex {
    entries: Mutex<Vec<Coordinate>>,
}

impl AvailabilityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an index with coordinates that already exist in the store
    pub fn from_coordinates<I>(coordinates: I) -> Self
    where
        I: IntoIterator<Item = Coordinate>,
    {
        Self {
            entries: Mutex::new(coordinates.into_iter().collect()),
        }
    }

    /// Register a coordinate under the next dense key
    pub fn record(&self, coordinate: Coordinate) {
        self.lock().push(coordinate);
    }

    /// Uniformly chosen registered coordinate
    pub fn pick_random<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Coordinate, IndexError> {
        let entries = self.lock();
        if entries.is_empty() {
            return Err(IndexError::Empty);
        }
        Ok(entries[rng.gen_range(0..entries.len())])
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Coordinate>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
