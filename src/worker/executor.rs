//! Operation executors
//!
//! The two primitive operations every workload is built from. Each one times
//! the store call, feeds the elapsed time into the matching metric stream and
//! reports the outcome. The latency is recorded whether or not the call
//! succeeded, so slow failures still show up in the distribution.

use crate::corpus::Coordinate;
use crate::session::Session;
use crate::store::StoreError;
use std::time::{Duration, Instant};

/// Why a single operation failed
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("store error at {coordinate}: {source}")]
    Store {
        coordinate: Coordinate,
        #[source]
        source: StoreError,
    },

    #[error("data mismatch at {coordinate}: expected {expected_len} bytes, received {actual_len} bytes")]
    Mismatch {
        coordinate: Coordinate,
        expected_len: usize,
        actual_len: usize,
    },

    #[error("coordinate {0} is outside the corpus")]
    OutOfCorpus(Coordinate),
}

impl OperationError {
    pub fn coordinate(&self) -> Coordinate {
        match self {
            OperationError::Store { coordinate, .. } => *coordinate,
            OperationError::Mismatch { coordinate, .. } => *coordinate,
            OperationError::OutOfCorpus(coordinate) => *coordinate,
        }
    }
}

/// Write the corpus record at `coordinate` and time it
pub fn timed_write(session: &Session, coordinate: Coordinate) -> Result<Duration, OperationError> {
    let record = session
        .corpus()
        .get(coordinate)
        .ok_or(OperationError::OutOfCorpus(coordinate))?;

    let start = Instant::now();
    let outcome = session
        .store()
        .write(session.name(), coordinate, &record.key, &record.value);
    let elapsed = start.elapsed();
    session.writes().record(elapsed);

    outcome
        .map(|()| elapsed)
        .map_err(|source| OperationError::Store { coordinate, source })
}

/// Read the record at `coordinate`, time it, and verify it against the corpus
///
/// A failed read is reported as a store error and is not verified.
pub fn timed_read(session: &Session, coordinate: Coordinate) -> Result<Duration, OperationError> {
    let record = session
        .corpus()
        .get(coordinate)
        .ok_or(OperationError::OutOfCorpus(coordinate))?;

    let start = Instant::now();
    let outcome = session.store().read(session.name(), coordinate, &record.key);
    let elapsed = start.elapsed();
    session.reads().record(elapsed);

    let value = outcome.map_err(|source| OperationError::Store { coordinate, source })?;
    if session.verifies() && value != record.value {
        return Err(OperationError::Mismatch {
            coordinate,
            expected_len: record.value.len(),
            actual_len: value.len(),
        });
    }
    Ok(elapsed)
}
