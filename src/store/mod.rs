//! Data store drivers
//!
//! The [`DataStore`] trait is the seam between the load generator and the
//! system under test. Drivers are shared by every worker thread, so all
//! methods take `&self` and implementations synchronize internally.
//!
//! # Available drivers
//!
//! - **memory**: in-process key/value map with simulated latency and fault injection

pub mod memory;

use crate::config::workload::StoreKind;
use crate::config::StoreConfig;
use crate::corpus::Coordinate;
use std::sync::Arc;
use std::time::Duration;

/// Errors returned by store drivers
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("key {key:?} not found")]
    NotFound { key: String },

    #[error("session {session:?} has no schema")]
    UnknownSession { session: String },

    #[error("partition {partition} out of range (session has {partitions})")]
    InvalidPartition { partition: usize, partitions: usize },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid store option: {0}")]
    InvalidOption(String),
}

/// Store driver interface
///
/// A session owns one table (or key namespace) per corpus partition. The
/// coordinate is passed alongside the key so drivers can route by partition
/// and build namespaced keys.
pub trait DataStore: Send + Sync {
    /// Driver name for reports
    fn name(&self) -> &str;

    /// Create one table per partition for `session`
    fn create_schema(&self, session: &str, partitions: usize) -> Result<(), StoreError>;

    fn write(
        &self,
        session: &str,
        coordinate: Coordinate,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError>;

    fn read(&self, session: &str, coordinate: Coordinate, key: &str)
        -> Result<String, StoreError>;
}

/// Open the driver selected by `config`
///
/// `reuse_session` opens the driver in permissive mode so that operations on
/// a session created by an earlier run are not rejected.
pub fn open(
    config: &StoreConfig,
    reuse_session: bool,
    seed: Option<u64>,
) -> Result<Arc<dyn DataStore>, StoreError> {
    match config.kind {
        StoreKind::Memory => {
            let store = memory::InMemoryStore::with_options(memory::MemoryStoreOptions {
                simulated_latency: Duration::from_micros(config.simulated_latency_us),
                failure_rate: config.failure_rate,
                permissive: reuse_session,
                seed,
            })?;
            Ok(Arc::new(store))
        }
    }
}
