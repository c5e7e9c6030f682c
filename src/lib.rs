//! dbpulse - data store load generator
//!
//! dbpulse drives a key/value data store with a deterministic synthetic corpus
//! and measures how long every read and write takes.
//!
//! # Architecture
//!
//! - **Corpus**: partitions of generated (or loaded) key/value records
//! - **Stores**: drivers behind the [`store::DataStore`] trait
//! - **Workers**: time-bounded TPS workers and bounded test cycles
//! - **Statistics**: streaming mean/variance, fixed-bucket latency tables and
//!   percentiles for each operation kind

pub mod config;
pub mod coordinator;
pub mod corpus;
pub mod output;
pub mod session;
pub mod stats;
pub mod store;
pub mod util;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use session::Session;
pub use store::DataStore;

/// Result type used throughout dbpulse
pub type Result<T> = anyhow::Result<T>;
