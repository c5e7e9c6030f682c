//! Session context
//!
//! Everything a run shares between workers lives here: the session name, the
//! corpus, the availability index, the store driver and the two metric
//! streams. Workers borrow the session; nothing is global.

use crate::corpus::index::AvailabilityIndex;
use crate::corpus::Corpus;
use crate::stats::{OperationStats, StatsError};
use crate::store::{DataStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Bucket layout shared by both metric streams
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsLayout {
    pub histogram_max: Duration,
    pub buckets: usize,
}

impl Default for StatsLayout {
    fn default() -> Self {
        Self {
            histogram_max: Duration::from_millis(10),
            buckets: 20,
        }
    }
}

pub struct Session {
    name: String,
    reused: bool,
    verify: bool,
    corpus: Corpus,
    index: AvailabilityIndex,
    store: Arc<dyn DataStore>,
    reads: OperationStats,
    writes: OperationStats,
}

impl Session {
    pub fn new(
        name: impl Into<String>,
        corpus: Corpus,
        index: AvailabilityIndex,
        store: Arc<dyn DataStore>,
        layout: StatsLayout,
    ) -> Result<Self, StatsError> {
        Ok(Self {
            name: name.into(),
            reused: false,
            verify: true,
            corpus,
            index,
            store,
            reads: OperationStats::new("read", layout.histogram_max, layout.buckets)?,
            writes: OperationStats::new("write", layout.histogram_max, layout.buckets)?,
        })
    }

    /// Mark the session as created by an earlier run
    pub fn reused(mut self, reused: bool) -> Self {
        self.reused = reused;
        self
    }

    /// Compare read values with the corpus (on by default)
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_reused(&self) -> bool {
        self.reused
    }

    pub fn verifies(&self) -> bool {
        self.verify
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn index(&self) -> &AvailabilityIndex {
        &self.index
    }

    pub fn store(&self) -> &dyn DataStore {
        self.store.as_ref()
    }

    pub fn reads(&self) -> &OperationStats {
        &self.reads
    }

    pub fn writes(&self) -> &OperationStats {
        &self.writes
    }

    /// Create one table per partition unless the session is reused
    pub fn prepare(&self) -> Result<(), StoreError> {
        if self.reused {
            info!(session = %self.name, "reusing existing session, schema left untouched");
            return Ok(());
        }
        self.store
            .create_schema(&self.name, self.corpus.partitions())?;
        info!(
            session = %self.name,
            partitions = self.corpus.partitions(),
            store = self.store.name(),
            "schema created"
        );
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.name)
            .field("reused", &self.reused)
            .field("verify", &self.verify)
            .field("partitions", &self.corpus.partitions())
            .field("records", &self.corpus.len())
            .field("store", &self.store.name())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::corpus::CorpusShape;
    use crate::store::memory::InMemoryStore;

    /// Small seeded session over a fresh in-memory store
    pub(crate) fn session_with(
        partitions: usize,
        records: usize,
    ) -> (Session, Arc<InMemoryStore>) {
        let corpus = Corpus::generate(&CorpusShape {
            partitions,
            records_per_partition: records,
            key_size: 16,
            data_size: 32,
            seed: Some(17),
        })
        .unwrap();
        let store = Arc::new(InMemoryStore::new());
        let session = Session::new(
            "TESTSESSN1",
            corpus,
            AvailabilityIndex::new(),
            store.clone(),
            StatsLayout::default(),
        )
        .unwrap();
        (session, store)
    }

    #[test]
    fn test_prepare_creates_schema() {
        let (session, store) = session_with(2, 4);
        session.prepare().unwrap();

        let record = session.corpus().partition(1)[0].clone();
        let at = crate::corpus::Coordinate::new(1, 0);
        store.write(session.name(), at, &record.key, &record.value).unwrap();
    }

    #[test]
    fn test_reused_session_skips_schema() {
        let (session, store) = session_with(1, 1);
        let session = session.reused(true);
        session.prepare().unwrap();

        let at = crate::corpus::Coordinate::new(0, 0);
        assert!(matches!(
            store.write(session.name(), at, "k", "v"),
            Err(StoreError::UnknownSession { .. })
        ));
    }

    #[test]
    fn test_builder_flags() {
        let (session, _) = session_with(1, 1);
        assert!(session.verifies());
        assert!(!session.is_reused());

        let session = session.verify(false);
        assert!(!session.verifies());
        assert_eq!(session.reads().name(), "read");
        assert_eq!(session.writes().name(), "write");
        assert!(format!("{:?}", session).contains("TESTSESSN1"));
    }

    #[test]
    fn test_invalid_layout() {
        let (session, store) = session_with(1, 1);
        let corpus = session.corpus().clone();
        let layout = StatsLayout {
            histogram_max: Duration::from_nanos(1),
            buckets: 4,
        };
        assert!(Session::new("X", corpus, AvailabilityIndex::new(), store, layout).is_err());
    }
}
