//! Stored pattern files
//!
//! A pattern file holds one partition of a previously generated corpus as a
//! JSON array of `{"key": ..., "value": ...}` objects. Loading a set of files
//! rebuilds the corpus in file order and registers every record as available,
//! since a stored corpus is assumed to already be present in the store.

use super::index::AvailabilityIndex;
use super::{Corpus, CorpusError, Record};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Load one partition per file
pub fn load_patterns<P: AsRef<Path>>(
    paths: &[P],
) -> Result<(Corpus, AvailabilityIndex), CorpusError> {
    let mut partitions = Vec::with_capacity(paths.len());

    for path in paths {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let records: Vec<Record> =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| CorpusError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        if records.is_empty() {
            return Err(CorpusError::EmptyPattern {
                path: path.to_path_buf(),
            });
        }

        debug!(path = %path.display(), records = records.len(), "loaded pattern file");
        partitions.push(records);
    }

    let corpus = Corpus::from_partitions(partitions)?;
    let index = AvailabilityIndex::from_coordinates(corpus.coordinates());
    info!(
        partitions = corpus.partitions(),
        records = corpus.len(),
        "stored patterns loaded"
    );
    Ok((corpus, index))
}

/// Write every partition of `corpus` to `dir/partition-{n}.json`
pub fn export_patterns(corpus: &Corpus, dir: &Path) -> Result<Vec<PathBuf>, CorpusError> {
    fs::create_dir_all(dir).map_err(|source| CorpusError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(corpus.partitions());
    for partition in 0..corpus.partitions() {
        let path = dir.join(format!("partition-{}.json", partition));
        let file = File::create(&path).map_err(|source| CorpusError::Io {
            path: path.clone(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, corpus.partition(partition)).map_err(|source| {
            CorpusError::Parse {
                path: path.clone(),
                source,
            }
        })?;
        writer.flush().map_err(|source| CorpusError::Io {
            path: path.clone(),
            source,
        })?;
        written.push(path);
    }

    info!(dir = %dir.display(), files = written.len(), "patterns exported");
    Ok(written)
}
