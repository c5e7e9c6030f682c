//! Synthetic data corpus
//!
//! A corpus is a grid of `partitions x records` key/value pairs generated once
//! per session and shared read-only by every worker. Each record is addressed
//! by a [`Coordinate`].
//!
//! Keys are unique: they start with `"{partition}.{offset}."` and are padded
//! with random characters up to the configured key size. Values are random
//! strings drawn from an alphabet that never contains `:`, which key/value
//! stores reserve as a namespace separator.

pub mod index;
pub mod pattern;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Characters used for keys and values (no `:`)
pub const VALUE_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890!@#$%^&*()=+-;~/?<>[]{}_";

/// Characters used for generated session names
pub const SESSION_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ123456789";

pub const SESSION_NAME_LEN: usize = 10;

/// Position of one record in the corpus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub partition: usize,
    pub offset: usize,
}

impl Coordinate {
    pub fn new(partition: usize, offset: usize) -> Self {
        Self { partition, offset }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.partition, self.offset)
    }
}

/// One key/value pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    pub value: String,
}

/// Errors raised while generating or loading a corpus
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("key size {key_size} is shorter than the unique prefix {prefix:?}")]
    KeyTooShort { key_size: usize, prefix: String },

    #[error("corpus needs at least one partition and one record per partition")]
    Empty,

    #[error("pattern file {path} contains no records")]
    EmptyPattern { path: PathBuf },

    #[error("failed to access pattern file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse pattern file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Shape of a generated corpus
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusShape {
    pub partitions: usize,
    pub records_per_partition: usize,
    pub key_size: usize,
    pub data_size: usize,
    /// Reproducible generation when set
    pub seed: Option<u64>,
}

impl CorpusShape {
    /// Length of the longest unique key prefix this shape produces
    pub fn longest_prefix(&self) -> usize {
        unique_prefix(
            self.partitions.saturating_sub(1),
            self.records_per_partition.saturating_sub(1),
        )
        .len()
    }
}

/// Read-only record grid indexed by partition then offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corpus {
    partitions: Vec<Vec<Record>>,
}

impl Corpus {
    /// Generate random records, one rayon task per partition
    pub fn generate(shape: &CorpusShape) -> Result<Self, CorpusError> {
        if shape.partitions == 0 || shape.records_per_partition == 0 {
            return Err(CorpusError::Empty);
        }
        let longest = unique_prefix(shape.partitions - 1, shape.records_per_partition - 1);
        if longest.len() > shape.key_size {
            return Err(CorpusError::KeyTooShort {
                key_size: shape.key_size,
                prefix: longest,
            });
        }

        let partitions = (0..shape.partitions)
            .into_par_iter()
            .map(|partition| {
                let mut rng = partition_rng(shape.seed, partition);
                (0..shape.records_per_partition)
                    .map(|offset| {
                        let prefix = unique_prefix(partition, offset);
                        let padding = shape.key_size - prefix.len();
                        Record {
                            key: prefix + &random_string(&mut rng, VALUE_ALPHABET, padding),
                            value: random_string(&mut rng, VALUE_ALPHABET, shape.data_size),
                        }
                    })
                    .collect()
            })
            .collect();

        Ok(Self { partitions })
    }

    /// Build a corpus from already materialized partitions
    pub fn from_partitions(partitions: Vec<Vec<Record>>) -> Result<Self, CorpusError> {
        if partitions.is_empty() || partitions.iter().any(Vec::is_empty) {
            return Err(CorpusError::Empty);
        }
        Ok(Self { partitions })
    }

    pub fn partitions(&self) -> usize {
        self.partitions.len()
    }

    pub fn partition_len(&self, partition: usize) -> usize {
        self.partitions.get(partition).map_or(0, Vec::len)
    }

    /// Total number of records across all partitions
    pub fn len(&self) -> usize {
        self.partitions.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, coordinate: Coordinate) -> Option<&Record> {
        self.partitions
            .get(coordinate.partition)?
            .get(coordinate.offset)
    }

    pub fn partition(&self, partition: usize) -> &[Record] {
        self.partitions
            .get(partition)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every coordinate in partition-major order
    pub fn coordinates(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.partitions
            .iter()
            .enumerate()
            .flat_map(|(p, records)| (0..records.len()).map(move |o| Coordinate::new(p, o)))
    }
}

/// Random session name of [`SESSION_NAME_LEN`] characters
pub fn session_name<R: Rng>(rng: &mut R) -> String {
    random_string(rng, SESSION_ALPHABET, SESSION_NAME_LEN)
}

fn unique_prefix(partition: usize, offset: usize) -> String {
    format!("{}.{}.", partition, offset)
}

fn partition_rng(seed: Option<u64>, partition: usize) -> Xoshiro256PlusPlus {
    match seed {
        Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed.wrapping_add(partition as u64)),
        None => Xoshiro256PlusPlus::from_entropy(),
    }
}

fn random_string<R: Rng>(rng: &mut R, alphabet: &[u8], len: usize) -> String {
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}
