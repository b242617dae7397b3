//! Persisted record set served over the socket transport.
//!
//! The on-disk document is `{"uuid_list": ["...", ...]}`, read from a fixed
//! relative path. The record server answers the `get` verb from an in-memory
//! copy of this set.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ScourError, ScourResult};

/// Highest index the `get` verb will serve.
pub const MAX_RECORD_INDEX: usize = 15;

/// Record file location, relative to the working directory.
pub const DEFAULT_RECORDS_PATH: &str = "sock/uuid.json";

/// Number of records seeded when the record file is absent.
pub const SEED_COUNT: usize = 16;

/// An ordered set of record identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    #[serde(rename = "uuid_list")]
    records: Vec<String>,
}

impl RecordSet {
    /// Read and parse the record document at `path`.
    pub fn load(path: &Path) -> ScourResult<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Load `path`, seeding it with `count` fresh records when absent.
    pub fn load_or_seed(path: &Path, count: usize) -> ScourResult<Self> {
        if path.exists() {
            return Self::load(path);
        }
        let set = Self::seed(count);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_vec_pretty(&set)?)?;
        tracing::info!(path = %path.display(), count, "seeded record file");
        Ok(set)
    }

    /// A fresh set of `count` v4 UUIDs.
    pub fn seed(count: usize) -> Self {
        Self {
            records: (0..count).map(|_| uuid::Uuid::new_v4().to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record at `index`, bounded by both the serving range (0–15) and the
    /// list length.
    pub fn get(&self, index: usize) -> ScourResult<&str> {
        if index > MAX_RECORD_INDEX || index >= self.records.len() {
            return Err(ScourError::RecordIndexOutOfRange(index));
        }
        Ok(&self.records[index])
    }

    /// All records, newline-joined.
    pub fn flatten(&self) -> Vec<u8> {
        self.records.join("\n").into_bytes()
    }
}
