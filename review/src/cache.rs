//! Persistence for the benchmark result: one JSON record in the data
//! directory, valid for seven days.

use crate::bench::BenchmarkResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A cached benchmark is considered stale after this long.
pub const CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const CACHE_FILE: &str = "benchmark.json";

/// The persisted record: the result plus its creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedBenchmark {
    #[serde(flatten)]
    pub result: BenchmarkResult,
    /// Unix seconds at creation.
    pub timestamp: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// File-backed store for the single benchmark record. Constructed once and
/// injected into whoever needs it; nothing reads ambient global state.
pub struct BenchmarkStore {
    path: PathBuf,
}

impl BenchmarkStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            path: data_dir.join(CACHE_FILE),
        }
    }

    /// Load the record regardless of age. Unreadable or unparsable files
    /// count as absent.
    pub fn load(&self) -> Option<CachedBenchmark> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read benchmark cache {:?}: {}", self.path, e);
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Discarding corrupt benchmark cache: {}", e);
                None
            }
        }
    }

    /// Load the result only if it is younger than [`CACHE_TTL`].
    pub fn load_fresh(&self) -> Option<BenchmarkResult> {
        let record = self.load()?;
        let age = unix_now().saturating_sub(record.timestamp);
        if age < CACHE_TTL.as_secs() {
            Some(record.result)
        } else {
            tracing::debug!("Benchmark cache is {} seconds old; stale", age);
            None
        }
    }

    /// Persist a fresh result, stamped with the current time.
    pub fn save(&self, result: &BenchmarkResult) -> Result<(), StoreError> {
        self.save_record(&CachedBenchmark {
            result: result.clone(),
            timestamp: unix_now(),
        })
    }

    fn save_record(&self, record: &CachedBenchmark) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    /// Drop the record; the next benchmark run will recompute.
    pub fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::Tier;

    fn sample_result() -> BenchmarkResult {
        BenchmarkResult::from_nps(1_500_000)
    }

    #[test]
    fn missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = BenchmarkStore::new(dir.path().to_path_buf());
        assert!(store.load().is_none());
        assert!(store.load_fresh().is_none());
    }

    #[test]
    fn save_then_load_fresh_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = BenchmarkStore::new(dir.path().to_path_buf());
        store.save(&sample_result()).unwrap();
        let loaded = store.load_fresh().unwrap();
        assert_eq!(loaded, sample_result());
        assert_eq!(loaded.tier, Tier::Master);
    }

    #[test]
    fn stale_record_is_not_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let store = BenchmarkStore::new(dir.path().to_path_buf());
        store
            .save_record(&CachedBenchmark {
                result: sample_result(),
                timestamp: unix_now() - CACHE_TTL.as_secs() - 1,
            })
            .unwrap();
        assert!(store.load().is_some());
        assert!(store.load_fresh().is_none());
    }

    #[test]
    fn clear_removes_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = BenchmarkStore::new(dir.path().to_path_buf());
        store.save(&sample_result()).unwrap();
        store.clear().unwrap();
        assert!(store.load().is_none());
        // Clearing an empty store is fine.
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_record_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let store = BenchmarkStore::new(dir.path().to_path_buf());
        std::fs::write(dir.path().join("benchmark.json"), "not json").unwrap();
        assert!(store.load().is_none());
    }
}
