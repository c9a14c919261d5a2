//! One-shot host performance benchmark: run the engine's built-in workload,
//! read its throughput, and classify the host into a performance tier.

use crate::cache::BenchmarkStore;
use engine::{EngineCommand, EngineConfig, EngineEvent, UciProcess};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;

/// Hard ceiling on one benchmark run. Past this the engine is presumed
/// stuck; it gets killed and the host is classified conservatively.
pub const BENCH_CEILING: Duration = Duration::from_secs(30);

const GRANDMASTER_NPS: u64 = 2_000_000;
const MASTER_NPS: u64 = 1_000_000;

/// Host performance class derived from search throughput.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    Grandmaster,
    Master,
    Club,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub enable_heavy_visuals: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub tier: Tier,
    pub nodes_per_second: u64,
    pub recommended_depth: u32,
    pub feature_flags: FeatureFlags,
}

impl BenchmarkResult {
    /// Classify a throughput figure. Thresholds are checked high to low;
    /// first match wins.
    pub fn from_nps(nodes_per_second: u64) -> Self {
        let (tier, recommended_depth) = if nodes_per_second >= GRANDMASTER_NPS {
            (Tier::Grandmaster, 24)
        } else if nodes_per_second >= MASTER_NPS {
            (Tier::Master, 20)
        } else {
            (Tier::Club, 16)
        };
        Self {
            tier,
            nodes_per_second,
            recommended_depth,
            feature_flags: FeatureFlags {
                enable_heavy_visuals: tier != Tier::Club,
            },
        }
    }

    /// Deterministic result for a benchmark that never produced a figure.
    pub fn fallback() -> Self {
        Self::from_nps(0)
    }
}

/// Runs the benchmark at most once per cache window, on a dedicated engine
/// instance outside of normal analysis traffic.
pub struct BenchmarkRunner {
    store: BenchmarkStore,
    engine_config: EngineConfig,
    ceiling: Duration,
    /// Serializes runs so concurrent callers share one measurement.
    running: Mutex<()>,
}

impl BenchmarkRunner {
    pub fn new(store: BenchmarkStore) -> Self {
        Self {
            store,
            engine_config: EngineConfig::default(),
            ceiling: BENCH_CEILING,
            running: Mutex::new(()),
        }
    }

    pub fn with_engine_config(mut self, config: EngineConfig) -> Self {
        self.engine_config = config;
        self
    }

    #[cfg(test)]
    fn with_ceiling(mut self, ceiling: Duration) -> Self {
        self.ceiling = ceiling;
        self
    }

    /// Return the cached result if it is fresh, measuring otherwise.
    /// Callers arriving while a measurement is in flight wait for it and
    /// pick up the value it persisted.
    pub async fn run(&self) -> BenchmarkResult {
        let _guard = self.running.lock().await;
        if let Some(result) = self.store.load_fresh() {
            tracing::debug!("Benchmark cache hit: {:?}", result.tier);
            return result;
        }

        let engine = UciProcess::start(self.engine_config.clone()).await;
        let result = measure(engine, self.ceiling).await;

        if let Err(e) = self.store.save(&result) {
            tracing::warn!("Failed to persist benchmark result: {}", e);
        }
        result
    }

    /// The persisted result, if fresh. Never triggers a measurement.
    pub fn cached(&self) -> Option<BenchmarkResult> {
        self.store.load_fresh()
    }

    /// Force the next [`run`](Self::run) to measure again.
    pub fn clear_cache(&self) -> Result<(), crate::cache::StoreError> {
        self.store.clear()
    }
}

/// Issue the benchmark workload and wait for its throughput line, under a
/// hard deadline. The engine is terminated on every path, stuck or not.
async fn measure(mut engine: UciProcess, ceiling: Duration) -> BenchmarkResult {
    if engine.is_faulted() {
        engine.shutdown().await;
        tracing::warn!("Engine faulted before benchmark; using fallback tier");
        return BenchmarkResult::fallback();
    }

    engine.send(EngineCommand::Bench).await;

    let nps = tokio::time::timeout(ceiling, async {
        while let Some(event) = engine.recv_event().await {
            match event {
                EngineEvent::Bench { nodes_per_second } => return Some(nodes_per_second),
                EngineEvent::Fault(reason) => {
                    tracing::warn!("Engine fault during benchmark: {}", reason);
                    return None;
                }
                _ => {}
            }
        }
        None
    })
    .await
    .ok()
    .flatten();

    engine.shutdown().await;

    match nps {
        Some(nodes_per_second) => {
            let result = BenchmarkResult::from_nps(nodes_per_second);
            tracing::info!(
                nodes_per_second,
                tier = ?result.tier,
                "Benchmark complete"
            );
            result
        }
        None => {
            tracing::warn!("Benchmark produced no throughput figure; using fallback tier");
            BenchmarkResult::fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::scripted_process;
    use engine::EngineState;

    #[test]
    fn tier_table_first_match_wins() {
        assert_eq!(BenchmarkResult::from_nps(2_100_000).tier, Tier::Grandmaster);
        assert_eq!(BenchmarkResult::from_nps(2_000_000).tier, Tier::Grandmaster);
        assert_eq!(BenchmarkResult::from_nps(1_000_000).tier, Tier::Master);
        assert_eq!(BenchmarkResult::from_nps(999_999).tier, Tier::Club);
        assert_eq!(BenchmarkResult::from_nps(0).tier, Tier::Club);
    }

    #[test]
    fn recommended_depth_follows_tier() {
        assert_eq!(BenchmarkResult::from_nps(2_000_000).recommended_depth, 24);
        assert_eq!(BenchmarkResult::from_nps(1_500_000).recommended_depth, 20);
        assert_eq!(BenchmarkResult::from_nps(400_000).recommended_depth, 16);
    }

    #[test]
    fn heavy_visuals_only_above_club() {
        assert!(BenchmarkResult::from_nps(2_000_000).feature_flags.enable_heavy_visuals);
        assert!(BenchmarkResult::from_nps(1_000_000).feature_flags.enable_heavy_visuals);
        assert!(!BenchmarkResult::from_nps(999_999).feature_flags.enable_heavy_visuals);
    }

    #[tokio::test]
    async fn measurement_reads_the_throughput_line() {
        let (engine, mut cmds, events) = scripted_process(EngineState::Ready);
        tokio::spawn(async move {
            while let Some(cmd) = cmds.recv().await {
                if let EngineCommand::Bench = cmd {
                    let _ = events
                        .send(EngineEvent::RawLine("Total time (ms) : 1250".to_string()))
                        .await;
                    let _ = events
                        .send(EngineEvent::Bench {
                            nodes_per_second: 2_100_000,
                        })
                        .await;
                }
            }
        });

        let result = measure(engine, Duration::from_secs(5)).await;
        assert_eq!(result.tier, Tier::Grandmaster);
        assert_eq!(result.nodes_per_second, 2_100_000);
    }

    #[tokio::test]
    async fn unresponsive_engine_falls_back_to_club() {
        let (engine, _cmds, _events) = scripted_process(EngineState::Ready);
        let result = measure(engine, Duration::from_millis(50)).await;
        assert_eq!(result, BenchmarkResult::fallback());
        assert_eq!(result.tier, Tier::Club);
        assert_eq!(result.recommended_depth, 16);
    }

    #[tokio::test]
    async fn faulted_engine_falls_back_to_club() {
        let (engine, _cmds, _events) = scripted_process(EngineState::Faulted);
        assert_eq!(engine.state(), EngineState::Faulted);
        let result = measure(engine, Duration::from_secs(5)).await;
        assert_eq!(result, BenchmarkResult::fallback());
    }

    #[tokio::test]
    async fn fresh_cache_short_circuits_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = BenchmarkStore::new(dir.path().to_path_buf());
        let expected = BenchmarkResult::from_nps(1_200_000);
        store.save(&expected).unwrap();

        // No engine binary gets involved on the cache-hit path, so this
        // resolves immediately even with the default ceiling.
        let runner = BenchmarkRunner::new(store).with_ceiling(Duration::from_millis(10));
        assert_eq!(runner.run().await, expected);
        assert_eq!(runner.cached(), Some(expected));
    }

    #[tokio::test]
    async fn clearing_the_cache_forgets_the_result() {
        let dir = tempfile::tempdir().unwrap();
        let store = BenchmarkStore::new(dir.path().to_path_buf());
        store.save(&BenchmarkResult::from_nps(1_200_000)).unwrap();

        let runner = BenchmarkRunner::new(store);
        assert!(runner.cached().is_some());
        runner.clear_cache().unwrap();
        assert!(runner.cached().is_none());
    }
}
