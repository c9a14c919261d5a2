//! Analysis surface over one engine process: request/response analysis
//! sessions, host performance benchmarking, and whole-game review.

pub mod bench;
pub mod cache;
pub mod config;
pub mod game;
pub mod session;

pub use bench::{BenchmarkResult, BenchmarkRunner, FeatureFlags, Tier};
pub use cache::{BenchmarkStore, CachedBenchmark, StoreError};
pub use game::review_game;
pub use session::AnalysisSession;

#[cfg(test)]
pub(crate) mod testutil;
