//! Configuration for the analysis surface.
//!
//! Data directory precedence:
//! 1. REVIEW_DATA_DIR environment variable
//! 2. ~/.config/review/data (production default)
//! 3. ./data (fallback for development)
//!
//! The engine binary can be overridden with REVIEW_ENGINE_PATH (consumed by
//! the engine crate's spawn path).

use std::path::PathBuf;

const DEFAULT_CONFIG_DIR: &str = ".config/review/data";
const DEV_DATA_DIR: &str = "./data";

/// Get the data directory for persisted state (the benchmark cache).
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("REVIEW_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(DEFAULT_CONFIG_DIR);
    }

    PathBuf::from(DEV_DATA_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_is_never_empty() {
        // Whichever precedence level applies in the test environment, the
        // result is a usable path.
        assert!(!data_dir().as_os_str().is_empty());
    }
}
