// SPDX-License-Identifier: GPL-3.0-only
use tempfile::TempDir;

use crate::config::{Config, ReadinessConfig};
use crate::store::SqliteContentStore;

/// Create a file-backed SQLite store in a fresh temp dir. Keep the dir alive.
pub async fn setup_test_store() -> (SqliteContentStore, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let store = SqliteContentStore::new(&dir.path().join("content.db"))
        .await
        .expect("Failed to open test store");
    (store, dir)
}

/// Readiness policy that polls quickly and gives up fast
pub fn fast_readiness() -> ReadinessConfig {
    ReadinessConfig {
        initial_backoff_ms: 1,
        max_backoff_ms: 5,
        timeout_secs: 2,
    }
}

/// Create a test configuration pointing at a mock Medusa server
pub fn create_test_config(medusa_url: &str) -> Config {
    Config {
        medusa_backend_url: medusa_url.to_string(),
        signal_secret: Some("test-secret".to_string()),
        sync_interval_secs: 0,
        readiness: fast_readiness(),
        log_level: "error".to_string(), // Reduce log noise in tests
        ..Config::default()
    }
}
