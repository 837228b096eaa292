//! Test utilities shared by the integration tests.
//!
//! Provides a temporary data directory with an opened store.

use qm_store::observability::tracing::init_test_tracing;
use qm_store::{Config, QueueStore};
use std::path::PathBuf;
use tempfile::TempDir;

/// Test fixture owning a temporary data directory and a store inside it.
///
/// The directory is removed when the fixture is dropped.
pub struct TestFixture {
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
    /// Configuration the store was opened with
    pub config: Config,
    pub store: QueueStore,
}

impl TestFixture {
    /// Create a fixture with a fresh database in namespace `test`.
    pub fn new() -> Self {
        init_test_tracing();
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let config = Config {
            pool_size: 8,
            busy_timeout_ms: 10_000,
            connection_timeout_ms: 5_000,
            ..Config::new(temp_dir.path(), "test")
        };
        let store = QueueStore::open(&config).expect("failed to open store");
        Self {
            temp_dir,
            config,
            store,
        }
    }

    /// Path to the database file.
    #[allow(dead_code)]
    pub fn db_path(&self) -> PathBuf {
        self.config.db_path()
    }

    /// Open a second, independent store on the same file.
    #[allow(dead_code)]
    pub fn reopen(&self) -> QueueStore {
        QueueStore::open(&self.config).expect("failed to reopen store")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
