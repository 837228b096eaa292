//! Connection pool handing one private handle to each concurrent context.
//!
//! Uses r2d2 with r2d2_sqlite. Every physical connection gets the WAL
//! pragmas once, when it is opened; a checked-out [`QueueConn`] belongs to a
//! single context until it is dropped and returned.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::conn::QueueConn;
use super::schema::apply_pragmas;
use crate::config::Config;
use crate::error::{Result, StoreError};

fn open_flags() -> OpenFlags {
    OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX
}

/// Pool of configured connections to one database file.
#[derive(Clone)]
pub struct ConnectionManager {
    pool: Pool<SqliteConnectionManager>,
    path: PathBuf,
}

impl ConnectionManager {
    /// Open the pool for the file derived from `config`.
    ///
    /// Creates the data directory if needed and opens one connection eagerly
    /// so an unusable path or a file that is not a database fails here, once,
    /// rather than on first use. Further connections are opened lazily up to
    /// `pool_size`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StorageUnavailable`] if the directory or file
    /// cannot be opened.
    pub fn open(config: &Config) -> Result<Self> {
        let path = config.db_path();
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| StoreError::StorageUnavailable {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        }

        // r2d2 retries a failing connection until the checkout timeout runs
        // out; open one directly first so a bad file fails immediately.
        Connection::open_with_flags(&path, open_flags())
            .and_then(|conn| apply_pragmas(&conn, config.busy_timeout()))
            .map_err(|e| StoreError::StorageUnavailable {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        let manager = SqliteConnectionManager::file(&path).with_flags(open_flags());

        let pool = Pool::builder()
            .max_size(config.pool_size.max(1))
            .min_idle(Some(1))
            .connection_timeout(config.connection_timeout())
            .connection_customizer(Box::new(QueueConnectionCustomizer {
                busy_timeout: config.busy_timeout(),
            }))
            .build(manager)
            .map_err(|e| StoreError::StorageUnavailable {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        tracing::info!(
            path = %path.display(),
            pool_size = config.pool_size,
            "Opened queue database"
        );

        Ok(Self { pool, path })
    }

    /// Check out the calling context's handle.
    ///
    /// Blocks until a connection is free (bounded by the configured
    /// connection timeout). The handle returns to the pool on drop.
    pub fn get_connection(&self) -> Result<QueueConn> {
        Ok(QueueConn::new(self.pool.get()?))
    }

    /// Path of the underlying database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the current pool state for monitoring.
    pub fn state(&self) -> r2d2::State {
        self.pool.state()
    }
}

/// Connection customizer that applies the queue pragmas.
#[derive(Debug)]
struct QueueConnectionCustomizer {
    busy_timeout: Duration,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error>
    for QueueConnectionCustomizer
{
    fn on_acquire(
        &self,
        conn: &mut Connection,
    ) -> std::result::Result<(), rusqlite::Error> {
        apply_pragmas(conn, self.busy_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::journal_mode;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Instant;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> Config {
        Config {
            pool_size: 4,
            connection_timeout_ms: 2000,
            ..Config::new(temp_dir.path().join("data"), "test")
        }
    }

    #[test]
    fn test_open_creates_directory_and_file() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConnectionManager::open(&test_config(&temp_dir)).unwrap();

        assert!(manager.path().ends_with("data/qm-queue_test.db"));
        assert!(manager.path().exists());
    }

    #[test]
    fn test_connections_use_wal() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConnectionManager::open(&test_config(&temp_dir)).unwrap();

        let conn = manager.get_connection().unwrap();
        assert_eq!(journal_mode(conn.connection()).unwrap(), "wal");
    }

    #[test]
    fn test_held_handles_are_distinct() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConnectionManager::open(&test_config(&temp_dir)).unwrap();

        let first = manager.get_connection().unwrap();
        let second = manager.get_connection().unwrap();
        let third = manager.get_connection().unwrap();

        let state = manager.state();
        assert_eq!(state.connections, 3);
        assert_eq!(state.idle_connections, 0);

        drop((first, second, third));
        assert_eq!(manager.state().idle_connections, 3);
    }

    #[test]
    fn test_handles_are_usable_from_many_threads() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConnectionManager::open(&test_config(&temp_dir)).unwrap();
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let manager = manager.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let conn = manager.get_connection().unwrap();
                    barrier.wait();
                    journal_mode(conn.connection()).unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), "wal");
        }
    }

    #[test]
    fn test_corrupt_file_fails_without_waiting() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            connection_timeout_ms: 30_000,
            ..Config::new(temp_dir.path(), "bad")
        };
        fs::write(config.db_path(), vec![b'x'; 8 * 1024]).unwrap();

        let started = Instant::now();
        let err = ConnectionManager::open(&config).err().unwrap();

        assert!(err.is_storage_unavailable(), "unexpected error: {err}");
        assert!(
            started.elapsed() < Duration::from_secs(5),
            "open took {:?}",
            started.elapsed()
        );
    }

    #[test]
    fn test_unopenable_path_is_storage_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file where the data directory should be.
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();

        let config = Config {
            connection_timeout_ms: 200,
            ..Config::new(&blocker, "test")
        };
        let err = ConnectionManager::open(&config).err().unwrap();
        assert!(err.is_storage_unavailable(), "unexpected error: {err}");
    }
}
