//! Configuration for the queue store.
//!
//! Supports:
//! - CLI arguments via clap
//! - Environment variable overrides
//! - Defaults that need no setup (`./data/qm-queue_default.db`)

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Namespace used when the host does not supply one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// qm-store: durable prompt queue backed by SQLite.
#[derive(Parser, Debug, Clone)]
#[command(name = "qm-store")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Namespace for the database file (e.g. the service port)
    #[arg(short, long, env = "QM_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Data directory for the SQLite database
    #[arg(short, long, env = "QM_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Maximum number of pooled connections (one per concurrent context)
    #[arg(long, env = "QM_POOL_SIZE", default_value_t = 8)]
    pub pool_size: u32,

    /// How long a writer waits on a locked database before failing
    #[arg(long, env = "QM_BUSY_TIMEOUT_MS", default_value_t = 5000)]
    pub busy_timeout_ms: u32,

    /// How long a checkout waits for a free connection
    #[arg(long, env = "QM_CONNECTION_TIMEOUT_MS", default_value_t = 30_000)]
    pub connection_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Configuration rooted at `data_dir` with the given namespace.
    pub fn new(data_dir: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Path of the database file: `<data_dir>/qm-queue_<namespace>.db`.
    ///
    /// An empty namespace falls back to [`DEFAULT_NAMESPACE`] so two
    /// unconfigured instances still agree on one file.
    pub fn db_path(&self) -> PathBuf {
        let namespace = match self.namespace.trim() {
            "" => DEFAULT_NAMESPACE,
            ns => ns,
        };
        self.data_dir.join(format!("qm-queue_{namespace}.db"))
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.busy_timeout_ms))
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.into(),
            data_dir: PathBuf::from("./data"),
            pool_size: 8,
            busy_timeout_ms: 5000,
            connection_timeout_ms: 30_000,
            log_level: "info".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.namespace, "default");
        assert_eq!(config.pool_size, 8);
        assert_eq!(config.db_path(), PathBuf::from("./data/qm-queue_default.db"));
    }

    #[test]
    fn test_db_path_uses_namespace() {
        let config = Config::new("/var/lib/qm", "8188");
        assert_eq!(config.db_path(), PathBuf::from("/var/lib/qm/qm-queue_8188.db"));
    }

    #[test]
    fn test_blank_namespace_falls_back_to_default() {
        let config = Config::new("/tmp", "  ");
        assert_eq!(config.db_path(), PathBuf::from("/tmp/qm-queue_default.db"));
    }

    #[test]
    fn test_parse_from_args() {
        let config = Config::parse_from([
            "qm-store",
            "--namespace",
            "8190",
            "--data-dir",
            "/srv/qm",
            "--pool-size",
            "2",
        ]);
        assert_eq!(config.pool_size, 2);
        assert_eq!(config.db_path(), PathBuf::from("/srv/qm/qm-queue_8190.db"));
    }
}
