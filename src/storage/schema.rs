//! Schema definition and per-connection pragmas.
//!
//! Tables:
//! - `queue`: one row per submitted prompt
//! - `options`: process-wide key/value state
//!
//! Both tables carry an `updated_at` column that a trigger refreshes on any
//! update that does not set it explicitly.
//!
//! `queue.status` accepts -2..=3: the four lifecycle states plus the two
//! reserved values (-1 error, -2 bin) that [`QueueStatus`] does not decode
//! yet. Giving them meaning later needs no table rebuild.
//!
//! [`QueueStatus`]: crate::QueueStatus

use rusqlite::Connection;
use std::time::Duration;

use crate::error::{Result, StoreError};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS queue (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    prompt_id   VARCHAR(255) NOT NULL UNIQUE,
    created_at  DATETIME DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    updated_at  DATETIME DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    number      INTEGER,
    name        TEXT,
    workflow_id VARCHAR(255),
    prompt      TEXT,
    status      INTEGER DEFAULT 0 CHECK (status BETWEEN -2 AND 3)
);

CREATE TABLE IF NOT EXISTS options (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    key        TEXT NOT NULL UNIQUE,
    value      TEXT,
    updated_at DATETIME DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_queue_status_number
    ON queue(status, number);

-- Fires only when the caller left updated_at untouched. The new value is
-- at least one millisecond past the old one, so updates that land within
-- the same clock tick still move it forward.
CREATE TRIGGER IF NOT EXISTS queue_set_updated_at
AFTER UPDATE ON queue
FOR EACH ROW
WHEN NEW.updated_at IS OLD.updated_at
BEGIN
    UPDATE queue
    SET    updated_at = max(
               strftime('%Y-%m-%d %H:%M:%f', 'now'),
               coalesce(strftime('%Y-%m-%d %H:%M:%f', OLD.updated_at, '+0.001 seconds'), '')
           )
    WHERE  rowid = NEW.rowid;
END;

CREATE TRIGGER IF NOT EXISTS options_set_updated_at
AFTER UPDATE ON options
FOR EACH ROW
WHEN NEW.updated_at IS OLD.updated_at
BEGIN
    UPDATE options
    SET    updated_at = max(
               strftime('%Y-%m-%d %H:%M:%f', 'now'),
               coalesce(strftime('%Y-%m-%d %H:%M:%f', OLD.updated_at, '+0.001 seconds'), '')
           )
    WHERE  rowid = NEW.rowid;
END;
"#;

/// Apply the pragmas every queue connection runs with.
///
/// - `busy_timeout` first, so the WAL switch below waits on a racing opener
/// - `journal_mode = WAL`: readers never block on the writer
/// - `synchronous = NORMAL`: WAL keeps the file consistent; only the last
///   commit may be lost on power failure
/// - `recursive_triggers = OFF`: the `updated_at` triggers must not re-fire
pub fn apply_pragmas(conn: &Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA recursive_triggers = OFF;",
    )
}

/// Create tables, index and triggers if they do not exist yet.
///
/// Safe to call on every start.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL).map_err(StoreError::Schema)?;
    tracing::debug!("Queue schema ensured");
    Ok(())
}

/// Current journal mode of a connection (`"wal"` once pragmas are applied).
pub fn journal_mode(conn: &Connection) -> rusqlite::Result<String> {
    conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))
}
