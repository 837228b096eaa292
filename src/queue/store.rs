//! Queue operations composed from the storage primitives.
//!
//! Each method checks out a connection, runs one statement (or one batch)
//! and returns it to the pool. Status semantics live in
//! [`QueueStatus`]; nothing here forbids an out-of-order transition.

use rusqlite::params;

use super::item::{NewQueueItem, OptionEntry, QueueItem, StatusCounts};
use super::status::QueueStatus;
use crate::config::Config;
use crate::error::Result;
use crate::storage::{ConnectionManager, QueueConn};

const INSERT_ITEM: &str = "INSERT INTO queue (prompt_id, number, name, workflow_id, prompt, status)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const SELECT_BY_PROMPT_ID: &str = "SELECT id, prompt_id, created_at, updated_at, number, name, workflow_id, prompt, status
     FROM queue WHERE prompt_id = ?1";

const SELECT_BY_ID: &str = "SELECT id, prompt_id, created_at, updated_at, number, name, workflow_id, prompt, status
     FROM queue WHERE id = ?1";

// Served by idx_queue_status_number; id breaks ties between equal numbers.
const SELECT_BY_STATUS: &str = "SELECT id, prompt_id, created_at, updated_at, number, name, workflow_id, prompt, status
     FROM queue WHERE status = ?1 ORDER BY number ASC, id ASC";

const SELECT_NEXT_BY_STATUS: &str = "SELECT id, prompt_id, created_at, updated_at, number, name, workflow_id, prompt, status
     FROM queue WHERE status = ?1 ORDER BY number ASC, id ASC LIMIT 1";

const UPDATE_STATUS_BY_PROMPT_ID: &str = "UPDATE queue SET status = ?1 WHERE prompt_id = ?2";

const UPDATE_STATUS_BY_ID: &str = "UPDATE queue SET status = ?1 WHERE id = ?2 AND status = ?3";

const UPDATE_PROMPT: &str = "UPDATE queue SET prompt = ?1 WHERE prompt_id = ?2";

const UPDATE_ALL_STATUS: &str = "UPDATE queue SET status = ?1 WHERE status = ?2";

const COUNT_BY_STATUS: &str = "SELECT status, COUNT(*) FROM queue GROUP BY status";

const MAX_NUMBER: &str = "SELECT MAX(number) FROM queue";

const DELETE_ITEM: &str = "DELETE FROM queue WHERE prompt_id = ?1";

const SELECT_OPTION: &str = "SELECT id, key, value, updated_at FROM options WHERE key = ?1";

const UPSERT_OPTION: &str = "INSERT INTO options (key, value) VALUES (?1, ?2)
     ON CONFLICT(key) DO UPDATE SET value = excluded.value";

/// Durable prompt queue.
///
/// Cheap to clone; clones share one connection pool and may be used from
/// any number of threads.
#[derive(Clone)]
pub struct QueueStore {
    manager: ConnectionManager,
}

impl QueueStore {
    /// Open the database for `config` and make sure the schema exists.
    ///
    /// # Errors
    ///
    /// [`StoreError::StorageUnavailable`](crate::StoreError::StorageUnavailable)
    /// if the file cannot be opened, [`StoreError::Schema`](crate::StoreError::Schema)
    /// if an existing file has an incompatible schema.
    pub fn open(config: &Config) -> Result<Self> {
        let store = Self::with_manager(ConnectionManager::open(config)?);
        store.init_schema()?;
        Ok(store)
    }

    /// Wrap an existing pool without touching the schema.
    pub fn with_manager(manager: ConnectionManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    /// Check out a handle for composing primitives directly.
    pub fn connection(&self) -> Result<QueueConn> {
        self.manager.get_connection()
    }

    /// Idempotently create tables, index and triggers.
    pub fn init_schema(&self) -> Result<()> {
        self.connection()?.init_schema()?;
        tracing::info!(path = %self.manager.path().display(), "Queue schema ready");
        Ok(())
    }

    /// Insert one item and return its assigned id.
    ///
    /// A `prompt_id` that already exists is rejected with
    /// [`StoreError::ConstraintViolation`](crate::StoreError::ConstraintViolation)
    /// and leaves the stored row untouched.
    pub fn enqueue(&self, item: &NewQueueItem) -> Result<i64> {
        let mut conn = self.connection()?;
        conn.write_one(
            INSERT_ITEM,
            params![
                item.prompt_id,
                item.number,
                item.name,
                item.workflow_id,
                item.prompt,
                item.status,
            ],
            true,
        )?;
        let id = conn.connection().last_insert_rowid();
        tracing::debug!(prompt_id = %item.prompt_id, id, "Enqueued prompt");
        Ok(id)
    }

    /// Insert every item atomically; returns the number inserted.
    pub fn enqueue_many(&self, items: &[NewQueueItem]) -> Result<usize> {
        let mut conn = self.connection()?;
        let inserted = conn.write_batch(
            INSERT_ITEM,
            items.iter().map(|item| {
                (
                    item.prompt_id.as_str(),
                    item.number,
                    item.name.as_deref(),
                    item.workflow_id.as_deref(),
                    item.prompt.as_deref(),
                    item.status,
                )
            }),
        )?;
        tracing::debug!(inserted, "Enqueued prompt batch");
        Ok(inserted)
    }

    pub fn get(&self, prompt_id: &str) -> Result<Option<QueueItem>> {
        self.connection()?
            .read_one(SELECT_BY_PROMPT_ID, [prompt_id], QueueItem::from_row)
    }

    pub fn get_by_id(&self, id: i64) -> Result<Option<QueueItem>> {
        self.connection()?
            .read_one(SELECT_BY_ID, [id], QueueItem::from_row)
    }

    /// Items with `status`, in ascending submission number.
    pub fn list(&self, status: QueueStatus) -> Result<Vec<QueueItem>> {
        self.connection()?
            .read_many(SELECT_BY_STATUS, [status], QueueItem::from_row)
    }

    /// First item with `status` in submission order.
    pub fn next(&self, status: QueueStatus) -> Result<Option<QueueItem>> {
        self.connection()?
            .read_one(SELECT_NEXT_BY_STATUS, [status], QueueItem::from_row)
    }

    /// Move the next pending item to running and return it.
    ///
    /// The lookup and the update share one write transaction, so two
    /// consumers never claim the same item.
    pub fn claim_next(&self) -> Result<Option<QueueItem>> {
        let mut conn = self.connection()?;
        conn.begin()?;

        let next = conn.read_one(
            SELECT_NEXT_BY_STATUS,
            [QueueStatus::Pending],
            QueueItem::from_row,
        )?;
        let Some(item) = next else {
            conn.rollback()?;
            return Ok(None);
        };

        conn.write_one(
            UPDATE_STATUS_BY_ID,
            params![QueueStatus::Running, item.id, QueueStatus::Pending],
            true,
        )?;
        tracing::debug!(prompt_id = %item.prompt_id, "Claimed prompt");

        conn.read_one(SELECT_BY_ID, [item.id], QueueItem::from_row)
    }

    /// Set the status of one item. Returns false if no such item exists.
    pub fn set_status(&self, prompt_id: &str, status: QueueStatus) -> Result<bool> {
        let affected = self.connection()?.write_one(
            UPDATE_STATUS_BY_PROMPT_ID,
            params![status, prompt_id],
            true,
        )?;
        tracing::debug!(prompt_id, %status, affected, "Set prompt status");
        Ok(affected > 0)
    }

    /// Replace the payload of one item. Returns false if no such item exists.
    pub fn update_prompt(&self, prompt_id: &str, prompt: &str) -> Result<bool> {
        let affected = self
            .connection()?
            .write_one(UPDATE_PROMPT, [prompt, prompt_id], true)?;
        Ok(affected > 0)
    }

    /// Move every finished item to archived; returns how many moved.
    pub fn archive_finished(&self) -> Result<usize> {
        let archived = self.connection()?.write_one(
            UPDATE_ALL_STATUS,
            [QueueStatus::Archived, QueueStatus::Finished],
            true,
        )?;
        tracing::info!(archived, "Archived finished prompts");
        Ok(archived)
    }

    pub fn count_by_status(&self) -> Result<StatusCounts> {
        let rows = self.connection()?.read_many(COUNT_BY_STATUS, [], |row| {
            Ok((row.get::<_, QueueStatus>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            counts.set(status, u64::try_from(count).unwrap_or_default());
        }
        Ok(counts)
    }

    /// Highest submission number in use, `None` when the queue is empty.
    pub fn max_number(&self) -> Result<Option<i64>> {
        let max = self
            .connection()?
            .read_one(MAX_NUMBER, [], |row| row.get::<_, Option<i64>>(0))?;
        Ok(max.flatten())
    }

    /// Remove one item for good. Administrative only; archival is the
    /// normal end of an item's life.
    pub fn delete(&self, prompt_id: &str) -> Result<bool> {
        let affected = self
            .connection()?
            .write_one(DELETE_ITEM, [prompt_id], true)?;
        if affected > 0 {
            tracing::info!(prompt_id, "Deleted prompt");
        }
        Ok(affected > 0)
    }

    pub fn get_option(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get_option_entry(key)?.and_then(|entry| entry.value))
    }

    pub fn get_option_entry(&self, key: &str) -> Result<Option<OptionEntry>> {
        self.connection()?
            .read_one(SELECT_OPTION, [key], OptionEntry::from_row)
    }

    /// Insert or overwrite an option value.
    pub fn set_option(&self, key: &str, value: &str) -> Result<()> {
        self.connection()?
            .write_one(UPSERT_OPTION, [key, value], true)?;
        Ok(())
    }
}
