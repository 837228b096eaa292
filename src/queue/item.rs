//! Row types for the `queue` and `options` tables.

use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::status::QueueStatus;

/// One stored prompt.
///
/// Timestamps are kept as the text SQLite writes (`YYYY-MM-DD HH:MM:SS.SSS`,
/// UTC), which sorts chronologically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: i64,
    pub prompt_id: String,
    pub created_at: String,
    pub updated_at: String,
    pub number: Option<i64>,
    pub name: Option<String>,
    pub workflow_id: Option<String>,
    pub prompt: Option<String>,
    pub status: QueueStatus,
}

impl QueueItem {
    /// Column list matching [`QueueItem::from_row`].
    pub const COLUMNS: &'static str =
        "id, prompt_id, created_at, updated_at, number, name, workflow_id, prompt, status";

    /// Decode a row selected with [`QueueItem::COLUMNS`].
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            prompt_id: row.get(1)?,
            created_at: row.get(2)?,
            updated_at: row.get(3)?,
            number: row.get(4)?,
            name: row.get(5)?,
            workflow_id: row.get(6)?,
            prompt: row.get(7)?,
            status: row.get(8)?,
        })
    }
}

/// A prompt to be enqueued. The store assigns `id` and both timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQueueItem {
    pub prompt_id: String,
    pub number: Option<i64>,
    pub name: Option<String>,
    pub workflow_id: Option<String>,
    pub prompt: Option<String>,
    pub status: QueueStatus,
}

impl NewQueueItem {
    /// A pending item with the given submission number and payload.
    pub fn new(prompt_id: impl Into<String>, number: i64, prompt: impl Into<String>) -> Self {
        Self {
            prompt_id: prompt_id.into(),
            number: Some(number),
            name: None,
            workflow_id: None,
            prompt: Some(prompt.into()),
            status: QueueStatus::Pending,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_workflow_id(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = Some(workflow_id.into());
        self
    }

    pub fn with_status(mut self, status: QueueStatus) -> Self {
        self.status = status;
        self
    }
}

/// One row of `options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionEntry {
    pub id: i64,
    pub key: String,
    pub value: Option<String>,
    pub updated_at: String,
}

impl OptionEntry {
    pub const COLUMNS: &'static str = "id, key, value, updated_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            key: row.get(1)?,
            value: row.get(2)?,
            updated_at: row.get(3)?,
        })
    }
}

/// Number of items in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: u64,
    pub running: u64,
    pub finished: u64,
    pub archived: u64,
}

impl StatusCounts {
    pub fn get(&self, status: QueueStatus) -> u64 {
        match status {
            QueueStatus::Pending => self.pending,
            QueueStatus::Running => self.running,
            QueueStatus::Finished => self.finished,
            QueueStatus::Archived => self.archived,
        }
    }

    pub(crate) fn set(&mut self, status: QueueStatus, count: u64) {
        match status {
            QueueStatus::Pending => self.pending = count,
            QueueStatus::Running => self.running = count,
            QueueStatus::Finished => self.finished = count,
            QueueStatus::Archived => self.archived = count,
        }
    }

    pub fn total(&self) -> u64 {
        self.pending + self.running + self.finished + self.archived
    }

    /// Items still waiting or executing.
    pub fn active(&self) -> u64 {
        self.pending + self.running
    }
}
