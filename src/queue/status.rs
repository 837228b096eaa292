//! Lifecycle status of a queue item.
//!
//! ```text
//! pending (0) -> running (1) -> finished (2) -> archived (3)
//! ```
//!
//! Transitions are driven by callers. The store only guarantees that a stored
//! value is one of the variants below; it does not reject out-of-order moves.
//! The values `-1` (error) and `-2` (bin) are reserved for future states and
//! are rejected when decoding until they are given meaning.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Status column value of a queue row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
#[repr(i64)]
pub enum QueueStatus {
    /// Submitted, waiting for a consumer.
    Pending = 0,
    /// Claimed by a consumer and executing.
    Running = 1,
    /// Execution completed.
    Finished = 2,
    /// Kept for history, hidden from active views.
    Archived = 3,
}

/// A status value with no matching variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown queue status {0}")]
pub struct UnknownStatus(pub i64);

impl QueueStatus {
    /// Every defined status, in lifecycle order.
    pub const ALL: [QueueStatus; 4] = [
        QueueStatus::Pending,
        QueueStatus::Running,
        QueueStatus::Finished,
        QueueStatus::Archived,
    ];

    pub fn as_i64(self) -> i64 {
        self as i64
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Running => "running",
            QueueStatus::Finished => "finished",
            QueueStatus::Archived => "archived",
        }
    }

    /// Pending or running: the item still counts as queued work.
    pub fn is_active(self) -> bool {
        matches!(self, QueueStatus::Pending | QueueStatus::Running)
    }
}

impl TryFrom<i64> for QueueStatus {
    type Error = UnknownStatus;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(QueueStatus::Pending),
            1 => Ok(QueueStatus::Running),
            2 => Ok(QueueStatus::Finished),
            3 => Ok(QueueStatus::Archived),
            other => Err(UnknownStatus(other)),
        }
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueStatus {
    type Err = String;

    /// Accepts the lowercase name or the numeric value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(value) = s.parse::<i64>() {
            return QueueStatus::try_from(value).map_err(|e| e.to_string());
        }
        QueueStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown queue status '{s}'"))
    }
}

impl ToSql for QueueStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_i64()))
    }
}

impl FromSql for QueueStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = i64::column_result(value)?;
        QueueStatus::try_from(raw).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}
