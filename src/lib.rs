//! qm-store: durable prompt queue on SQLite.
//!
//! Stores submitted prompts, tracks them through
//! pending → running → finished → archived, and lets many threads read while
//! one writes at a time.
//!
//! # Architecture
//!
//! - **One handle per context**: an r2d2 pool hands each thread its own
//!   connection, returned on drop
//! - **WAL**: readers never wait for the writer; `synchronous=NORMAL`
//! - **Generic primitives**: every queue operation is one of
//!   `write_one`, `write_batch`, `read_one`, `read_many`
//! - **Trigger-maintained timestamps**: `updated_at` refreshes on every update
//!
//! # Modules
//!
//! - [`config`]: CLI and environment configuration
//! - [`error`]: the crate error type
//! - [`observability`]: logging setup
//! - [`queue`]: queue items, statuses and typed operations
//! - [`storage`]: connection pool, schema and primitives
//!
//! # Example
//!
//! ```no_run
//! use qm_store::{Config, NewQueueItem, QueueStatus, QueueStore};
//!
//! let store = QueueStore::open(&Config::new("./data", "8188"))?;
//! store.enqueue(&NewQueueItem::new("prompt-1", 1, r#"{"nodes":[]}"#))?;
//!
//! if let Some(item) = store.claim_next()? {
//!     // ... execute the prompt ...
//!     store.set_status(&item.prompt_id, QueueStatus::Finished)?;
//! }
//! # Ok::<(), qm_store::StoreError>(())
//! ```

// Lint configuration
#![warn(clippy::all)]
#![allow(
    clippy::module_name_repetitions,    // queue::QueueStore is fine
    clippy::must_use_candidate,         // Not all functions need #[must_use]
    clippy::missing_errors_doc,         // Error docs can be verbose
    clippy::needless_raw_string_hashes  // r#""# is fine for SQL
)]

pub mod config;
pub mod error;
pub mod observability;
pub mod queue;
pub mod storage;

pub use config::Config;
pub use error::{Result, StoreError};
pub use queue::{NewQueueItem, OptionEntry, QueueItem, QueueStatus, QueueStore, StatusCounts};
pub use storage::{ConnectionManager, QueueConn};
