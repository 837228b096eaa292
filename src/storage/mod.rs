//! SQLite storage layer for the queue.
//!
//! Provides:
//! - Connection pool with WAL pragmas per connection
//! - Schema initialization (tables, index, `updated_at` triggers)
//! - Generic read/write primitives every queue operation is built from

pub mod conn;
pub mod pool;
pub mod schema;

pub use conn::QueueConn;
pub use pool::ConnectionManager;
