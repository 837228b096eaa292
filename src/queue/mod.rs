//! Queue items, their lifecycle, and the operations built on the storage
//! primitives.

pub mod item;
pub mod status;
pub mod store;

pub use item::{NewQueueItem, OptionEntry, QueueItem, StatusCounts};
pub use status::{QueueStatus, UnknownStatus};
pub use store::QueueStore;
