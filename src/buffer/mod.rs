//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache layer between tables and disk.
//! It keeps a bounded regular partition of frames with a pluggable
//! eviction policy, plus an unbounded partition for system tables.
//!
//! # Components
//! - [`BufferPool`] - The page cache
//! - [`Frame`] - A slot in the buffer pool holding a page + its key
//! - [`PageGuard`] - RAII guard for page access
//! - [`BufferPoolStats`] - Performance statistics
//! - [`replacer`] - Eviction policy implementations

mod buffer_pool;
mod frame;
mod page_guard;
pub mod replacer;
mod stats;

pub use buffer_pool::BufferPool;
pub use frame::Frame;
pub use page_guard::PageGuard;
pub use stats::{BufferPoolStats, StatsSnapshot};
