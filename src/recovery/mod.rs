//! Write-ahead logging and recovery.
//!
//! - [`LogRecord`] / [`LogBody`] - Typed log records with their wire format
//!   and redo/undo against the buffer pool
//! - [`LogManager`] - What tables and the buffer pool need from the log
//! - [`MemoryLogManager`] - In-memory log with a durable watermark
//! - [`redo`], [`rollback`], [`recover`] - Replay and undo passes

mod driver;
mod log_manager;
mod log_record;

pub use driver::{recover, redo, rollback};
pub use log_manager::{LogManager, MemoryLogManager};
pub use log_record::{LogBody, LogRecord, LogType, UndoAction};
