//! heapstore - the storage kernel of a relational database.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Table layer (table/)                                           │
//! │     Table + TableScan + MVCC visibility                         │
//! └─────────────────────────────────────────────────────────────────┘
//!              ↓ pages                      ↓ log records
//! ┌──────────────────────────────┐  ┌──────────────────────────────┐
//! │  Buffer Pool (buffer/)       │→ │  Recovery (recovery/)        │
//! │   regular: LRU | FIFO        │  │   LogManager + redo/undo     │
//! │   system: unbounded          │  │   flush_page before write    │
//! └──────────────────────────────┘  └──────────────────────────────┘
//!              ↓
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Storage (storage/)                                             │
//! │     DiskManager (one file per table) + slotted TablePage        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, Rid, Lsn, Error, config)
//! - [`buffer`] - Buffer pool and eviction policies
//! - [`storage`] - Disk I/O and page formats
//! - [`table`] - Records, tables and scans
//! - [`recovery`] - Write-ahead log records, log manager, redo and rollback
//! - [`catalog`] - Table metadata lookups
//!
//! # Quick Start
//! ```no_run
//! use std::sync::Arc;
//!
//! use heapstore::catalog::MemoryCatalog;
//! use heapstore::common::config::StorageConfig;
//! use heapstore::recovery::MemoryLogManager;
//! use heapstore::table::{Column, ColumnList, ColumnType, Record, Table, Value};
//! use heapstore::{BufferPool, DiskManager, PageId};
//!
//! let config = StorageConfig::default();
//! let dm = DiskManager::new("data", config.page_size).unwrap();
//! let log = Arc::new(MemoryLogManager::new());
//! let pool = Arc::new(BufferPool::new(dm, log.clone(), config).unwrap());
//!
//! let columns = ColumnList::new(vec![Column::new("id", ColumnType::Int)]);
//! let catalog = MemoryCatalog::new();
//! catalog.create_table(1, 100, columns.clone());
//!
//! let table = Table::new(pool, log, 1, 100, columns, PageId::INVALID);
//! let rid = table
//!     .insert_record(Record::new(vec![Value::Int(42)]), 1, 0, true)
//!     .unwrap();
//! assert_eq!(table.get_record(rid).unwrap().value(0), Some(&Value::Int(42)));
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod recovery;
pub mod storage;
pub mod table;

// Re-export commonly used items at crate root for convenience
pub use common::config::PAGE_SIZE;
pub use common::{Error, FrameId, Lsn, PageId, Result, Rid};

pub use buffer::{BufferPool, BufferPoolStats, PageGuard, StatsSnapshot};
pub use storage::page::{Page, TablePage};
pub use storage::DiskManager;
