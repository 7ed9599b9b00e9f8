//! Common types and utilities shared across heapstore.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration
//! - Error types
//! - Identifiers (PageId, FrameId, Rid, Lsn and the oid/xid/cid aliases)

pub mod config;
pub mod error;
mod frame_id;
mod page_id;
mod rid;

pub use error::{Error, Result};
pub use frame_id::FrameId;
pub use page_id::PageId;
pub use rid::{Lsn, Rid};

/// Object id of a database or a table.
pub type Oid = u32;

/// Transaction id.
pub type Xid = u64;

/// Command id: position of a statement inside its transaction.
pub type Cid = u32;

/// Index into a table page's slot directory.
pub type SlotId = u16;

/// Xid stamped on records that were never deleted.
pub const NULL_XID: Xid = 0;
