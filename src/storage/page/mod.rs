//! Page types and layout.
//!
//! This module contains:
//! - [`Page`] - The raw data container with a dirty flag
//! - [`TablePageHeader`] / [`Slot`] - Encoded metadata of a table page
//! - [`TablePage`] - Slotted view over a page holding variable-length records

#[allow(clippy::module_inception)]
mod page;
mod page_header;
mod table_page;

pub use page::Page;
pub use page_header::{Slot, TablePageHeader};
pub(crate) use page_header::{read_u32, read_u64};
pub use table_page::TablePage;

/// Size of a table page header in bytes.
pub const PAGE_HEADER_SIZE: usize = TablePageHeader::SIZE;

/// Size of a slot directory entry in bytes.
pub const SLOT_SIZE: usize = Slot::SIZE;
