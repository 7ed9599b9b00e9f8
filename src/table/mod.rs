//! Tables, records and scans.
//!
//! - [`Column`] / [`ColumnList`] - Table schemas
//! - [`Value`] - A single column value and its encoding
//! - [`Record`] - A row with its MVCC header
//! - [`Table`] - Insert, delete and update over a chain of table pages
//! - [`TableScan`] - Visibility-filtered sequential scan

mod column;
mod record;
#[allow(clippy::module_inception)]
mod table;
mod table_scan;
mod value;
mod visibility;

pub use column::{Column, ColumnList, ColumnType};
pub use record::{Record, RecordHeader};
pub use table::Table;
pub use table_scan::TableScan;
pub use value::Value;
pub use visibility::{is_visible, IsolationLevel};
