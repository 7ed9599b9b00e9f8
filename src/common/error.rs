//! Error types for heapstore.

use std::path::PathBuf;

use thiserror::Error;

use super::PageId;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All recoverable errors raised by the storage kernel.
///
/// Programming errors (routing a system page through the regular pool,
/// undoing a record kind that cannot be undone) are assertions, not variants.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error from the disk layer, propagated unchanged.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The page lies past the end of the table's file.
    #[error("{page_id} not found in {}", .path.display())]
    PageNotFound { path: PathBuf, page_id: PageId },

    /// `new_page` was asked for a page that is already cached.
    #[error("{page_id} of table {table_oid} is already resident")]
    PageAlreadyResident { table_oid: u32, page_id: PageId },

    /// A record's values do not fit the table's columns.
    ///
    /// Reported before anything is mutated.
    #[error("record does not match schema: {0}")]
    SchemaMismatch(String),

    /// A record is larger than any page can hold.
    ///
    /// Reported before anything is mutated.
    #[error("record of {size} bytes exceeds the maximum of {max} bytes")]
    RecordTooLarge { size: usize, max: usize },

    /// A slot id past the end of a page's slot directory.
    #[error("slot {slot_id} out of range (record count {record_count})")]
    InvalidSlot { slot_id: u16, record_count: u32 },

    /// Page bytes violate the table page layout.
    #[error("corrupted page: {0}")]
    CorruptedPage(String),

    /// Log bytes could not be decoded.
    #[error("invalid log record: {0}")]
    InvalidLogRecord(String),

    /// Configuration values rejected by validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The catalog (or the buffer pool's ownership map) does not know the table.
    #[error("table {0} not found")]
    TableNotFound(u32),

    /// A full partition offered no eviction victim.
    #[error("no free frames available in buffer pool")]
    NoFreeFrames,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PageNotFound {
            path: PathBuf::from("db/7.tbl"),
            page_id: PageId::new(42),
        };
        assert_eq!(format!("{}", err), "Page(42) not found in db/7.tbl");

        let err = Error::RecordTooLarge { size: 5000, max: 4068 };
        assert_eq!(
            format!("{}", err),
            "record of 5000 bytes exceeds the maximum of 4068 bytes"
        );
    }

    #[test]
    fn test_rejection_display() {
        let err = Error::PageAlreadyResident {
            table_oid: 9,
            page_id: PageId::new(2),
        };
        assert_eq!(err.to_string(), "Page(2) of table 9 is already resident");

        let err = Error::SchemaMismatch("expected 2 values, got 0".into());
        assert_eq!(
            err.to_string(),
            "record does not match schema: expected 2 values, got 0"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_io_error_source() {
        use std::error::Error as _;

        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = Error::from(io_err);
        assert!(err.source().is_some());
        assert!(Error::TableNotFound(3).source().is_none());
    }
}
