//! Disk Manager - low-level file I/O for table pages.
//!
//! Every table lives in its own file under a root directory:
//! `<root>/<db_oid>/<table_oid>.tbl`. The [`DiskManager`] maps a
//! `(file, page_id)` pair to a byte range and does nothing else; it does
//! not cache, allocate, or interpret pages.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::common::{Error, Oid, PageId, Result};

/// Manages disk I/O for all table files under one root directory.
///
/// # File Layout
/// Each table file holds its pages sequentially:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0   page_size  2×page_size ...  N×page_size
/// ```
///
/// # Thread Safety
/// `DiskManager` holds no open handles and no mutable state, but the
/// buffer pool still serializes access to it so that a page is never read
/// while it is being written.
///
/// # Durability
/// All writes are followed by `fsync()`.
#[derive(Debug)]
pub struct DiskManager {
    root: PathBuf,
    page_size: usize,
}

impl DiskManager {
    /// Create a disk manager rooted at `root`, creating the directory if
    /// needed.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn new<P: AsRef<Path>>(root: P, page_size: usize) -> Result<Self> {
        fs::create_dir_all(root.as_ref())?;
        Ok(Self {
            root: root.as_ref().to_path_buf(),
            page_size,
        })
    }

    /// Path of the file storing `table_oid` of database `db_oid`.
    pub fn file_path(&self, db_oid: Oid, table_oid: Oid) -> PathBuf {
        self.root
            .join(db_oid.to_string())
            .join(format!("{}.tbl", table_oid))
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn offset(&self, page_id: PageId) -> u64 {
        debug_assert!(page_id.is_valid());
        (page_id.0 as u64) * (self.page_size as u64)
    }

    /// Read page `page_id` of the file at `path` into `buf`.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the file is missing or ends before
    /// the page.
    pub fn read_page(&self, path: &Path, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), self.page_size);

        let not_found = || Error::PageNotFound {
            path: path.to_path_buf(),
            page_id,
        };
        if page_id.0 >= self.page_count(path)? {
            return Err(not_found());
        }

        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(self.offset(page_id)))?;
        file.read_exact(buf)?;
        Ok(())
    }

    /// Write `buf` as page `page_id` of the file at `path`.
    ///
    /// The file (and its database directory) is created if missing and
    /// extended with zeros if it ends before the page.
    ///
    /// # Durability
    /// This method calls `fsync()` after writing.
    pub fn write_page(&self, path: &Path, page_id: PageId, buf: &[u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), self.page_size);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        file.seek(SeekFrom::Start(self.offset(page_id)))?;
        file.write_all(buf)?;
        file.sync_all()?; // fsync for durability

        Ok(())
    }

    /// Number of whole pages in the file at `path`; 0 if it does not exist.
    pub fn page_count(&self, path: &Path) -> Result<u32> {
        match fs::metadata(path) {
            Ok(metadata) => Ok((metadata.len() / self.page_size as u64) as u32),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}
