//! Configuration for the storage kernel.
//!
//! Page size and buffer pool capacity are carried in a [`StorageConfig`]
//! value that is handed to the buffer pool and, through it, to every page it
//! creates. The constants below are only the defaults.

use crate::buffer::replacer::ReplacerKind;
use crate::common::{Error, Oid, Result};

/// Default size of a page in bytes (4KB).
///
/// Matches the OS page size on most systems, so one page is one I/O.
pub const PAGE_SIZE: usize = 4096;

/// Smallest page size accepted by [`StorageConfig::validate`].
pub const MIN_PAGE_SIZE: usize = 256;

/// Largest page size accepted by [`StorageConfig::validate`].
///
/// Slot offsets and sizes are stored as `u32`, but 64KB keeps a single
/// record comfortably inside one write.
pub const MAX_PAGE_SIZE: usize = 0x10000;

/// Default number of frames in the regular buffer pool.
pub const DEFAULT_BUFFER_POOL_SIZE: usize = 64;

/// Database oid reserved for the system catalog.
///
/// Pages of tables in this database live in the unbounded system pool.
pub const SYSTEM_DATABASE_OID: Oid = 0;

/// Runtime configuration for the buffer pool and page layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageConfig {
    /// Size of every page in bytes.
    pub page_size: usize,
    /// Number of frames in the regular (evictable) pool.
    pub buffer_pool_size: usize,
    /// Eviction policy used by the regular pool.
    pub replacer: ReplacerKind,
}

impl StorageConfig {
    /// Build a config with the given page size and pool capacity.
    pub fn new(page_size: usize, buffer_pool_size: usize) -> Self {
        Self {
            page_size,
            buffer_pool_size,
            replacer: ReplacerKind::default(),
        }
    }

    /// Replace the eviction policy.
    pub fn with_replacer(mut self, replacer: ReplacerKind) -> Self {
        self.replacer = replacer;
        self
    }

    /// Check that the values describe a usable pool.
    ///
    /// # Errors
    /// `Error::InvalidConfig` if the page size is not a power of two inside
    /// `[MIN_PAGE_SIZE, MAX_PAGE_SIZE]`, or the pool has no frames.
    pub fn validate(&self) -> Result<()> {
        if !self.page_size.is_power_of_two() {
            return Err(Error::InvalidConfig(format!(
                "page size must be a power of 2, but got {}",
                self.page_size
            )));
        }
        if self.page_size < MIN_PAGE_SIZE || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::InvalidConfig(format!(
                "page size must be within [{}, {}], but got {}",
                MIN_PAGE_SIZE, MAX_PAGE_SIZE, self.page_size
            )));
        }
        if self.buffer_pool_size == 0 {
            return Err(Error::InvalidConfig(
                "buffer pool must hold at least one frame".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PAGE_SIZE, DEFAULT_BUFFER_POOL_SIZE)
    }
}
