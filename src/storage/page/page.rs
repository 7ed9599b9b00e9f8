//! Page - the fixed-size unit of storage.
//!
//! A [`Page`] is a raw byte buffer plus a dirty flag. It has no structure of
//! its own; [`TablePage`](super::TablePage) interprets the bytes.

use crate::common::config::PAGE_SIZE;

/// A page of data.
///
/// This is the unit of I/O between disk and memory. The buffer pool owns
/// every resident page and is the only component that writes one back.
///
/// # Dirty tracking
/// Every mutable access to the bytes goes through [`Page::as_mut_slice`],
/// which sets the dirty flag. The flag is only cleared by the buffer pool
/// after the page has been written to disk.
///
/// # Clone Implementation
/// `Page` does NOT implement `Clone` in production code (copying a page is
/// expensive and should be explicit). A `#[cfg(test)]` Clone is provided
/// for tests.
///
/// # Example
/// ```
/// use heapstore::storage::page::Page;
///
/// let mut page = Page::new(4096);
/// assert!(!page.is_dirty());
/// page.as_mut_slice()[0] = 0xFF;
/// assert_eq!(page.as_slice()[0], 0xFF);
/// assert!(page.is_dirty());
/// ```
pub struct Page {
    data: Box<[u8]>,
    dirty: bool,
}

impl Page {
    /// Create a new zeroed, clean page of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0u8; size].into_boxed_slice(),
            dirty: false,
        }
    }

    /// Get immutable slice of page data.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get mutable slice of page data, marking the page dirty.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.dirty = true;
        &mut self.data
    }

    /// Get mutable slice of page data without touching the dirty flag.
    ///
    /// Only for filling a page from disk.
    #[inline]
    pub(crate) fn load_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Zero out the entire page.
    pub fn reset(&mut self) {
        self.data.fill(0);
        self.dirty = false;
    }

    /// Size of this page in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn set_dirty(&mut self) {
        self.dirty = true;
    }

    #[inline]
    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(PAGE_SIZE)
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("size", &self.data.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}

// Clone only available in tests - forces explicit copying in production
#[cfg(test)]
impl Clone for Page {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            dirty: self.dirty,
        }
    }
}
