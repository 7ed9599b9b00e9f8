//! RAII guard for page access.
//!
//! A [`PageGuard`] holds the lock of the buffer pool partition that owns
//! the page. While it is alive nothing in that partition can be evicted,
//! flushed or cleared, so the page bytes it exposes stay valid and are
//! never written back mid-mutation. Dropping the guard releases the
//! partition.

use std::ops::{Deref, DerefMut};

use parking_lot::MappedMutexGuard;

use crate::common::{FrameId, Oid, PageId};
use crate::storage::page::{Page, TablePage};

/// Exclusive access to one resident page.
///
/// A caller must not hold two guards on the same partition at once; the
/// second request would wait on the lock the first one holds.
///
/// # Example
/// ```ignore
/// let mut guard = pool.get_page(table_oid, db_oid, page_id)?;
/// let lsn = guard.table_page().page_lsn();
/// // guard drops here, partition unlocked
/// ```
pub struct PageGuard<'a> {
    table_oid: Oid,
    page_id: PageId,
    frame_id: FrameId,
    page: MappedMutexGuard<'a, Page>,
}

impl<'a> PageGuard<'a> {
    /// Called by `BufferPool::get_page()` and `BufferPool::new_page()`.
    pub(crate) fn new(
        table_oid: Oid,
        page_id: PageId,
        frame_id: FrameId,
        page: MappedMutexGuard<'a, Page>,
    ) -> Self {
        Self {
            table_oid,
            page_id,
            frame_id,
            page,
        }
    }

    #[inline]
    pub fn table_oid(&self) -> Oid {
        self.table_oid
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// View the page as a table page.
    pub fn table_page(&mut self) -> TablePage<'_> {
        TablePage::new(&mut self.page)
    }
}

impl Deref for PageGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.page
    }
}

impl DerefMut for PageGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Page {
        &mut self.page
    }
}

impl std::fmt::Debug for PageGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageGuard")
            .field("table_oid", &self.table_oid)
            .field("page_id", &self.page_id)
            .field("frame_id", &self.frame_id)
            .finish()
    }
}
