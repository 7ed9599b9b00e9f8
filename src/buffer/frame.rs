//! Frame - a slot in the buffer pool.
//!
//! A [`Frame`] holds a [`Page`] plus the key it is cached under. Dirty
//! tracking lives on the page itself.

use crate::common::{Oid, PageId};
use crate::storage::page::Page;

/// A resident page and its `(table_oid, page_id)` key.
///
/// Frames are owned by a buffer pool partition and only reached through
/// that partition's lock, so they need no interior locking of their own.
pub struct Frame {
    table_oid: Oid,
    page_id: PageId,
    pub(crate) page: Page,
}

impl Frame {
    pub fn new(table_oid: Oid, page_id: PageId, page: Page) -> Self {
        Self {
            table_oid,
            page_id,
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

    /// Key the frame is indexed under.
    #[inline]
    pub fn key(&self) -> (Oid, PageId) {
        (self.table_oid, self.page_id)
    }

    #[inline]
    pub fn page(&self) -> &Page {
        &self.page
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.page.is_dirty()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("table_oid", &self.table_oid)
            .field("page_id", &self.page_id)
            .field("dirty", &self.page.is_dirty())
            .finish()
    }
}
