//! Row identifiers and log sequence numbers.

use std::fmt;

use super::{PageId, SlotId};

/// Locates a record inside a table: the page in the table's chain and the
/// slot in that page's directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rid {
    pub page_id: PageId,
    pub slot_id: SlotId,
}

impl Rid {
    #[inline]
    pub fn new(page_id: PageId, slot_id: SlotId) -> Self {
        Self { page_id, slot_id }
    }

    /// Row id of a record that is not stored anywhere yet.
    pub const INVALID: Rid = Rid {
        page_id: PageId::INVALID,
        slot_id: 0,
    };
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.page_id.0, self.slot_id)
    }
}

/// Position of a record in the write-ahead log.
///
/// LSNs grow monotonically. `Lsn::NULL` (zero) is never assigned to a
/// record: it marks a freshly initialized page and the end of a
/// transaction's `prev_lsn` chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Lsn(pub u64);

impl Lsn {
    pub const NULL: Lsn = Lsn(0);

    #[inline]
    pub fn new(lsn: u64) -> Self {
        Lsn(lsn)
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    #[inline]
    pub fn next(&self) -> Self {
        Lsn(self.0 + 1)
    }
}

impl fmt::Display for Lsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LSN({})", self.0)
    }
}
