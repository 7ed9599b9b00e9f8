//! Table page header and slot directory entries.
//!
//! Both are plain values copied out of and encoded back into the page
//! bytes; nothing holds a typed reference into the buffer.

use crate::common::{Lsn, PageId};

/// Metadata stored at the beginning of every table page.
///
/// # Layout (20 bytes, little-endian)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       8     page_lsn
/// 8       4     next_page_id (u32::MAX = end of chain)
/// 12      4     lower (end of the slot directory)
/// 16      4     upper (start of the record area)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TablePageHeader {
    /// LSN of the last log record applied to this page.
    pub page_lsn: Lsn,
    /// Next page in the table's chain.
    pub next_page_id: PageId,
    /// Byte offset just past the slot directory.
    pub lower: u32,
    /// Byte offset where the most recently inserted record begins.
    pub upper: u32,
}

impl TablePageHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 20;

    pub const OFFSET_LSN: usize = 0;
    pub const OFFSET_NEXT_PAGE_ID: usize = 8;
    pub const OFFSET_LOWER: usize = 12;
    pub const OFFSET_UPPER: usize = 16;

    /// Header of an empty page of `page_size` bytes.
    pub fn empty(page_size: usize) -> Self {
        Self {
            page_lsn: Lsn::NULL,
            next_page_id: PageId::INVALID,
            lower: Self::SIZE as u32,
            upper: page_size as u32,
        }
    }

    /// Read a header from the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < TablePageHeader::SIZE`.
    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= Self::SIZE, "buffer too small for TablePageHeader");

        let page_lsn = Lsn(read_u64(data, Self::OFFSET_LSN));
        let next_page_id = PageId(read_u32(data, Self::OFFSET_NEXT_PAGE_ID));
        let lower = read_u32(data, Self::OFFSET_LOWER);
        let upper = read_u32(data, Self::OFFSET_UPPER);

        Self {
            page_lsn,
            next_page_id,
            lower,
            upper,
        }
    }

    /// Write this header to the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < TablePageHeader::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for TablePageHeader");

        data[Self::OFFSET_LSN..Self::OFFSET_LSN + 8].copy_from_slice(&self.page_lsn.0.to_le_bytes());
        data[Self::OFFSET_NEXT_PAGE_ID..Self::OFFSET_NEXT_PAGE_ID + 4]
            .copy_from_slice(&self.next_page_id.to_le_bytes());
        data[Self::OFFSET_LOWER..Self::OFFSET_LOWER + 4].copy_from_slice(&self.lower.to_le_bytes());
        data[Self::OFFSET_UPPER..Self::OFFSET_UPPER + 4].copy_from_slice(&self.upper.to_le_bytes());
    }
}

/// One slot directory entry: where a record lives in the page.
///
/// # Layout (8 bytes, little-endian)
/// ```text
/// 0  4  offset
/// 4  4  size
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub offset: u32,
    pub size: u32,
}

impl Slot {
    /// Size of a slot entry in bytes.
    pub const SIZE: usize = 8;

    pub fn new(offset: u32, size: u32) -> Self {
        Self { offset, size }
    }

    /// Byte position of slot `slot_id` inside the page.
    #[inline]
    pub fn position(slot_id: usize) -> usize {
        TablePageHeader::SIZE + slot_id * Self::SIZE
    }

    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= Self::SIZE, "buffer too small for Slot");
        Self {
            offset: read_u32(data, 0),
            size: read_u32(data, 4),
        }
    }

    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for Slot");
        data[0..4].copy_from_slice(&self.offset.to_le_bytes());
        data[4..8].copy_from_slice(&self.size.to_le_bytes());
    }

    /// End of the record bytes (exclusive).
    #[inline]
    pub fn end(&self) -> usize {
        self.offset as usize + self.size as usize
    }
}

#[inline]
pub(crate) fn read_u32(data: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

#[inline]
pub(crate) fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}
