//! Slotted table page.
//!
//! ```text
//! +--------+----------------------+------------+-----------------------+
//! | header | slot 0 | slot 1 | ...|  free      | ... record 1 | record 0|
//! +--------+----------------------+------------+-----------------------+
//! 0        20                   lower        upper               page_size
//! ```
//!
//! The slot directory grows upward from the header and records grow
//! downward from the end of the page. A deleted record keeps its slot and
//! its bytes; only the deleted flag in its header is set.

use super::page::Page;
use super::page_header::{Slot, TablePageHeader};
use crate::common::{Cid, Error, Lsn, PageId, Result, Rid, SlotId, Xid, NULL_XID};
use crate::table::{ColumnList, Record, RecordHeader};

/// A table-page view over a borrowed [`Page`].
///
/// The view keeps no state of its own; every accessor decodes from the page
/// bytes and every setter encodes back into them (marking the page dirty).
///
/// # Example
/// ```
/// use heapstore::storage::page::{Page, TablePage};
/// use heapstore::table::{Record, Value};
///
/// let mut page = Page::new(4096);
/// let mut table_page = TablePage::new(&mut page);
/// table_page.init();
///
/// let slot = table_page.insert_record(&mut Record::new(vec![Value::Int(7)]), 1, 0).unwrap();
/// assert_eq!(slot, 0);
/// assert_eq!(table_page.record_count(), 1);
/// ```
pub struct TablePage<'a> {
    page: &'a mut Page,
}

impl<'a> TablePage<'a> {
    pub fn new(page: &'a mut Page) -> Self {
        Self { page }
    }

    /// Format the page as an empty table page.
    pub fn init(&mut self) {
        let header = TablePageHeader::empty(self.page.size());
        header.write_to(self.page.as_mut_slice());
    }

    // ========================================================================
    // Header
    // ========================================================================

    fn header(&self) -> TablePageHeader {
        TablePageHeader::from_bytes(self.page.as_slice())
    }

    fn write_header(&mut self, header: &TablePageHeader) {
        header.write_to(self.page.as_mut_slice());
    }

    pub fn page_lsn(&self) -> Lsn {
        self.header().page_lsn
    }

    pub fn set_page_lsn(&mut self, lsn: Lsn) {
        let mut header = self.header();
        header.page_lsn = lsn;
        self.write_header(&header);
    }

    /// Raise the page LSN to `lsn`; a page LSN never moves backwards.
    pub fn advance_page_lsn(&mut self, lsn: Lsn) {
        if self.page_lsn() < lsn {
            self.set_page_lsn(lsn);
        }
    }

    pub fn next_page_id(&self) -> PageId {
        self.header().next_page_id
    }

    pub fn set_next_page_id(&mut self, page_id: PageId) {
        let mut header = self.header();
        header.next_page_id = page_id;
        self.write_header(&header);
    }

    pub fn lower(&self) -> u32 {
        self.header().lower
    }

    pub fn upper(&self) -> u32 {
        self.header().upper
    }

    /// Number of slots in the directory, deleted records included.
    pub fn record_count(&self) -> u32 {
        let lower = self.lower() as usize;
        (lower.saturating_sub(TablePageHeader::SIZE) / Slot::SIZE) as u32
    }

    /// Bytes available for the next record, after reserving its slot.
    pub fn free_space(&self) -> usize {
        let header = self.header();
        (header.upper as usize).saturating_sub(header.lower as usize + Slot::SIZE)
    }

    /// Successor of this page, which is `page_id`, in its table's chain.
    ///
    /// # Errors
    /// `Error::CorruptedPage` if the page was never formatted or links to
    /// itself.
    pub fn next_in_chain(&self, page_id: PageId) -> Result<PageId> {
        let header = self.header();
        if (header.lower as usize) < TablePageHeader::SIZE {
            return Err(Error::CorruptedPage(format!("{} is not formatted", page_id)));
        }
        if header.next_page_id == page_id {
            return Err(Error::CorruptedPage(format!("{} links to itself", page_id)));
        }
        Ok(header.next_page_id)
    }

    // ========================================================================
    // Slots
    // ========================================================================

    /// Read and bounds-check the slot of `slot_id`.
    fn slot(&self, slot_id: SlotId) -> Result<Slot> {
        let header = self.header();
        if header.lower > header.upper || header.upper as usize > self.page.size() {
            return Err(Error::CorruptedPage(format!(
                "lower {} / upper {} out of order",
                header.lower, header.upper
            )));
        }
        let record_count = self.record_count();
        if u32::from(slot_id) >= record_count {
            return Err(Error::InvalidSlot {
                slot_id,
                record_count,
            });
        }

        let pos = Slot::position(slot_id as usize);
        let slot = Slot::from_bytes(&self.page.as_slice()[pos..pos + Slot::SIZE]);
        if (slot.offset as usize) < TablePageHeader::SIZE
            || slot.end() > self.page.size()
            || (slot.size as usize) < RecordHeader::SIZE
        {
            return Err(Error::CorruptedPage(format!(
                "slot {} points outside the page (offset {}, size {})",
                slot_id, slot.offset, slot.size
            )));
        }
        Ok(slot)
    }

    fn write_slot(&mut self, slot_id: usize, slot: Slot) {
        let pos = Slot::position(slot_id);
        slot.write_to(&mut self.page.as_mut_slice()[pos..pos + Slot::SIZE]);
    }

    /// Raw bytes of the record in `slot_id`.
    pub fn record_bytes(&self, slot_id: SlotId) -> Result<&[u8]> {
        let slot = self.slot(slot_id)?;
        Ok(&self.page.as_slice()[slot.offset as usize..slot.end()])
    }

    // ========================================================================
    // Record operations
    // ========================================================================

    /// Insert `record`, stamped with `xid`/`cid`, and return its slot id.
    ///
    /// The record's header is updated in place so the caller can log the
    /// exact bytes that were written.
    ///
    /// # Errors
    /// `Error::RecordTooLarge` if the record does not fit into the free
    /// space; the page is untouched.
    pub fn insert_record(&mut self, record: &mut Record, xid: Xid, cid: Cid) -> Result<SlotId> {
        let size = record.size();
        let free = self.free_space();
        if size > free {
            return Err(Error::RecordTooLarge { size, max: free });
        }

        record.stamp_insert(xid, cid);
        let bytes = record.to_bytes();

        let mut header = self.header();
        let slot_id = self.record_count() as SlotId;
        header.upper -= size as u32;
        let slot = Slot::new(header.upper, size as u32);

        self.write_slot(slot_id as usize, slot);
        self.page.as_mut_slice()[slot.offset as usize..slot.end()].copy_from_slice(&bytes);
        header.lower += Slot::SIZE as u32;
        self.write_header(&header);

        Ok(slot_id)
    }

    /// Mark the record in `slot_id` deleted by `xid`.
    pub fn delete_record(&mut self, slot_id: SlotId, xid: Xid) -> Result<()> {
        self.update_header(slot_id, |header| {
            header.deleted = true;
            header.xmax = xid;
        })
    }

    /// Clear the deleted flag of the record in `slot_id`.
    pub fn undo_delete_record(&mut self, slot_id: SlotId) -> Result<()> {
        self.update_header(slot_id, |header| {
            header.deleted = false;
            header.xmax = NULL_XID;
        })
    }

    fn update_header(&mut self, slot_id: SlotId, f: impl FnOnce(&mut RecordHeader)) -> Result<()> {
        let slot = self.slot(slot_id)?;
        let data = &mut self.page.as_mut_slice()[slot.offset as usize..slot.end()];
        let mut header = RecordHeader::from_bytes(data)?;
        f(&mut header);
        header.write_to(data);
        Ok(())
    }

    /// Overwrite the record in `slot_id` with `record`, header included.
    ///
    /// # Panics
    /// Panics if the encoded size differs from the stored record's size.
    pub fn update_record_in_place(&mut self, record: &Record, slot_id: SlotId) -> Result<()> {
        let slot = self.slot(slot_id)?;
        let bytes = record.to_bytes();
        assert_eq!(
            bytes.len(),
            slot.size as usize,
            "in-place update must keep the record size"
        );
        self.page.as_mut_slice()[slot.offset as usize..slot.end()].copy_from_slice(&bytes);
        Ok(())
    }

    /// Decode the record at `rid.slot_id` and stamp it with `rid`.
    pub fn get_record(&self, rid: Rid, column_list: &ColumnList) -> Result<Record> {
        let mut record = Record::from_bytes(self.record_bytes(rid.slot_id)?, column_list)?;
        record.set_rid(rid);
        Ok(record)
    }

    /// Re-apply a logged insert at exactly `slot_id` and `page_offset`.
    ///
    /// `lower` and `upper` are widened to cover the slot and the record,
    /// so redoing inserts in log order rebuilds the original layout.
    ///
    /// # Errors
    /// `Error::CorruptedPage` if the slot or the record would fall outside
    /// the page or overlap each other.
    pub fn redo_insert_record(
        &mut self,
        slot_id: SlotId,
        raw_record: &[u8],
        page_offset: u32,
        record_size: u32,
    ) -> Result<()> {
        let start = page_offset as usize;
        let end = start + record_size as usize;
        let slot_end = Slot::position(slot_id as usize) + Slot::SIZE;
        if raw_record.len() != record_size as usize || end > self.page.size() || slot_end > start {
            return Err(Error::CorruptedPage(format!(
                "cannot redo insert of {} bytes at offset {} into slot {}",
                record_size, page_offset, slot_id
            )));
        }

        let mut header = self.header();
        self.page.as_mut_slice()[start..end].copy_from_slice(raw_record);
        self.write_slot(slot_id as usize, Slot::new(page_offset, record_size));
        header.lower = header.lower.max(slot_end as u32);
        header.upper = header.upper.min(page_offset);
        self.write_header(&header);
        Ok(())
    }
}

impl std::fmt::Debug for TablePage<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header = self.header();
        f.debug_struct("TablePage")
            .field("page_lsn", &header.page_lsn)
            .field("next_page_id", &header.next_page_id)
            .field("lower", &header.lower)
            .field("upper", &header.upper)
            .field("record_count", &self.record_count())
            .finish()
    }
}
