//! Sequential scan over a table's page chain.

use std::collections::HashSet;

use log::trace;

use super::record::Record;
use super::table::Table;
use super::visibility::{is_visible, IsolationLevel};
use crate::common::{Cid, PageId, Result, Rid, Xid};

/// Cursor over the records of a [`Table`] in page-chain and slot order.
///
/// The cursor holds no page between calls. Records appended behind the
/// cursor while a scan is in progress are returned when it reaches them.
pub struct TableScan<'a> {
    table: &'a Table,
    /// Next position to examine.
    rid: Rid,
}

impl<'a> TableScan<'a> {
    pub fn new(table: &'a Table, rid: Rid) -> Self {
        Self { table, rid }
    }

    /// Position the next call to [`next_record`](Self::next_record) will
    /// examine first.
    pub fn position(&self) -> Rid {
        self.rid
    }

    /// Advance to the next record that is not deleted and is visible to
    /// command `cid` of transaction `xid` under `isolation_level`.
    ///
    /// Returns `Ok(None)` at the end of the chain; further calls keep
    /// returning `Ok(None)`. A page that is unformatted or links to itself
    /// ends the scan with `Error::CorruptedPage`.
    pub fn next_record(
        &mut self,
        xid: Xid,
        isolation_level: IsolationLevel,
        cid: Cid,
        active_xids: &HashSet<Xid>,
    ) -> Result<Option<Record>> {
        let table = self.table;
        while self.rid.page_id.is_valid() {
            let mut guard = table
                .buffer_pool()
                .get_page(table.oid(), table.db_oid(), self.rid.page_id)?;
            let page = guard.table_page();
            let record_count = page.record_count();

            while u32::from(self.rid.slot_id) < record_count {
                let rid = self.rid;
                self.rid.slot_id += 1;

                let record = page.get_record(rid, table.column_list())?;
                if record.is_deleted() {
                    trace!("scan {}: {:?} deleted", table.oid(), rid);
                    continue;
                }
                if !is_visible(record.header(), xid, isolation_level, cid, active_xids) {
                    trace!("scan {}: {:?} invisible to xid {}", table.oid(), rid, xid);
                    continue;
                }
                return Ok(Some(record));
            }

            let next = match page.next_in_chain(self.rid.page_id) {
                Ok(next) => next,
                Err(e) => {
                    self.rid = Rid::new(PageId::INVALID, 0);
                    return Err(e);
                }
            };
            trace!("scan {}: {} -> {}", table.oid(), self.rid.page_id, next);
            self.rid = Rid::new(next, 0);
        }
        Ok(None)
    }
}

impl Iterator for TableScan<'_> {
    type Item = Result<Record>;

    /// Every live record regardless of transaction state.
    fn next(&mut self) -> Option<Self::Item> {
        self.next_record(0, IsolationLevel::ReadUncommitted, 0, &HashSet::new())
            .transpose()
    }
}
