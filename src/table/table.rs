//! Tables: records stored in a singly linked chain of table pages.

use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use super::column::ColumnList;
use super::record::Record;
use super::table_scan::TableScan;
use crate::buffer::BufferPool;
use crate::common::{Cid, Error, Lsn, Oid, PageId, Result, Rid, SlotId, Xid};
use crate::recovery::{LogBody, LogManager};
use crate::storage::page::{PAGE_HEADER_SIZE, SLOT_SIZE};

/// A heap table.
///
/// Pages are numbered densely from 0: the first page is created on the
/// first insert and every new page gets the id after the current last one
/// and is linked from it through `next_page_id`.
///
/// Every mutating operation takes a `write_log` flag. With logging on, the
/// log record is appended before the page changes and the page LSN is
/// raised to the record's LSN.
///
/// Inserts run concurrently; extending the chain past its last page is
/// serialized by `grow_lock`, taken while holding no page guard.
pub struct Table {
    pool: Arc<BufferPool>,
    log_manager: Arc<dyn LogManager>,
    db_oid: Oid,
    oid: Oid,
    column_list: ColumnList,
    first_page_id: Mutex<PageId>,
    grow_lock: Mutex<()>,
}

impl Table {
    /// A table whose chain starts at `first_page_id` (`PageId::INVALID`
    /// for an empty table).
    pub fn new(
        pool: Arc<BufferPool>,
        log_manager: Arc<dyn LogManager>,
        db_oid: Oid,
        oid: Oid,
        column_list: ColumnList,
        first_page_id: PageId,
    ) -> Self {
        Self {
            pool,
            log_manager,
            db_oid,
            oid,
            column_list,
            first_page_id: Mutex::new(first_page_id),
            grow_lock: Mutex::new(()),
        }
    }

    /// Open a table that may already have pages on disk.
    ///
    /// # Errors
    /// Propagates I/O errors other than the table having no first page.
    pub fn open(
        pool: Arc<BufferPool>,
        log_manager: Arc<dyn LogManager>,
        db_oid: Oid,
        oid: Oid,
        column_list: ColumnList,
    ) -> Result<Self> {
        let first = PageId::new(0);
        let first_page_id = match pool.get_page(oid, db_oid, first) {
            Ok(_) => first,
            Err(Error::PageNotFound { .. }) => PageId::INVALID,
            Err(e) => return Err(e),
        };
        Ok(Self::new(
            pool,
            log_manager,
            db_oid,
            oid,
            column_list,
            first_page_id,
        ))
    }

    #[inline]
    pub fn oid(&self) -> Oid {
        self.oid
    }

    #[inline]
    pub fn db_oid(&self) -> Oid {
        self.db_oid
    }

    #[inline]
    pub fn column_list(&self) -> &ColumnList {
        &self.column_list
    }

    pub fn first_page_id(&self) -> PageId {
        *self.first_page_id.lock()
    }

    pub fn buffer_pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Largest record that fits on an empty page.
    pub fn max_record_size(&self) -> usize {
        self.pool.config().page_size - PAGE_HEADER_SIZE - SLOT_SIZE
    }

    /// Scan the table from its first record.
    pub fn scan(&self) -> TableScan<'_> {
        TableScan::new(self, Rid::new(self.first_page_id(), 0))
    }

    // ========================================================================
    // Record operations
    // ========================================================================

    /// Insert `record` on behalf of command `cid` of transaction `xid`.
    ///
    /// Uses the first page in the chain with enough free space, growing the
    /// chain when none has.
    ///
    /// # Errors
    /// - `Error::SchemaMismatch` if the values do not fit the columns
    /// - `Error::RecordTooLarge` if the record cannot fit on any page
    ///
    /// Both are reported before anything is logged or modified.
    pub fn insert_record(&self, mut record: Record, xid: Xid, cid: Cid, write_log: bool) -> Result<Rid> {
        let size = self.check_record(&record)?;

        let mut page_id = {
            let mut first = self.first_page_id.lock();
            if !first.is_valid() {
                self.create_page(PageId::INVALID, PageId::new(0), xid, write_log)?;
                *first = PageId::new(0);
            }
            *first
        };

        loop {
            let mut guard = self.pool.get_page(self.oid, self.db_oid, page_id)?;
            let mut page = guard.table_page();

            if page.free_space() >= size {
                let slot_id = page.record_count() as SlotId;
                let lsn = if write_log {
                    record.stamp_insert(xid, cid);
                    Some(self.log_manager.append(
                        xid,
                        LogBody::Insert {
                            oid: self.oid,
                            page_id,
                            slot_id,
                            page_offset: page.upper() - size as u32,
                            record: record.to_bytes(),
                        },
                    )?)
                } else {
                    None
                };

                let inserted = page.insert_record(&mut record, xid, cid)?;
                debug_assert_eq!(inserted, slot_id);
                if let Some(lsn) = lsn {
                    page.advance_page_lsn(lsn);
                }
                return Ok(Rid::new(page_id, inserted));
            }

            let next = page.next_in_chain(page_id)?;
            drop(guard);
            page_id = if next.is_valid() {
                next
            } else {
                self.grow_chain(page_id, xid, write_log)?
            };
        }
    }

    /// Size of `record` once stored, after checking it against the schema
    /// and the page size.
    fn check_record(&self, record: &Record) -> Result<usize> {
        let values = record.values();
        if values.len() != self.column_list.len() {
            return Err(Error::SchemaMismatch(format!(
                "expected {} values, got {}",
                self.column_list.len(),
                values.len()
            )));
        }
        for (value, column) in values.iter().zip(self.column_list.iter()) {
            if !value.matches(column.column_type) {
                return Err(Error::SchemaMismatch(format!(
                    "{:?} does not fit column {} of type {:?}",
                    value, column.name, column.column_type
                )));
            }
        }

        let size = record.size();
        let max = self.max_record_size();
        if size > max {
            return Err(Error::RecordTooLarge { size, max });
        }
        Ok(size)
    }

    /// The page after `last_page_id`, creating it if `last_page_id` still
    /// ends the chain once `grow_lock` is held.
    fn grow_chain(&self, last_page_id: PageId, xid: Xid, write_log: bool) -> Result<PageId> {
        let _growing = self.grow_lock.lock();
        let next = self
            .pool
            .get_page(self.oid, self.db_oid, last_page_id)?
            .table_page()
            .next_in_chain(last_page_id)?;
        if next.is_valid() {
            return Ok(next);
        }

        let page_id = last_page_id.next();
        self.create_page(last_page_id, page_id, xid, write_log)?;
        Ok(page_id)
    }

    /// Append `page_id` to the chain after `prev_page_id`.
    fn create_page(&self, prev_page_id: PageId, page_id: PageId, xid: Xid, write_log: bool) -> Result<()> {
        let lsn = if write_log {
            self.log_manager.append(
                xid,
                LogBody::NewPage {
                    oid: self.oid,
                    prev_page_id,
                    page_id,
                },
            )?
        } else {
            Lsn::NULL
        };

        {
            let mut guard = self.pool.new_page(self.oid, self.db_oid, page_id)?;
            let mut page = guard.table_page();
            page.init();
            page.advance_page_lsn(lsn);
        }

        if prev_page_id.is_valid() {
            let mut guard = self.pool.get_page(self.oid, self.db_oid, prev_page_id)?;
            let mut page = guard.table_page();
            page.set_next_page_id(page_id);
            page.advance_page_lsn(lsn);
        }

        debug!(
            "table {}: chain grew {} -> {}",
            self.oid, prev_page_id, page_id
        );
        Ok(())
    }

    /// Mark the record at `rid` deleted by `xid`.
    ///
    /// # Errors
    /// `Error::InvalidSlot` if `rid` names no record; nothing is logged.
    pub fn delete_record(&self, rid: Rid, xid: Xid, write_log: bool) -> Result<()> {
        let mut guard = self.pool.get_page(self.oid, self.db_oid, rid.page_id)?;
        let mut page = guard.table_page();
        page.record_bytes(rid.slot_id)?;

        if write_log {
            let lsn = self.log_manager.append(
                xid,
                LogBody::Delete {
                    oid: self.oid,
                    page_id: rid.page_id,
                    slot_id: rid.slot_id,
                },
            )?;
            page.advance_page_lsn(lsn);
        }
        page.delete_record(rid.slot_id, xid)
    }

    /// Replace the record at `rid`: delete it, then insert `record`.
    ///
    /// Returns where the new version was stored. A record the insert would
    /// reject is rejected before the delete.
    pub fn update_record(
        &self,
        rid: Rid,
        xid: Xid,
        cid: Cid,
        record: Record,
        write_log: bool,
    ) -> Result<Rid> {
        self.check_record(&record)?;
        self.delete_record(rid, xid, write_log)?;
        self.insert_record(record, xid, cid, write_log)
    }

    /// Overwrite the stored bytes of `record` at its own rid. Not logged.
    ///
    /// # Panics
    /// Panics if the encoded size differs from the stored record's size.
    pub fn update_record_in_place(&self, record: &Record) -> Result<()> {
        let rid = record.rid();
        let mut guard = self.pool.get_page(self.oid, self.db_oid, rid.page_id)?;
        guard.table_page().update_record_in_place(record, rid.slot_id)
    }

    /// Read the record at `rid`, deleted or not.
    pub fn get_record(&self, rid: Rid) -> Result<Record> {
        let mut guard = self.pool.get_page(self.oid, self.db_oid, rid.page_id)?;
        let record = guard.table_page().get_record(rid, &self.column_list)?;
        Ok(record)
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("db_oid", &self.db_oid)
            .field("oid", &self.oid)
            .field("first_page_id", &self.first_page_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::StorageConfig;
    use crate::common::{Lsn, NULL_XID};
    use crate::recovery::{LogType, MemoryLogManager};
    use crate::storage::DiskManager;
    use crate::table::{Column, ColumnType, Value};
    use tempfile::tempdir;

    const TEST_PAGE_SIZE: usize = 256;

    fn setup() -> (Table, Arc<MemoryLogManager>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let dm = DiskManager::new(dir.path(), TEST_PAGE_SIZE).unwrap();
        let log = Arc::new(MemoryLogManager::new());
        let pool = Arc::new(
            BufferPool::new(dm, log.clone(), StorageConfig::new(TEST_PAGE_SIZE, 8)).unwrap(),
        );
        let columns = ColumnList::new(vec![
            Column::new("id", ColumnType::Int),
            Column::new("name", ColumnType::Varchar),
        ]);
        let table = Table::new(pool, log.clone(), 1, 100, columns, PageId::INVALID);
        (table, log, dir)
    }

    fn row(id: i32, name: &str) -> Record {
        Record::new(vec![Value::Int(id), Value::from(name)])
    }

    #[test]
    fn test_first_insert_creates_page_zero() {
        let (table, log, _dir) = setup();
        assert_eq!(table.first_page_id(), PageId::INVALID);

        let rid = table.insert_record(row(1, "a"), 1, 0, true).unwrap();
        assert_eq!(rid, Rid::new(PageId::new(0), 0));
        assert_eq!(table.first_page_id(), PageId::new(0));

        let records = log.records().unwrap();
        assert_eq!(records[0].1.log_type(), LogType::NewPage);
        assert_eq!(records[1].1.log_type(), LogType::Insert);
        assert_eq!(records[1].1.prev_lsn, Lsn::new(1));
    }

    #[test]
    fn test_insert_then_get() {
        let (table, _log, _dir) = setup();
        let rid = table.insert_record(row(7, "seven"), 3, 1, true).unwrap();

        let record = table.get_record(rid).unwrap();
        assert_eq!(record.values(), row(7, "seven").values());
        assert_eq!(record.xmin(), 3);
        assert_eq!(record.cid(), 1);
        assert_eq!(record.rid(), rid);
    }

    #[test]
    fn test_insert_logs_exact_page_bytes() {
        let (table, log, _dir) = setup();
        let rid = table.insert_record(row(1, "bytes"), 2, 0, true).unwrap();

        let (lsn, insert) = log.records().unwrap().pop().unwrap();
        match insert.body {
            LogBody::Insert {
                oid,
                page_id,
                slot_id,
                page_offset,
                record,
            } => {
                assert_eq!(oid, 100);
                assert_eq!(Rid::new(page_id, slot_id), rid);
                assert_eq!(page_offset as usize, TEST_PAGE_SIZE - record.len());
                let mut guard = table.buffer_pool().get_page(100, 1, page_id).unwrap();
                let page = guard.table_page();
                assert_eq!(page.record_bytes(slot_id).unwrap(), &record[..]);
                assert_eq!(page.page_lsn(), lsn);
            }
            other => panic!("expected insert, got {:?}", other),
        }
    }

    #[test]
    fn test_record_too_large() {
        let (table, log, _dir) = setup();
        let big = row(1, &"x".repeat(TEST_PAGE_SIZE));

        let err = table.insert_record(big, 1, 0, true).unwrap_err();
        assert!(matches!(err, Error::RecordTooLarge { max: 228, .. }));
        assert_eq!(table.first_page_id(), PageId::INVALID);
        assert!(log.is_empty());
    }

    #[test]
    fn test_schema_mismatch_rejected() {
        let (table, log, _dir) = setup();

        let empty = table.insert_record(Record::new(vec![]), 1, 0, true);
        assert!(matches!(empty, Err(Error::SchemaMismatch(_))));
        let swapped = Record::new(vec![Value::from("one"), Value::Int(1)]);
        let result = table.insert_record(swapped, 1, 0, true);
        assert!(matches!(result, Err(Error::SchemaMismatch(_))));
        assert!(log.is_empty());
        assert_eq!(table.first_page_id(), PageId::INVALID);

        // Nulls fit any column
        let nulls = Record::new(vec![Value::Null, Value::Null]);
        table.insert_record(nulls, 1, 0, false).unwrap();

        // The update is refused before the old version is deleted
        let rid = table.insert_record(row(1, "a"), 1, 0, true).unwrap();
        let logged = log.len();
        let bad = Record::new(vec![Value::BigInt(1), Value::from("a")]);
        assert!(matches!(
            table.update_record(rid, 1, 1, bad, true),
            Err(Error::SchemaMismatch(_))
        ));
        assert_eq!(log.len(), logged);
        assert!(!table.get_record(rid).unwrap().is_deleted());
    }

    #[test]
    fn test_chain_growth() {
        let (table, log, _dir) = setup();
        // 21 header + 5 int + 105 varchar = 131 bytes: one per page
        let name = "n".repeat(100);
        let first = table.insert_record(row(0, &name), 1, 0, true).unwrap();
        let second = table.insert_record(row(1, &name), 1, 0, true).unwrap();

        assert_eq!(first.page_id, PageId::new(0));
        assert_eq!(second, Rid::new(PageId::new(1), 0));

        let mut guard = table.buffer_pool().get_page(100, 1, PageId::new(0)).unwrap();
        assert_eq!(guard.table_page().next_page_id(), PageId::new(1));
        drop(guard);

        assert_eq!(table.get_record(first).unwrap().value(0), Some(&Value::Int(0)));
        assert_eq!(table.get_record(second).unwrap().value(0), Some(&Value::Int(1)));

        let new_pages = log
            .records()
            .unwrap()
            .into_iter()
            .filter(|(_, r)| r.log_type() == LogType::NewPage)
            .count();
        assert_eq!(new_pages, 2);
    }

    #[test]
    fn test_small_record_fills_earlier_page() {
        let (table, _log, _dir) = setup();
        let name = "n".repeat(100);
        table.insert_record(row(0, &name), 1, 0, false).unwrap();
        table.insert_record(row(1, &name), 1, 0, false).unwrap();

        // Page 0 still has room for a small record
        let rid = table.insert_record(row(2, "s"), 1, 0, false).unwrap();
        assert_eq!(rid, Rid::new(PageId::new(0), 1));
    }

    #[test]
    fn test_delete_record() {
        let (table, log, _dir) = setup();
        let rid = table.insert_record(row(1, "a"), 1, 0, true).unwrap();
        table.delete_record(rid, 2, true).unwrap();

        let record = table.get_record(rid).unwrap();
        assert!(record.is_deleted());
        assert_eq!(record.xmax(), 2);

        let (lsn, delete) = log.records().unwrap().pop().unwrap();
        assert_eq!(delete.log_type(), LogType::Delete);
        let mut guard = table.buffer_pool().get_page(100, 1, rid.page_id).unwrap();
        assert_eq!(guard.table_page().page_lsn(), lsn);
    }

    #[test]
    fn test_delete_invalid_slot_logs_nothing() {
        let (table, log, _dir) = setup();
        table.insert_record(row(1, "a"), 1, 0, true).unwrap();
        let before = log.len();

        let result = table.delete_record(Rid::new(PageId::new(0), 9), 1, true);
        assert!(matches!(result, Err(Error::InvalidSlot { .. })));
        assert_eq!(log.len(), before);
    }

    #[test]
    fn test_unlogged_operations() {
        let (table, log, _dir) = setup();
        let rid = table.insert_record(row(1, "a"), 1, 0, false).unwrap();
        table.delete_record(rid, 1, false).unwrap();
        assert!(log.is_empty());

        let mut guard = table.buffer_pool().get_page(100, 1, rid.page_id).unwrap();
        assert_eq!(guard.table_page().page_lsn(), Lsn::NULL);
    }

    #[test]
    fn test_update_record() {
        let (table, _log, _dir) = setup();
        let old = table.insert_record(row(1, "old"), 1, 0, true).unwrap();
        let new = table.update_record(old, 1, 1, row(1, "new"), true).unwrap();

        assert_ne!(old, new);
        assert!(table.get_record(old).unwrap().is_deleted());
        let updated = table.get_record(new).unwrap();
        assert_eq!(updated.value(1), Some(&Value::from("new")));
        assert_eq!(updated.cid(), 1);
    }

    #[test]
    fn test_update_record_in_place() {
        let (table, log, _dir) = setup();
        let rid = table.insert_record(row(1, "abc"), 1, 0, true).unwrap();
        let logged = log.len();

        let mut record = table.get_record(rid).unwrap();
        record.set_deleted(true);
        table.update_record_in_place(&record).unwrap();

        let stored = table.get_record(rid).unwrap();
        assert!(stored.is_deleted());
        assert_eq!(stored.xmax(), NULL_XID);
        assert_eq!(log.len(), logged);
    }

    #[test]
    fn test_open_existing_table() {
        let (table, log, _dir) = setup();
        assert_eq!(
            Table::open(table.pool.clone(), log.clone(), 1, 100, table.column_list().clone())
                .unwrap()
                .first_page_id(),
            PageId::INVALID
        );

        table.insert_record(row(1, "a"), 1, 0, true).unwrap();
        let reopened =
            Table::open(table.pool.clone(), log, 1, 100, table.column_list().clone()).unwrap();
        assert_eq!(reopened.first_page_id(), PageId::new(0));
    }
}
