//! Redo and rollback passes over the log.

use std::collections::BTreeMap;

use log::{debug, info};

use super::log_manager::LogManager;
use super::log_record::{LogBody, LogRecord, LogType};
use crate::buffer::BufferPool;
use crate::catalog::Catalog;
use crate::common::{Error, Lsn, Result, Xid};

/// Replay `records` in order.
///
/// Each record is applied only if its page has not seen it yet, so running
/// redo again over the same records changes nothing.
pub fn redo(records: &[(Lsn, LogRecord)], pool: &BufferPool, catalog: &dyn Catalog) -> Result<()> {
    for (lsn, record) in records {
        record.redo(*lsn, pool, catalog)?;
    }
    debug!("redo: replayed {} records", records.len());
    Ok(())
}

/// Roll back every change of `xid` and log its abort.
///
/// Walks the transaction's records from the newest, undoing inserts and
/// deletes. A compensation record sends the walk to its `undo_next_lsn`,
/// so work undone by an earlier, interrupted rollback is not undone twice.
/// A transaction whose last record is already an abort is left alone.
///
/// # Errors
/// `Error::InvalidLogRecord` if the chain points at a missing record.
pub fn rollback(
    xid: Xid,
    pool: &BufferPool,
    catalog: &dyn Catalog,
    log_manager: &dyn LogManager,
) -> Result<()> {
    let mut lsn = log_manager.last_lsn(xid);
    if let Some(last) = log_manager.record(lsn)? {
        if last.log_type() == LogType::Abort {
            debug!("rollback xid={}: already aborted", xid);
            return Ok(());
        }
    }

    let mut undone = 0;
    while !lsn.is_null() {
        let record = log_manager.record(lsn)?.ok_or_else(|| {
            Error::InvalidLogRecord(format!("xid {} chain points at missing {}", xid, lsn))
        })?;
        lsn = match &record.body {
            LogBody::Compensation { undo_next_lsn, .. } => *undo_next_lsn,
            _ => {
                if matches!(record.log_type(), LogType::Insert | LogType::Delete) {
                    undone += 1;
                }
                record.undo(lsn, pool, catalog, log_manager)?;
                record.prev_lsn
            }
        };
    }

    log_manager.append(xid, LogBody::Abort)?;
    debug!("rollback xid={}: undid {} records", xid, undone);
    Ok(())
}

/// Bring the pool back to a transaction-consistent state after a crash.
///
/// Replays the whole log, then rolls back every transaction that neither
/// committed nor aborted. Returns the rolled back xids in ascending order.
pub fn recover(
    pool: &BufferPool,
    catalog: &dyn Catalog,
    log_manager: &dyn LogManager,
) -> Result<Vec<Xid>> {
    let records = log_manager.records()?;
    redo(&records, pool, catalog)?;

    let mut last_type: BTreeMap<Xid, LogType> = BTreeMap::new();
    for (_, record) in &records {
        if record.log_type() != LogType::Checkpoint {
            last_type.insert(record.xid, record.log_type());
        }
    }
    let losers: Vec<Xid> = last_type
        .into_iter()
        .filter(|(_, t)| !matches!(t, LogType::Commit | LogType::Abort))
        .map(|(xid, _)| xid)
        .collect();

    for &xid in losers.iter().rev() {
        rollback(xid, pool, catalog, log_manager)?;
    }
    info!(
        "recovery: replayed {} records, rolled back {} transactions",
        records.len(),
        losers.len()
    );
    Ok(losers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::common::config::StorageConfig;
    use crate::common::{PageId, Rid};
    use crate::recovery::MemoryLogManager;
    use crate::storage::DiskManager;
    use crate::table::{Column, ColumnList, ColumnType, Record, Table, Value};
    use std::sync::Arc;
    use tempfile::tempdir;

    const TEST_PAGE_SIZE: usize = 256;

    struct Fixture {
        pool: Arc<BufferPool>,
        log: Arc<MemoryLogManager>,
        catalog: MemoryCatalog,
        table: Table,
        _dir: tempfile::TempDir,
    }

    fn setup() -> Fixture {
        let dir = tempdir().unwrap();
        let dm = DiskManager::new(dir.path(), TEST_PAGE_SIZE).unwrap();
        let log = Arc::new(MemoryLogManager::new());
        let pool = Arc::new(
            BufferPool::new(dm, log.clone(), StorageConfig::new(TEST_PAGE_SIZE, 8)).unwrap(),
        );
        let columns = ColumnList::new(vec![Column::new("id", ColumnType::Int)]);
        let catalog = MemoryCatalog::new();
        catalog.create_table(1, 10, columns.clone());
        let table = Table::new(pool.clone(), log.clone(), 1, 10, columns, PageId::INVALID);
        Fixture {
            pool,
            log,
            catalog,
            table,
            _dir: dir,
        }
    }

    fn row(id: i32) -> Record {
        Record::new(vec![Value::Int(id)])
    }

    #[test]
    fn test_rollback_insert_and_delete() {
        let f = setup();
        let kept = f.table.insert_record(row(1), 1, 0, true).unwrap();
        f.log.append(1, LogBody::Commit).unwrap();

        let added = f.table.insert_record(row(2), 2, 0, true).unwrap();
        f.table.delete_record(kept, 2, true).unwrap();

        rollback(2, &f.pool, &f.catalog, f.log.as_ref()).unwrap();

        assert!(!f.table.get_record(kept).unwrap().is_deleted());
        assert!(f.table.get_record(added).unwrap().is_deleted());

        let (_, last) = f.log.records().unwrap().pop().unwrap();
        assert_eq!(last.log_type(), LogType::Abort);
        assert_eq!(last.xid, 2);
    }

    #[test]
    fn test_rollback_twice_is_noop() {
        let f = setup();
        f.table.insert_record(row(1), 3, 0, true).unwrap();
        rollback(3, &f.pool, &f.catalog, f.log.as_ref()).unwrap();
        let len = f.log.len();

        rollback(3, &f.pool, &f.catalog, f.log.as_ref()).unwrap();
        assert_eq!(f.log.len(), len);
    }

    #[test]
    fn test_rollback_resumes_after_compensation() {
        let f = setup();
        let first = f.table.insert_record(row(1), 4, 0, true).unwrap();
        let second = f.table.insert_record(row(2), 4, 0, true).unwrap();

        // A rollback that stopped after undoing the newest record
        let last = f.log.last_lsn(4);
        let record = f.log.record(last).unwrap().unwrap();
        record.undo(last, &f.pool, &f.catalog, f.log.as_ref()).unwrap();

        rollback(4, &f.pool, &f.catalog, f.log.as_ref()).unwrap();
        assert!(f.table.get_record(first).unwrap().is_deleted());
        assert!(f.table.get_record(second).unwrap().is_deleted());

        let compensations = f
            .log
            .records()
            .unwrap()
            .iter()
            .filter(|(_, r)| r.log_type() == LogType::Compensation)
            .count();
        assert_eq!(compensations, 2);
    }

    #[test]
    fn test_redo_after_crash() {
        let f = setup();
        let a = f.table.insert_record(row(1), 1, 0, true).unwrap();
        let b = f.table.insert_record(row(2), 1, 0, true).unwrap();
        f.table.delete_record(a, 1, true).unwrap();
        f.log.append(1, LogBody::Commit).unwrap();
        f.log.flush_all();

        // Lose every page without writing it back
        f.pool.clear();
        assert!(matches!(
            f.table.get_record(a),
            Err(Error::PageNotFound { .. }) | Err(Error::InvalidSlot { .. })
        ));

        let records = f.log.records().unwrap();
        redo(&records, &f.pool, &f.catalog).unwrap();
        assert!(f.table.get_record(a).unwrap().is_deleted());
        assert_eq!(f.table.get_record(b).unwrap().value(0), Some(&Value::Int(2)));

        // Second pass changes nothing
        let before = f.table.get_record(b).unwrap();
        redo(&records, &f.pool, &f.catalog).unwrap();
        assert_eq!(f.table.get_record(b).unwrap(), before);
        let mut guard = f.pool.get_page(10, 1, PageId::new(0)).unwrap();
        assert_eq!(guard.table_page().record_count(), 2);
    }

    #[test]
    fn test_redo_skips_dropped_table() {
        let f = setup();
        f.table.insert_record(row(1), 1, 0, true).unwrap();
        f.pool.clear();
        f.catalog.drop_table(10).unwrap();

        let records = f.log.records().unwrap();
        redo(&records, &f.pool, &f.catalog).unwrap();
        assert!(!f.pool.is_resident(10, PageId::new(0)));
    }

    #[test]
    fn test_recover_rolls_back_losers() {
        let f = setup();
        let committed = f.table.insert_record(row(1), 1, 0, true).unwrap();
        f.log.append(1, LogBody::Commit).unwrap();
        let loser = f.table.insert_record(row(2), 2, 0, true).unwrap();
        f.log.flush_all();
        f.pool.clear();

        let losers = recover(&f.pool, &f.catalog, f.log.as_ref()).unwrap();
        assert_eq!(losers, vec![2]);
        assert!(!f.table.get_record(committed).unwrap().is_deleted());
        assert!(f.table.get_record(loser).unwrap().is_deleted());
        assert_eq!(loser, Rid::new(PageId::new(0), 1));

        // Nothing left to roll back
        assert!(recover(&f.pool, &f.catalog, f.log.as_ref()).unwrap().is_empty());
    }

    #[test]
    fn test_undo_of_missing_slot_logs_nothing() {
        let f = setup();
        f.table.insert_record(row(1), 6, 0, true).unwrap();
        let last = f.log.last_lsn(6);
        let len = f.log.len();

        let stray = LogRecord::new(
            6,
            last,
            LogBody::Delete {
                oid: 10,
                page_id: PageId::new(0),
                slot_id: 9,
            },
        );
        let result = stray.undo(Lsn::new(len as u64 + 1), &f.pool, &f.catalog, f.log.as_ref());

        assert!(matches!(result, Err(Error::InvalidSlot { slot_id: 9, .. })));
        assert_eq!(f.log.len(), len);
    }
}
