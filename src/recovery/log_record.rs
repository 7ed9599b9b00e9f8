//! Write-ahead log records.
//!
//! Every record starts with a common header followed by a type-specific
//! payload, all little-endian:
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       1     type tag
//! 1       8     xid
//! 9       8     prev_lsn (previous record of the same transaction)
//! 17      ...   payload
//! ```
//!
//! | Type         | Payload                                                      |
//! |--------------|--------------------------------------------------------------|
//! | Insert       | oid u32, page_id u32, slot_id u16, page_offset u32, record_size u32, record bytes |
//! | Delete       | oid u32, page_id u32, slot_id u16                            |
//! | NewPage      | oid u32, prev_page_id u32, page_id u32                       |
//! | Begin/Commit/Abort | (none)                                                 |
//! | Checkpoint   | count u32, count × xid u64                                   |
//! | Compensation | undo_next_lsn u64, action u8, oid u32, page_id u32, slot_id u16 |

use log::debug;

use crate::buffer::BufferPool;
use crate::catalog::Catalog;
use crate::common::{Error, Lsn, Oid, PageId, Result, SlotId, Xid};

use super::log_manager::LogManager;

/// Type tag of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LogType {
    Insert = 1,
    Delete = 2,
    NewPage = 3,
    Begin = 4,
    Commit = 5,
    Abort = 6,
    Checkpoint = 7,
    Compensation = 8,
}

impl TryFrom<u8> for LogType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            1 => LogType::Insert,
            2 => LogType::Delete,
            3 => LogType::NewPage,
            4 => LogType::Begin,
            5 => LogType::Commit,
            6 => LogType::Abort,
            7 => LogType::Checkpoint,
            8 => LogType::Compensation,
            other => {
                return Err(Error::InvalidLogRecord(format!(
                    "unknown log type {}",
                    other
                )))
            }
        })
    }
}

/// The page change a compensation record re-applies on redo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoAction {
    /// An insert was undone: the record is marked deleted.
    UndoInsert {
        oid: Oid,
        page_id: PageId,
        slot_id: SlotId,
    },
    /// A delete was undone: the deleted flag is cleared.
    UndoDelete {
        oid: Oid,
        page_id: PageId,
        slot_id: SlotId,
    },
}

impl UndoAction {
    const TAG_UNDO_INSERT: u8 = 1;
    const TAG_UNDO_DELETE: u8 = 2;

    fn target(&self) -> (Oid, PageId, SlotId) {
        match *self {
            UndoAction::UndoInsert {
                oid,
                page_id,
                slot_id,
            }
            | UndoAction::UndoDelete {
                oid,
                page_id,
                slot_id,
            } => (oid, page_id, slot_id),
        }
    }
}

/// Type-specific part of a log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogBody {
    Insert {
        oid: Oid,
        page_id: PageId,
        slot_id: SlotId,
        page_offset: u32,
        record: Vec<u8>,
    },
    Delete {
        oid: Oid,
        page_id: PageId,
        slot_id: SlotId,
    },
    /// A page was appended to a table's chain after `prev_page_id`.
    NewPage {
        oid: Oid,
        prev_page_id: PageId,
        page_id: PageId,
    },
    Begin,
    Commit,
    Abort,
    Checkpoint {
        active_xids: Vec<Xid>,
    },
    /// Redo-only record describing an undo that already happened.
    Compensation {
        undo_next_lsn: Lsn,
        action: UndoAction,
    },
}

/// A log record: header fields plus the typed body.
///
/// The record's own LSN is not part of it; the log manager assigns LSNs on
/// append and hands them back alongside the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub xid: Xid,
    pub prev_lsn: Lsn,
    pub body: LogBody,
}

impl LogRecord {
    /// Size of the common header in bytes.
    pub const HEADER_SIZE: usize = 17;

    pub fn new(xid: Xid, prev_lsn: Lsn, body: LogBody) -> Self {
        Self {
            xid,
            prev_lsn,
            body,
        }
    }

    pub fn log_type(&self) -> LogType {
        match self.body {
            LogBody::Insert { .. } => LogType::Insert,
            LogBody::Delete { .. } => LogType::Delete,
            LogBody::NewPage { .. } => LogType::NewPage,
            LogBody::Begin => LogType::Begin,
            LogBody::Commit => LogType::Commit,
            LogBody::Abort => LogType::Abort,
            LogBody::Checkpoint { .. } => LogType::Checkpoint,
            LogBody::Compensation { .. } => LogType::Compensation,
        }
    }

    /// Table touched by this record, if it touches one.
    pub fn oid(&self) -> Option<Oid> {
        match &self.body {
            LogBody::Insert { oid, .. }
            | LogBody::Delete { oid, .. }
            | LogBody::NewPage { oid, .. } => Some(*oid),
            LogBody::Compensation { action, .. } => Some(action.target().0),
            _ => None,
        }
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        Self::HEADER_SIZE
            + match &self.body {
                LogBody::Insert { record, .. } => 4 + 4 + 2 + 4 + 4 + record.len(),
                LogBody::Delete { .. } => 4 + 4 + 2,
                LogBody::NewPage { .. } => 4 + 4 + 4,
                LogBody::Begin | LogBody::Commit | LogBody::Abort => 0,
                LogBody::Checkpoint { active_xids } => 4 + 8 * active_xids.len(),
                LogBody::Compensation { .. } => 8 + 1 + 4 + 4 + 2,
            }
    }

    // ========================================================================
    // Encoding
    // ========================================================================

    /// Encode the record.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size());
        out.push(self.log_type() as u8);
        out.extend_from_slice(&self.xid.to_le_bytes());
        out.extend_from_slice(&self.prev_lsn.0.to_le_bytes());

        match &self.body {
            LogBody::Insert {
                oid,
                page_id,
                slot_id,
                page_offset,
                record,
            } => {
                out.extend_from_slice(&oid.to_le_bytes());
                out.extend_from_slice(&page_id.to_le_bytes());
                out.extend_from_slice(&slot_id.to_le_bytes());
                out.extend_from_slice(&page_offset.to_le_bytes());
                out.extend_from_slice(&(record.len() as u32).to_le_bytes());
                out.extend_from_slice(record);
            }
            LogBody::Delete {
                oid,
                page_id,
                slot_id,
            } => {
                out.extend_from_slice(&oid.to_le_bytes());
                out.extend_from_slice(&page_id.to_le_bytes());
                out.extend_from_slice(&slot_id.to_le_bytes());
            }
            LogBody::NewPage {
                oid,
                prev_page_id,
                page_id,
            } => {
                out.extend_from_slice(&oid.to_le_bytes());
                out.extend_from_slice(&prev_page_id.to_le_bytes());
                out.extend_from_slice(&page_id.to_le_bytes());
            }
            LogBody::Begin | LogBody::Commit | LogBody::Abort => {}
            LogBody::Checkpoint { active_xids } => {
                out.extend_from_slice(&(active_xids.len() as u32).to_le_bytes());
                for xid in active_xids {
                    out.extend_from_slice(&xid.to_le_bytes());
                }
            }
            LogBody::Compensation {
                undo_next_lsn,
                action,
            } => {
                out.extend_from_slice(&undo_next_lsn.0.to_le_bytes());
                let tag = match action {
                    UndoAction::UndoInsert { .. } => UndoAction::TAG_UNDO_INSERT,
                    UndoAction::UndoDelete { .. } => UndoAction::TAG_UNDO_DELETE,
                };
                let (oid, page_id, slot_id) = action.target();
                out.push(tag);
                out.extend_from_slice(&oid.to_le_bytes());
                out.extend_from_slice(&page_id.to_le_bytes());
                out.extend_from_slice(&slot_id.to_le_bytes());
            }
        }

        debug_assert_eq!(out.len(), self.size());
        out
    }

    /// Decode a record produced by [`LogRecord::serialize`].
    ///
    /// # Errors
    /// `Error::InvalidLogRecord` on an unknown type tag, truncated input, or
    /// trailing bytes.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(data);
        let log_type = LogType::try_from(reader.u8()?)?;
        let xid = reader.u64()?;
        let prev_lsn = Lsn(reader.u64()?);

        let body = match log_type {
            LogType::Insert => {
                let oid = reader.u32()?;
                let page_id = PageId(reader.u32()?);
                let slot_id = reader.u16()?;
                let page_offset = reader.u32()?;
                let record_size = reader.u32()? as usize;
                let record = reader.bytes(record_size)?.to_vec();
                LogBody::Insert {
                    oid,
                    page_id,
                    slot_id,
                    page_offset,
                    record,
                }
            }
            LogType::Delete => LogBody::Delete {
                oid: reader.u32()?,
                page_id: PageId(reader.u32()?),
                slot_id: reader.u16()?,
            },
            LogType::NewPage => LogBody::NewPage {
                oid: reader.u32()?,
                prev_page_id: PageId(reader.u32()?),
                page_id: PageId(reader.u32()?),
            },
            LogType::Begin => LogBody::Begin,
            LogType::Commit => LogBody::Commit,
            LogType::Abort => LogBody::Abort,
            LogType::Checkpoint => {
                let count = reader.u32()? as usize;
                let mut active_xids = Vec::with_capacity(count.min(reader.remaining() / 8));
                for _ in 0..count {
                    active_xids.push(reader.u64()?);
                }
                LogBody::Checkpoint { active_xids }
            }
            LogType::Compensation => {
                let undo_next_lsn = Lsn(reader.u64()?);
                let tag = reader.u8()?;
                let oid = reader.u32()?;
                let page_id = PageId(reader.u32()?);
                let slot_id = reader.u16()?;
                let action = match tag {
                    UndoAction::TAG_UNDO_INSERT => UndoAction::UndoInsert {
                        oid,
                        page_id,
                        slot_id,
                    },
                    UndoAction::TAG_UNDO_DELETE => UndoAction::UndoDelete {
                        oid,
                        page_id,
                        slot_id,
                    },
                    other => {
                        return Err(Error::InvalidLogRecord(format!(
                            "unknown compensation action {}",
                            other
                        )))
                    }
                };
                LogBody::Compensation {
                    undo_next_lsn,
                    action,
                }
            }
        };

        if reader.remaining() != 0 {
            return Err(Error::InvalidLogRecord(format!(
                "{} trailing bytes after {:?} record",
                reader.remaining(),
                log_type
            )));
        }

        Ok(Self {
            xid,
            prev_lsn,
            body,
        })
    }

    // ========================================================================
    // Redo / Undo
    // ========================================================================

    /// Re-apply the page change of this record, which was logged at `lsn`.
    ///
    /// Skipped when the table no longer exists in the catalog or the page
    /// already reflects `lsn`. Records without a page change do nothing.
    pub fn redo(&self, lsn: Lsn, pool: &BufferPool, catalog: &dyn Catalog) -> Result<()> {
        let Some(oid) = self.oid() else {
            return Ok(());
        };
        let Some(db_oid) = catalog.database_oid(oid) else {
            debug!("redo {}: table {} dropped, skipping", lsn, oid);
            return Ok(());
        };

        match &self.body {
            LogBody::Insert {
                page_id,
                slot_id,
                page_offset,
                record,
                ..
            } => {
                let mut guard = pool.get_page(oid, db_oid, *page_id)?;
                let mut page = guard.table_page();
                if page.page_lsn() >= lsn {
                    return Ok(());
                }
                page.redo_insert_record(*slot_id, record, *page_offset, record.len() as u32)?;
                page.set_page_lsn(lsn);
                debug!("redo {}: insert into {} slot {}", lsn, page_id, slot_id);
            }
            LogBody::Delete {
                page_id, slot_id, ..
            } => {
                let mut guard = pool.get_page(oid, db_oid, *page_id)?;
                let mut page = guard.table_page();
                if page.page_lsn() >= lsn {
                    return Ok(());
                }
                page.delete_record(*slot_id, self.xid)?;
                page.set_page_lsn(lsn);
                debug!("redo {}: delete {} slot {}", lsn, page_id, slot_id);
            }
            LogBody::NewPage {
                prev_page_id,
                page_id,
                ..
            } => {
                {
                    let mut guard = match pool.get_page(oid, db_oid, *page_id) {
                        Ok(guard) => guard,
                        Err(Error::PageNotFound { .. }) => pool.new_page(oid, db_oid, *page_id)?,
                        Err(e) => return Err(e),
                    };
                    let mut page = guard.table_page();
                    if page.page_lsn() < lsn {
                        page.init();
                        page.set_page_lsn(lsn);
                        debug!("redo {}: new {} of table {}", lsn, page_id, oid);
                    }
                }
                if prev_page_id.is_valid() {
                    let mut guard = pool.get_page(oid, db_oid, *prev_page_id)?;
                    let mut page = guard.table_page();
                    if page.page_lsn() < lsn {
                        page.set_next_page_id(*page_id);
                        page.set_page_lsn(lsn);
                    }
                }
            }
            LogBody::Compensation { action, .. } => {
                let (_, page_id, slot_id) = action.target();
                let mut guard = pool.get_page(oid, db_oid, page_id)?;
                let mut page = guard.table_page();
                if page.page_lsn() >= lsn {
                    return Ok(());
                }
                match action {
                    UndoAction::UndoInsert { .. } => page.delete_record(slot_id, self.xid)?,
                    UndoAction::UndoDelete { .. } => page.undo_delete_record(slot_id)?,
                }
                page.set_page_lsn(lsn);
                debug!("redo {}: compensation {:?}", lsn, action);
            }
            LogBody::Begin | LogBody::Commit | LogBody::Abort | LogBody::Checkpoint { .. } => {}
        }
        Ok(())
    }

    /// Reverse the page change of this record, which was logged at `lsn`.
    ///
    /// Inserts are marked deleted and deletes are restored. Each undo
    /// appends a compensation record whose `undo_next_lsn` is this record's
    /// `prev_lsn`, and stamps the page with the compensation's LSN. Page
    /// allocation and transaction markers are not reversed.
    ///
    /// # Panics
    /// Panics when called on a compensation record; those are redo-only.
    pub fn undo(
        &self,
        lsn: Lsn,
        pool: &BufferPool,
        catalog: &dyn Catalog,
        log_manager: &dyn LogManager,
    ) -> Result<()> {
        assert!(
            !matches!(self.body, LogBody::Compensation { .. }),
            "compensation record at {} cannot be undone",
            lsn
        );

        let (action, oid, page_id, slot_id) = match self.body {
            LogBody::Insert {
                oid,
                page_id,
                slot_id,
                ..
            } => (
                UndoAction::UndoInsert {
                    oid,
                    page_id,
                    slot_id,
                },
                oid,
                page_id,
                slot_id,
            ),
            LogBody::Delete {
                oid,
                page_id,
                slot_id,
            } => (
                UndoAction::UndoDelete {
                    oid,
                    page_id,
                    slot_id,
                },
                oid,
                page_id,
                slot_id,
            ),
            _ => return Ok(()),
        };

        let Some(db_oid) = catalog.database_oid(oid) else {
            debug!("undo {}: table {} dropped, skipping", lsn, oid);
            return Ok(());
        };

        let mut guard = pool.get_page(oid, db_oid, page_id)?;
        let mut page = guard.table_page();
        page.record_bytes(slot_id)?;
        let clr_lsn = log_manager.append(
            self.xid,
            LogBody::Compensation {
                undo_next_lsn: self.prev_lsn,
                action,
            },
        )?;
        match action {
            UndoAction::UndoInsert { .. } => page.delete_record(slot_id, self.xid)?,
            UndoAction::UndoDelete { .. } => page.undo_delete_record(slot_id)?,
        }
        page.set_page_lsn(clr_lsn);
        debug!("undo {}: {:?} logged as {}", lsn, action, clr_lsn);
        Ok(())
    }
}

/// Bounds-checked little-endian cursor over a byte slice.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::InvalidLogRecord(format!(
                "truncated: need {} bytes at offset {}, have {}",
                len,
                self.pos,
                self.remaining()
            )));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }
}
