//! Log manager interface and an in-memory implementation.
//!
//! The buffer pool and the table layer only see the [`LogManager`] trait.
//! [`MemoryLogManager`] keeps the log as a byte buffer of framed records:
//!
//! ```text
//! +-------------+-------------+-------------------------+
//! | length: u32 | crc32: u32  | serialized LogRecord    |
//! +-------------+-------------+-------------------------+
//! ```
//!
//! LSNs are 1-based positions in the frame sequence. A durable-LSN
//! watermark stands in for an fsync'd log file: everything at or below it
//! survives [`MemoryLogManager::crash`], everything above it is lost.

use std::collections::HashMap;

use log::{debug, trace};
use parking_lot::Mutex;

use super::log_record::{LogBody, LogRecord};
use crate::common::{Error, Lsn, Oid, PageId, Result, Xid};

/// What the storage layer needs from the write-ahead log.
pub trait LogManager: Send + Sync {
    /// Append a record for `xid`, chained to the transaction's previous
    /// record, and return its LSN.
    fn append(&self, xid: Xid, body: LogBody) -> Result<Lsn>;

    /// LSN of the last record appended by `xid`; `Lsn::NULL` if none.
    fn last_lsn(&self, xid: Xid) -> Lsn;

    /// Make the log durable up to `page_lsn` before `page_id` of
    /// `table_oid` is written back. Must not return earlier.
    fn flush_page(&self, table_oid: Oid, page_id: PageId, page_lsn: Lsn) -> Result<()>;

    /// Highest LSN known to be durable.
    fn durable_lsn(&self) -> Lsn;

    /// Read back the record at `lsn`; `None` if no such record exists.
    fn record(&self, lsn: Lsn) -> Result<Option<LogRecord>>;

    /// Every record in LSN order.
    fn records(&self) -> Result<Vec<(Lsn, LogRecord)>>;
}

const FRAME_HEADER_SIZE: usize = 8;

#[derive(Debug, Default)]
struct LogState {
    /// Concatenated frames.
    buffer: Vec<u8>,
    /// Start of each frame in `buffer`; frame `i` has LSN `i + 1`.
    offsets: Vec<usize>,
    /// Last LSN per transaction.
    last_lsn: HashMap<Xid, Lsn>,
    durable_lsn: Lsn,
}

impl LogState {
    fn next_lsn(&self) -> Lsn {
        Lsn(self.offsets.len() as u64 + 1)
    }

    fn frame(&self, lsn: Lsn) -> Option<&[u8]> {
        if lsn.is_null() {
            return None;
        }
        let index = (lsn.0 - 1) as usize;
        let start = *self.offsets.get(index)?;
        let end = self
            .offsets
            .get(index + 1)
            .copied()
            .unwrap_or(self.buffer.len());
        Some(&self.buffer[start..end])
    }
}

/// In-memory write-ahead log with CRC32-checked frames.
///
/// # Example
/// ```
/// use heapstore::recovery::{LogBody, LogManager, MemoryLogManager};
/// use heapstore::Lsn;
///
/// let log = MemoryLogManager::new();
/// let begin = log.append(1, LogBody::Begin).unwrap();
/// let commit = log.append(1, LogBody::Commit).unwrap();
///
/// assert_eq!(begin, Lsn::new(1));
/// assert_eq!(log.record(commit).unwrap().unwrap().prev_lsn, begin);
/// ```
#[derive(Debug, Default)]
pub struct MemoryLogManager {
    state: Mutex<LogState>,
}

impl MemoryLogManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in the log.
    pub fn len(&self) -> usize {
        self.state.lock().offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// LSN the next append will get.
    pub fn next_lsn(&self) -> Lsn {
        self.state.lock().next_lsn()
    }

    /// Make every appended record durable (commit path).
    pub fn flush_all(&self) {
        let mut state = self.state.lock();
        state.durable_lsn = Lsn(state.offsets.len() as u64);
    }

    /// Drop every record above the durable watermark.
    ///
    /// Per-transaction chains are rebuilt from the surviving records.
    pub fn crash(&self) -> Result<()> {
        let mut state = self.state.lock();
        let keep = state.durable_lsn.0 as usize;
        if keep < state.offsets.len() {
            let cut = state.offsets[keep];
            state.buffer.truncate(cut);
            state.offsets.truncate(keep);
        }

        let mut last_lsn = HashMap::new();
        for index in 0..state.offsets.len() {
            let lsn = Lsn(index as u64 + 1);
            if let Some(frame) = state.frame(lsn) {
                last_lsn.insert(decode_frame(lsn, frame)?.xid, lsn);
            }
        }
        debug!(
            "log crash: kept {} records up to {}",
            state.offsets.len(),
            state.durable_lsn
        );
        state.last_lsn = last_lsn;
        Ok(())
    }

    /// Raw framed bytes of the whole log.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.state.lock().buffer.clone()
    }

    /// Rebuild a log from bytes produced by [`MemoryLogManager::to_bytes`].
    ///
    /// All loaded records are durable.
    ///
    /// # Errors
    /// `Error::InvalidLogRecord` on a truncated frame or checksum mismatch.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut state = LogState::default();
        let mut pos = 0;
        while pos < bytes.len() {
            let lsn = state.next_lsn();
            let header = bytes.get(pos..pos + FRAME_HEADER_SIZE).ok_or_else(|| {
                Error::InvalidLogRecord(format!("truncated frame header at {}", lsn))
            })?;
            let mut len_bytes = [0u8; 4];
            len_bytes.copy_from_slice(&header[0..4]);
            let end = pos + FRAME_HEADER_SIZE + u32::from_le_bytes(len_bytes) as usize;
            let frame = bytes
                .get(pos..end)
                .ok_or_else(|| Error::InvalidLogRecord(format!("truncated frame at {}", lsn)))?;
            let record = decode_frame(lsn, frame)?;

            state.buffer.extend_from_slice(frame);
            state.offsets.push(pos);
            state.last_lsn.insert(record.xid, lsn);
            pos = end;
        }
        state.durable_lsn = Lsn(state.offsets.len() as u64);
        Ok(Self {
            state: Mutex::new(state),
        })
    }
}

fn encode_frame(record: &LogRecord) -> Vec<u8> {
    let payload = record.serialize();
    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    frame
}

fn decode_frame(lsn: Lsn, frame: &[u8]) -> Result<LogRecord> {
    if frame.len() < FRAME_HEADER_SIZE {
        return Err(Error::InvalidLogRecord(format!("truncated frame at {}", lsn)));
    }
    let mut crc_bytes = [0u8; 4];
    crc_bytes.copy_from_slice(&frame[4..8]);
    let payload = &frame[FRAME_HEADER_SIZE..];
    if crc32fast::hash(payload) != u32::from_le_bytes(crc_bytes) {
        return Err(Error::InvalidLogRecord(format!("checksum mismatch at {}", lsn)));
    }
    LogRecord::deserialize(payload)
}

impl LogManager for MemoryLogManager {
    fn append(&self, xid: Xid, body: LogBody) -> Result<Lsn> {
        let mut state = self.state.lock();
        let lsn = state.next_lsn();
        let prev_lsn = state.last_lsn.get(&xid).copied().unwrap_or(Lsn::NULL);
        let record = LogRecord::new(xid, prev_lsn, body);

        let frame = encode_frame(&record);
        let offset = state.buffer.len();
        state.buffer.extend_from_slice(&frame);
        state.offsets.push(offset);
        state.last_lsn.insert(xid, lsn);

        trace!("append {} {:?} xid={} prev={}", lsn, record.log_type(), xid, prev_lsn);
        Ok(lsn)
    }

    fn last_lsn(&self, xid: Xid) -> Lsn {
        self.state
            .lock()
            .last_lsn
            .get(&xid)
            .copied()
            .unwrap_or(Lsn::NULL)
    }

    fn flush_page(&self, table_oid: Oid, page_id: PageId, page_lsn: Lsn) -> Result<()> {
        let mut state = self.state.lock();
        let last = Lsn(state.offsets.len() as u64);
        let target = page_lsn.min(last);
        if target > state.durable_lsn {
            debug!(
                "log flush for {} of table {}: durable {} -> {}",
                page_id, table_oid, state.durable_lsn, target
            );
            state.durable_lsn = target;
        }
        Ok(())
    }

    fn durable_lsn(&self) -> Lsn {
        self.state.lock().durable_lsn
    }

    fn record(&self, lsn: Lsn) -> Result<Option<LogRecord>> {
        let state = self.state.lock();
        match state.frame(lsn) {
            Some(frame) => decode_frame(lsn, frame).map(Some),
            None => Ok(None),
        }
    }

    fn records(&self) -> Result<Vec<(Lsn, LogRecord)>> {
        let state = self.state.lock();
        (0..state.offsets.len())
            .map(|index| {
                let lsn = Lsn(index as u64 + 1);
                let frame = state
                    .frame(lsn)
                    .ok_or_else(|| Error::InvalidLogRecord(format!("missing frame {}", lsn)))?;
                Ok((lsn, decode_frame(lsn, frame)?))
            })
            .collect()
    }
}
