//! Multi-version visibility of records to a scanning transaction.

use std::collections::HashSet;
use std::fmt;

use super::record::RecordHeader;
use crate::common::{Cid, Xid};

/// Transaction isolation levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        };
        f.write_str(name)
    }
}

/// Whether a record created as described by `header` is visible to
/// command `cid` of transaction `xid`.
///
/// `active_xids` are the transactions in progress: for read committed the
/// set current at the call, for the snapshot levels the set captured when
/// the caller's snapshot was taken. The caller's own writes are visible
/// once a later command runs. The deleted flag is not considered here.
pub fn is_visible(
    header: &RecordHeader,
    xid: Xid,
    isolation_level: IsolationLevel,
    cid: Cid,
    active_xids: &HashSet<Xid>,
) -> bool {
    let own_earlier_write = header.xmin == xid && header.cid < cid;
    match isolation_level {
        IsolationLevel::ReadUncommitted => true,
        IsolationLevel::ReadCommitted => {
            own_earlier_write || (header.xmin != xid && !active_xids.contains(&header.xmin))
        }
        IsolationLevel::RepeatableRead | IsolationLevel::Serializable => {
            own_earlier_write || (header.xmin < xid && !active_xids.contains(&header.xmin))
        }
    }
}
