//! Records: an MVCC header followed by encoded column values.

use super::column::ColumnList;
use super::value::Value;
use crate::common::{Cid, Error, Result, Rid, Xid, NULL_XID};
use crate::storage::page::{read_u32, read_u64};

/// Per-record transaction metadata.
///
/// # Layout (21 bytes, little-endian)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       1     deleted (0 or 1)
/// 1       8     xmin   - creating transaction
/// 9       8     xmax   - deleting transaction, 0 while live
/// 17      4     cid    - command id of the insert
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordHeader {
    pub deleted: bool,
    pub xmin: Xid,
    pub xmax: Xid,
    pub cid: Cid,
}

impl RecordHeader {
    pub const SIZE: usize = 21;

    pub const OFFSET_DELETED: usize = 0;
    pub const OFFSET_XMIN: usize = 1;
    pub const OFFSET_XMAX: usize = 9;
    pub const OFFSET_CID: usize = 17;

    /// Decode a header from the start of `data`.
    ///
    /// # Errors
    /// `Error::CorruptedPage` if `data` is shorter than the header or the
    /// deleted flag is not 0/1.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::CorruptedPage(format!(
                "record of {} bytes is shorter than its header",
                data.len()
            )));
        }
        let deleted = match data[Self::OFFSET_DELETED] {
            0 => false,
            1 => true,
            other => {
                return Err(Error::CorruptedPage(format!(
                    "invalid deleted flag {:#04x}",
                    other
                )))
            }
        };
        Ok(Self {
            deleted,
            xmin: read_u64(data, Self::OFFSET_XMIN),
            xmax: read_u64(data, Self::OFFSET_XMAX),
            cid: read_u32(data, Self::OFFSET_CID),
        })
    }

    /// Encode this header into the start of `data`.
    ///
    /// # Panics
    /// Panics if `data.len() < RecordHeader::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for RecordHeader");
        data[Self::OFFSET_DELETED] = u8::from(self.deleted);
        data[Self::OFFSET_XMIN..Self::OFFSET_XMIN + 8].copy_from_slice(&self.xmin.to_le_bytes());
        data[Self::OFFSET_XMAX..Self::OFFSET_XMAX + 8].copy_from_slice(&self.xmax.to_le_bytes());
        data[Self::OFFSET_CID..Self::OFFSET_CID + 4].copy_from_slice(&self.cid.to_le_bytes());
    }
}

/// A row: header, values in schema order, and where it is stored.
///
/// The rid is not part of the encoding; it is stamped when the record is
/// read back from a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    header: RecordHeader,
    values: Vec<Value>,
    rid: Rid,
}

impl Record {
    /// A live record with a zeroed header and no location yet.
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            header: RecordHeader::default(),
            values,
            rid: Rid::INVALID,
        }
    }

    pub fn header(&self) -> &RecordHeader {
        &self.header
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn rid(&self) -> Rid {
        self.rid
    }

    pub fn set_rid(&mut self, rid: Rid) {
        self.rid = rid;
    }

    pub fn is_deleted(&self) -> bool {
        self.header.deleted
    }

    pub fn set_deleted(&mut self, deleted: bool) {
        self.header.deleted = deleted;
    }

    pub fn xmin(&self) -> Xid {
        self.header.xmin
    }

    pub fn xmax(&self) -> Xid {
        self.header.xmax
    }

    pub fn cid(&self) -> Cid {
        self.header.cid
    }

    /// Stamp the creating transaction and command, clearing any deletion.
    pub fn stamp_insert(&mut self, xid: Xid, cid: Cid) {
        self.header = RecordHeader {
            deleted: false,
            xmin: xid,
            xmax: NULL_XID,
            cid,
        };
    }

    /// Encoded size of header plus values.
    pub fn size(&self) -> usize {
        RecordHeader::SIZE + self.values.iter().map(Value::encoded_size).sum::<usize>()
    }

    /// Encode the record.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; RecordHeader::SIZE];
        self.header.write_to(&mut out);
        out.reserve(self.size() - RecordHeader::SIZE);
        for value in &self.values {
            value.encode(&mut out);
        }
        out
    }

    /// Decode a record laid out per `column_list`.
    ///
    /// Trailing bytes after the last value are ignored.
    ///
    /// # Errors
    /// `Error::CorruptedPage` if the bytes do not match the schema.
    pub fn from_bytes(data: &[u8], column_list: &ColumnList) -> Result<Self> {
        let header = RecordHeader::from_bytes(data)?;
        let mut offset = RecordHeader::SIZE;
        let mut values = Vec::with_capacity(column_list.len());
        for column in column_list.iter() {
            let (value, used) = Value::decode(&data[offset..], column.column_type)?;
            values.push(value);
            offset += used;
        }
        Ok(Self {
            header,
            values,
            rid: Rid::INVALID,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::PageId;
    use crate::table::{Column, ColumnType};

    fn schema() -> ColumnList {
        ColumnList::new(vec![
            Column::new("id", ColumnType::Int),
            Column::new("name", ColumnType::Varchar),
            Column::new("score", ColumnType::Double),
        ])
    }

    #[test]
    fn test_header_layout() {
        let header = RecordHeader {
            deleted: true,
            xmin: 0x0807060504030201,
            xmax: 2,
            cid: 0x0A0B0C0D,
        };
        let mut buf = [0u8; RecordHeader::SIZE];
        header.write_to(&mut buf);

        assert_eq!(buf[0], 1);
        assert_eq!(&buf[1..9], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&buf[17..21], &[0x0D, 0x0C, 0x0B, 0x0A]);
        assert_eq!(RecordHeader::from_bytes(&buf).unwrap(), header);
    }

    #[test]
    fn test_record_size_matches_encoding() {
        let mut record = Record::new(vec![
            Value::Int(1),
            Value::Varchar("abc".to_string()),
            Value::Null,
        ]);
        record.stamp_insert(5, 2);

        let bytes = record.to_bytes();
        assert_eq!(bytes.len(), record.size());
        assert_eq!(record.size(), 21 + 5 + 8 + 1);

        let decoded = Record::from_bytes(&bytes, &schema()).unwrap();
        assert_eq!(decoded.values(), record.values());
        assert_eq!(decoded.xmin(), 5);
        assert_eq!(decoded.cid(), 2);
        assert!(!decoded.is_deleted());
        assert_eq!(decoded.rid(), Rid::INVALID);
    }

    #[test]
    fn test_stamp_insert_clears_deletion() {
        let mut record = Record::new(vec![Value::Int(1)]);
        record.set_deleted(true);
        record.stamp_insert(9, 0);
        assert!(!record.is_deleted());
        assert_eq!(record.xmax(), NULL_XID);
    }

    #[test]
    fn test_set_rid() {
        let mut record = Record::new(vec![]);
        record.set_rid(Rid::new(PageId::new(2), 3));
        assert_eq!(record.rid(), Rid::new(PageId::new(2), 3));
    }

    #[test]
    fn test_short_header_is_corruption() {
        assert!(matches!(
            RecordHeader::from_bytes(&[0u8; 10]),
            Err(Error::CorruptedPage(_))
        ));
    }
}
