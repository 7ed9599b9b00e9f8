//! Column values and their byte encoding.
//!
//! Every value starts with a null-marker byte (`1` = NULL). A non-null
//! value is followed by its payload, little-endian:
//!
//! ```text
//! Bool     1 byte (0 or 1)
//! Int      4 bytes
//! BigInt   8 bytes
//! Double   8 bytes (IEEE 754 bits)
//! Varchar  u32 length + UTF-8 bytes
//! ```

use std::fmt;

use super::column::ColumnType;
use crate::common::{Error, Result};

const NULL_MARKER: u8 = 1;
const NOT_NULL_MARKER: u8 = 0;

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    BigInt(i64),
    Double(f64),
    Varchar(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Encoded size including the null marker.
    pub fn encoded_size(&self) -> usize {
        1 + match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 4,
            Value::BigInt(_) | Value::Double(_) => 8,
            Value::Varchar(s) => 4 + s.len(),
        }
    }

    /// Whether this value may be stored in a column of `column_type`.
    pub fn matches(&self, column_type: ColumnType) -> bool {
        matches!(
            (self, column_type),
            (Value::Null, _)
                | (Value::Bool(_), ColumnType::Bool)
                | (Value::Int(_), ColumnType::Int)
                | (Value::BigInt(_), ColumnType::BigInt)
                | (Value::Double(_), ColumnType::Double)
                | (Value::Varchar(_), ColumnType::Varchar)
        )
    }

    /// Append the encoding of this value to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        if self.is_null() {
            out.push(NULL_MARKER);
            return;
        }
        out.push(NOT_NULL_MARKER);
        match self {
            Value::Null => {}
            Value::Bool(b) => out.push(u8::from(*b)),
            Value::Int(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::BigInt(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Double(v) => out.extend_from_slice(&v.to_bits().to_le_bytes()),
            Value::Varchar(s) => {
                out.extend_from_slice(&(s.len() as u32).to_le_bytes());
                out.extend_from_slice(s.as_bytes());
            }
        }
    }

    /// Decode a value of `column_type` from the front of `data`.
    ///
    /// Returns the value and the number of bytes consumed.
    ///
    /// # Errors
    /// `Error::CorruptedPage` if `data` is truncated or the marker, bool or
    /// UTF-8 bytes are malformed.
    pub fn decode(data: &[u8], column_type: ColumnType) -> Result<(Value, usize)> {
        let marker = *data
            .first()
            .ok_or_else(|| Error::CorruptedPage("record truncated before value".to_string()))?;
        match marker {
            NULL_MARKER => return Ok((Value::Null, 1)),
            NOT_NULL_MARKER => {}
            other => {
                return Err(Error::CorruptedPage(format!(
                    "invalid null marker {:#04x}",
                    other
                )))
            }
        }

        let payload = &data[1..];
        let (value, len) = match column_type {
            ColumnType::Bool => match take::<1>(payload)? {
                [0] => (Value::Bool(false), 1),
                [1] => (Value::Bool(true), 1),
                [b] => return Err(Error::CorruptedPage(format!("invalid bool byte {}", b))),
            },
            ColumnType::Int => (Value::Int(i32::from_le_bytes(take::<4>(payload)?)), 4),
            ColumnType::BigInt => (Value::BigInt(i64::from_le_bytes(take::<8>(payload)?)), 8),
            ColumnType::Double => (
                Value::Double(f64::from_bits(u64::from_le_bytes(take::<8>(payload)?))),
                8,
            ),
            ColumnType::Varchar => {
                let len = u32::from_le_bytes(take::<4>(payload)?) as usize;
                let bytes = payload
                    .get(4..4 + len)
                    .ok_or_else(|| Error::CorruptedPage("varchar truncated".to_string()))?;
                let s = String::from_utf8(bytes.to_vec())
                    .map_err(|e| Error::CorruptedPage(format!("varchar is not UTF-8: {}", e)))?;
                (Value::Varchar(s), 4 + len)
            }
        };
        Ok((value, 1 + len))
    }
}

fn take<const N: usize>(data: &[u8]) -> Result<[u8; N]> {
    data.get(..N)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| Error::CorruptedPage("record truncated inside value".to_string()))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(v) => write!(f, "{}", v),
            Value::BigInt(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Varchar(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Varchar(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Varchar(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: Value, column_type: ColumnType) {
        let mut buf = Vec::new();
        value.encode(&mut buf);
        assert_eq!(buf.len(), value.encoded_size());

        let (decoded, used) = Value::decode(&buf, column_type).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(used, buf.len());
    }

    #[test]
    fn test_encode_decode_each_type() {
        roundtrip(Value::Bool(true), ColumnType::Bool);
        roundtrip(Value::Int(-17), ColumnType::Int);
        roundtrip(Value::BigInt(i64::MAX), ColumnType::BigInt);
        roundtrip(Value::Double(2.5), ColumnType::Double);
        roundtrip(Value::Varchar("héllo".to_string()), ColumnType::Varchar);
        roundtrip(Value::Null, ColumnType::Varchar);
    }

    #[test]
    fn test_int_byte_layout() {
        let mut buf = Vec::new();
        Value::Int(0x01020304).encode(&mut buf);
        assert_eq!(buf, vec![0, 4, 3, 2, 1]);

        buf.clear();
        Value::Null.encode(&mut buf);
        assert_eq!(buf, vec![1]);
    }

    #[test]
    fn test_decode_truncated() {
        let mut buf = Vec::new();
        Value::Varchar("abcdef".to_string()).encode(&mut buf);
        buf.truncate(buf.len() - 2);

        assert!(matches!(
            Value::decode(&buf, ColumnType::Varchar),
            Err(Error::CorruptedPage(_))
        ));
        assert!(Value::decode(&[], ColumnType::Int).is_err());
    }

    #[test]
    fn test_decode_bad_marker() {
        assert!(Value::decode(&[7, 0, 0, 0, 0], ColumnType::Int).is_err());
    }

    #[test]
    fn test_matches() {
        assert!(Value::Int(1).matches(ColumnType::Int));
        assert!(Value::Null.matches(ColumnType::Double));
        assert!(!Value::Int(1).matches(ColumnType::BigInt));
    }
}
