//! Runtime storage values and typed row readers.
//!
//! [`Value`] is the storage-class bridge between model fields and SQLite
//! parameters; [`RowValues`] wraps one decoded row and offers typed getters
//! with explicit narrowing. [`KeyValue`] is the hashable/orderable subset
//! used to key dictionary selects.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::convert;
use crate::error::{Result, StoreError};

/// One storage-class value bound to or read from a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// INTEGER storage.
    Integer(i64),
    /// REAL storage.
    Real(f64),
    /// TEXT storage.
    Text(String),
    /// BLOB storage.
    Blob(Vec<u8>),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Primary-key value usable as a dictionary key.
///
/// Dictionary selects key rows by the entity's primary key; real keys are
/// integers or text (GUIDs and opaque keys store as text). Synthetic keys
/// for entities without a declared primary key are zero-based integers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyValue {
    /// Integer key.
    Integer(i64),
    /// Text key.
    Text(String),
}

impl KeyValue {
    /// Converts a storage value into a dictionary key, if representable.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(i) => Some(Self::Integer(*i)),
            Value::Text(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }
}

/// Alias for the dictionary-select result shape.
pub type KeyedRows<M> = BTreeMap<KeyValue, M>;

/// One decoded row with typed, index-based getters.
///
/// Indexes follow the entity's column order, which is fixed at extraction
/// time. Getters return typed errors on storage-class mismatches and on
/// narrowing failures — never silent truncation.
#[derive(Debug, Clone)]
pub struct RowValues {
    values: Vec<Value>,
}

impl RowValues {
    /// Wraps an already-decoded value list.
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Number of columns in the row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value at the given ordinal.
    pub fn value(&self, index: usize) -> Result<&Value> {
        self.values
            .get(index)
            .ok_or(StoreError::ColumnIndex(index))
    }

    /// Whether the value at the ordinal is NULL.
    pub fn is_null(&self, index: usize) -> Result<bool> {
        Ok(matches!(self.value(index)?, Value::Null))
    }

    /// 64-bit integer getter.
    pub fn i64(&self, index: usize) -> Result<i64> {
        match self.value(index)? {
            Value::Integer(i) => Ok(*i),
            _ => Err(StoreError::TypeMismatch {
                index,
                expected: "INTEGER",
            }),
        }
    }

    /// Nullable 64-bit integer getter.
    pub fn opt_i64(&self, index: usize) -> Result<Option<i64>> {
        match self.value(index)? {
            Value::Null => Ok(None),
            Value::Integer(i) => Ok(Some(*i)),
            _ => Err(StoreError::TypeMismatch {
                index,
                expected: "INTEGER",
            }),
        }
    }

    /// 32-bit integer getter with explicit narrowing.
    pub fn i32(&self, index: usize) -> Result<i32> {
        convert::narrow_i32(self.i64(index)?)
    }

    /// 16-bit integer getter with explicit narrowing.
    pub fn i16(&self, index: usize) -> Result<i16> {
        convert::narrow_i16(self.i64(index)?)
    }

    /// Unsigned 32-bit getter with explicit narrowing.
    pub fn u32(&self, index: usize) -> Result<u32> {
        convert::narrow_u32(self.i64(index)?)
    }

    /// Boolean getter (stored as 0/1).
    pub fn bool(&self, index: usize) -> Result<bool> {
        Ok(self.i64(index)? != 0)
    }

    /// Float getter; integer storage widens without error.
    pub fn f64(&self, index: usize) -> Result<f64> {
        match self.value(index)? {
            Value::Real(f) => Ok(*f),
            Value::Integer(i) => Ok(*i as f64),
            _ => Err(StoreError::TypeMismatch {
                index,
                expected: "REAL",
            }),
        }
    }

    /// Text getter.
    pub fn text(&self, index: usize) -> Result<&str> {
        match self.value(index)? {
            Value::Text(s) => Ok(s),
            _ => Err(StoreError::TypeMismatch {
                index,
                expected: "TEXT",
            }),
        }
    }

    /// Nullable text getter.
    pub fn opt_text(&self, index: usize) -> Result<Option<&str>> {
        match self.value(index)? {
            Value::Null => Ok(None),
            Value::Text(s) => Ok(Some(s)),
            _ => Err(StoreError::TypeMismatch {
                index,
                expected: "TEXT",
            }),
        }
    }

    /// Blob getter.
    pub fn blob(&self, index: usize) -> Result<&[u8]> {
        match self.value(index)? {
            Value::Blob(b) => Ok(b),
            _ => Err(StoreError::TypeMismatch {
                index,
                expected: "BLOB",
            }),
        }
    }

    /// Timestamp getter (RFC 3339 text).
    pub fn datetime(&self, index: usize) -> Result<DateTime<Utc>> {
        convert::decode_datetime(self.text(index)?)
    }

    /// GUID getter (hyphenated text).
    pub fn guid(&self, index: usize) -> Result<Uuid> {
        convert::decode_guid(self.text(index)?)
    }

    /// Enum getter, decoded from the stored member name.
    pub fn enum_name<T: DeserializeOwned>(&self, index: usize) -> Result<T> {
        convert::decode_enum(self.text(index)?)
    }

    /// JSON getter for opaque and collection columns.
    pub fn json<T: DeserializeOwned>(&self, index: usize) -> Result<T> {
        convert::decode_json(self.text(index)?)
    }

    /// Nullable JSON getter.
    pub fn opt_json<T: DeserializeOwned>(&self, index: usize) -> Result<Option<T>> {
        match self.opt_text(index)? {
            None => Ok(None),
            Some(text) => Ok(Some(convert::decode_json(text)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> RowValues {
        RowValues::new(vec![
            Value::Integer(7),
            Value::Text("hello".to_string()),
            Value::Null,
            Value::Real(1.5),
        ])
    }

    #[test]
    fn test_typed_getters() {
        let row = row();
        assert_eq!(row.i64(0).unwrap(), 7);
        assert_eq!(row.text(1).unwrap(), "hello");
        assert_eq!(row.opt_text(2).unwrap(), None);
        assert_eq!(row.f64(3).unwrap(), 1.5);
        assert!(row.is_null(2).unwrap());
    }

    #[test]
    fn test_out_of_range_index() {
        let err = row().i64(9).unwrap_err();
        assert!(matches!(err, StoreError::ColumnIndex(9)));
    }

    #[test]
    fn test_storage_class_mismatch() {
        let err = row().i64(1).unwrap_err();
        assert!(matches!(err, StoreError::TypeMismatch { index: 1, .. }));
    }

    #[test]
    fn test_narrowing_rejects_unrepresentable() {
        let row = RowValues::new(vec![Value::Integer(i64::from(i32::MAX) + 1)]);
        let err = row.i32(0).unwrap_err();
        assert!(matches!(err, StoreError::Narrowing { .. }));

        let row = RowValues::new(vec![Value::Integer(42)]);
        assert_eq!(row.i32(0).unwrap(), 42);
    }

    #[test]
    fn test_integer_widens_to_f64() {
        let row = RowValues::new(vec![Value::Integer(3)]);
        assert_eq!(row.f64(0).unwrap(), 3.0);
    }

    #[test]
    fn test_key_value_from_value() {
        assert_eq!(
            KeyValue::from_value(&Value::Integer(1)),
            Some(KeyValue::Integer(1))
        );
        assert_eq!(
            KeyValue::from_value(&Value::Text("k".into())),
            Some(KeyValue::Text("k".into()))
        );
        assert_eq!(KeyValue::from_value(&Value::Null), None);
        assert_eq!(KeyValue::from_value(&Value::Real(1.0)), None);
    }

    #[test]
    fn test_option_into_value() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(5i64)), Value::Integer(5));
    }
}
