//! Value conversion between model fields and SQLite storage.
//!
//! Covers the three encode strategies the type mapper assigns — direct,
//! enum-as-text (member name), and JSON-as-text — plus explicit numeric
//! narrowing and the rusqlite parameter/column bridging for [`Value`].
//!
//! JSON encoding is deliberately degraded-but-non-fatal: a value that
//! cannot be serialized stores as NULL (logged at `warn`) so one bad value
//! cannot abort a generation pass or a bulk operation.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::value::Value;

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(i) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Owned(rusqlite::types::Value::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(
                std::str::from_utf8(t)
                    .map_err(|e| FromSqlError::Other(Box::new(e)))?
                    .to_string(),
            ),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        })
    }
}

/// Encodes an opaque or collection value as JSON text.
///
/// An encode failure stores NULL instead of propagating, so batches
/// complete row-by-row.
pub fn encode_json<T: Serialize>(value: &T) -> Value {
    match serde_json::to_string(value) {
        Ok(text) => Value::Text(text),
        Err(error) => {
            warn!(%error, "JSON encode failed; storing NULL");
            Value::Null
        }
    }
}

/// Encodes a nullable opaque or collection value.
pub fn encode_opt_json<T: Serialize>(value: &Option<T>) -> Value {
    match value {
        Some(v) => encode_json(v),
        None => Value::Null,
    }
}

/// Decodes JSON text into the declared type.
pub fn decode_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| StoreError::Decode(e.to_string()))
}

/// Encodes an enum as its member name.
///
/// Only unit-style members produce a bare name; anything else degrades to
/// NULL like a failed JSON encode.
pub fn encode_enum<T: Serialize>(value: &T) -> Value {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(name)) => Value::Text(name),
        Ok(other) => {
            warn!(value = %other, "enum did not serialize to a bare name; storing NULL");
            Value::Null
        }
        Err(error) => {
            warn!(%error, "enum encode failed; storing NULL");
            Value::Null
        }
    }
}

/// Decodes an enum from its stored member name.
pub fn decode_enum<T: DeserializeOwned>(name: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(name.to_string()))
        .map_err(|e| StoreError::Decode(format!("unknown enum member '{name}': {e}")))
}

/// Encodes a timestamp as RFC 3339 text.
pub fn encode_datetime(value: &DateTime<Utc>) -> Value {
    Value::Text(value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Decodes an RFC 3339 timestamp.
pub fn decode_datetime(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Decode(format!("invalid timestamp '{text}': {e}")))
}

/// Encodes a GUID as hyphenated text.
pub fn encode_guid(value: &Uuid) -> Value {
    Value::Text(value.hyphenated().to_string())
}

/// Decodes a hyphenated GUID.
pub fn decode_guid(text: &str) -> Result<Uuid> {
    Uuid::parse_str(text).map_err(|e| StoreError::Decode(format!("invalid GUID '{text}': {e}")))
}

macro_rules! narrow_fn {
    ($name:ident, $target:ty) => {
        #[doc = concat!("Narrows a stored 64-bit integer to `", stringify!($target), "`.")]
        ///
        /// Returns a typed failure when the value cannot be represented;
        /// never truncates silently.
        pub fn $name(value: i64) -> Result<$target> {
            <$target>::try_from(value).map_err(|_| StoreError::Narrowing {
                value,
                target: stringify!($target),
            })
        }
    };
}

narrow_fn!(narrow_i8, i8);
narrow_fn!(narrow_i16, i16);
narrow_fn!(narrow_i32, i32);
narrow_fn!(narrow_u8, u8);
narrow_fn!(narrow_u16, u16);
narrow_fn!(narrow_u32, u32);
narrow_fn!(narrow_u64, u64);

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    enum Status {
        Draft,
        Published,
    }

    #[test]
    fn test_enum_round_trip_by_name() {
        let encoded = encode_enum(&Status::Published);
        assert_eq!(encoded, Value::Text("Published".to_string()));

        let decoded: Status = decode_enum("Draft").unwrap();
        assert_eq!(decoded, Status::Draft);
    }

    #[test]
    fn test_unknown_enum_member_is_decode_error() {
        let err = decode_enum::<Status>("Archived").unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[test]
    fn test_json_round_trip() {
        let tags = vec!["x".to_string(), "y".to_string()];
        let encoded = encode_json(&tags);
        let Value::Text(text) = &encoded else {
            panic!("expected text");
        };
        let decoded: Vec<String> = decode_json(text).unwrap();
        assert_eq!(decoded, tags);
    }

    #[test]
    fn test_unencodable_json_degrades_to_null() {
        // A map with non-string keys fails serde_json serialization.
        let mut bad = std::collections::HashMap::new();
        bad.insert(vec![1u8], "v");
        assert_eq!(encode_json(&bad), Value::Null);
    }

    #[test]
    fn test_datetime_round_trip() {
        let now = Utc::now();
        let encoded = encode_datetime(&now);
        let Value::Text(text) = &encoded else {
            panic!("expected text");
        };
        let decoded = decode_datetime(text).unwrap();
        assert_eq!(decoded.timestamp_micros(), now.timestamp_micros());
    }

    #[test]
    fn test_guid_round_trip() {
        let id = Uuid::new_v4();
        let encoded = encode_guid(&id);
        let Value::Text(text) = &encoded else {
            panic!("expected text");
        };
        assert_eq!(decode_guid(text).unwrap(), id);
    }

    #[test]
    fn test_narrowing_bounds() {
        assert_eq!(narrow_i32(i64::from(i32::MAX)).unwrap(), i32::MAX);
        assert!(narrow_i32(i64::from(i32::MAX) + 1).is_err());
        assert!(narrow_u32(-1).is_err());
        assert!(narrow_u64(-1).is_err());
        assert_eq!(narrow_u64(5).unwrap(), 5);
    }
}
