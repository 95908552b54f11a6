//! Type mapper: semantic types to storage affinities and encodings.
//!
//! The mapper is a closed enumeration of known scalar kinds plus a JSON
//! fallback arm for everything else. It never refuses to map a type: an
//! unknown/opaque type stores as `TEXT` via JSON serialization, and enums
//! store as the member's name (avoiding numeric-versioning hazards across
//! schema evolution).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::FieldType;

/// SQLite storage affinity of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Affinity {
    /// `INTEGER` storage.
    Integer,
    /// `REAL` storage.
    Real,
    /// `TEXT` storage.
    Text,
    /// `BLOB` storage.
    Blob,
}

impl Affinity {
    /// SQL keyword for this affinity.
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
        }
    }
}

impl fmt::Display for Affinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Encode/decode strategy for moving a value through storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    /// Value stores as-is under its affinity.
    Direct,
    /// Enum member name as text, decoded via name lookup.
    EnumName,
    /// JSON serialization to text. An encode failure degrades to NULL
    /// rather than aborting the surrounding operation.
    Json,
}

/// Maps a semantic type to its storage affinity.
///
/// # Examples
///
/// ```
/// use relmap_core::{mapper, Affinity, FieldType};
///
/// assert_eq!(mapper::affinity(&FieldType::Bool), Affinity::Integer);
/// assert_eq!(mapper::affinity(&FieldType::Float64), Affinity::Real);
/// assert_eq!(mapper::affinity(&FieldType::Opaque("Settings".into())), Affinity::Text);
/// ```
pub fn affinity(ty: &FieldType) -> Affinity {
    match ty {
        FieldType::Bool
        | FieldType::Int8
        | FieldType::Int16
        | FieldType::Int32
        | FieldType::Int64
        | FieldType::UInt8
        | FieldType::UInt16
        | FieldType::UInt32
        | FieldType::UInt64 => Affinity::Integer,
        FieldType::Float32 | FieldType::Float64 => Affinity::Real,
        // Decimal keeps its canonical text form; REAL would silently round.
        FieldType::Decimal
        | FieldType::DateTime
        | FieldType::Guid
        | FieldType::Uri
        | FieldType::Char
        | FieldType::Text
        | FieldType::Enum(_)
        | FieldType::List(_)
        | FieldType::Opaque(_) => Affinity::Text,
        FieldType::Bytes => Affinity::Blob,
    }
}

/// Maps a semantic type to its encode/decode strategy.
pub fn encoding(ty: &FieldType) -> Encoding {
    match ty {
        FieldType::Enum(_) => Encoding::EnumName,
        FieldType::List(_) | FieldType::Opaque(_) => Encoding::Json,
        _ => Encoding::Direct,
    }
}

/// Whether the type is a 64-bit-or-narrower integer kind.
///
/// Identity (store-assigned) key values are honored only for these.
pub fn is_integer(ty: &FieldType) -> bool {
    matches!(
        ty,
        FieldType::Int8
            | FieldType::Int16
            | FieldType::Int32
            | FieldType::Int64
            | FieldType::UInt8
            | FieldType::UInt16
            | FieldType::UInt32
            | FieldType::UInt64
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_kinds_map_to_integer() {
        for ty in [
            FieldType::Bool,
            FieldType::Int8,
            FieldType::Int64,
            FieldType::UInt8,
            FieldType::UInt64,
        ] {
            assert_eq!(affinity(&ty), Affinity::Integer, "{ty:?}");
        }
    }

    #[test]
    fn test_floats_map_to_real() {
        assert_eq!(affinity(&FieldType::Float32), Affinity::Real);
        assert_eq!(affinity(&FieldType::Float64), Affinity::Real);
    }

    #[test]
    fn test_decimal_maps_to_text() {
        assert_eq!(affinity(&FieldType::Decimal), Affinity::Text);
    }

    #[test]
    fn test_enum_maps_to_text_regardless_of_representation() {
        let ty = FieldType::Enum("Status".into());
        assert_eq!(affinity(&ty), Affinity::Text);
        assert_eq!(encoding(&ty), Encoding::EnumName);
    }

    #[test]
    fn test_opaque_falls_back_to_json_text() {
        let ty = FieldType::Opaque("ReviewSettings".into());
        assert_eq!(affinity(&ty), Affinity::Text);
        assert_eq!(encoding(&ty), Encoding::Json);

        let list = FieldType::List(Box::new(FieldType::Text));
        assert_eq!(affinity(&list), Affinity::Text);
        assert_eq!(encoding(&list), Encoding::Json);
    }

    #[test]
    fn test_bytes_map_to_blob() {
        assert_eq!(affinity(&FieldType::Bytes), Affinity::Blob);
        assert_eq!(encoding(&FieldType::Bytes), Encoding::Direct);
    }

    #[test]
    fn test_identity_eligibility() {
        assert!(is_integer(&FieldType::Int32));
        assert!(is_integer(&FieldType::UInt16));
        assert!(!is_integer(&FieldType::Bool));
        assert!(!is_integer(&FieldType::Guid));
        assert!(!is_integer(&FieldType::Text));
    }

    #[test]
    fn test_affinity_sql_keywords() {
        assert_eq!(Affinity::Integer.to_string(), "INTEGER");
        assert_eq!(Affinity::Real.to_string(), "REAL");
        assert_eq!(Affinity::Text.to_string(), "TEXT");
        assert_eq!(Affinity::Blob.to_string(), "BLOB");
    }
}
