//! Error types for the SQLite accessor runtime.
//!
//! Provides a unified error type covering database access, identifier
//! validation, row decoding, and numeric narrowing failures.

use thiserror::Error;

/// Errors that can occur while executing generated accessors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite database operation failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Schema derivation or lookup failure from the core registry.
    #[error("schema error: {0}")]
    Schema(#[from] relmap_core::SchemaError),

    /// A table or column name contains characters other than alphanumerics
    /// and underscores.
    #[error("invalid identifier '{0}': must contain only alphanumeric characters and underscores")]
    InvalidIdentifier(String),

    /// A filter or ordering referenced a column the entity does not have.
    #[error("table '{table}' has no column '{column}'")]
    UnknownColumn {
        /// Table being queried.
        table: String,
        /// The unknown column name.
        column: String,
    },

    /// A key-based operation was requested on an entity with no primary key.
    #[error("entity '{0}' declares no primary key")]
    MissingPrimaryKey(String),

    /// A runtime table-name override was supplied for an entity that did
    /// not opt into dynamic naming.
    #[error("entity '{0}' does not allow a runtime table name")]
    NotDynamic(String),

    /// An insert/update/delete affected zero rows and duplicate-ignoring
    /// was not requested.
    #[error("{operation} on '{table}' affected no rows")]
    NoRowsAffected {
        /// Table the statement ran against.
        table: String,
        /// Operation verb for diagnostics.
        operation: &'static str,
    },

    /// A wider stored integer cannot be represented in the declared type.
    #[error("value {value} does not fit in {target}")]
    Narrowing {
        /// The stored 64-bit value.
        value: i64,
        /// Name of the declared target type.
        target: &'static str,
    },

    /// A stored value had an unexpected storage class for its column.
    #[error("column {index}: expected {expected}")]
    TypeMismatch {
        /// Zero-based column ordinal.
        index: usize,
        /// Expected storage class or type name.
        expected: &'static str,
    },

    /// A row reader indexed past the end of the decoded row.
    #[error("column index {0} out of range")]
    ColumnIndex(usize),

    /// A stored text value failed to decode into its declared type.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
