//! Error types for schema extraction and registry operations.

use thiserror::Error;

/// Errors that can occur while deriving entities from type definitions.
///
/// Extraction faults are fatal for the entity being derived but do not
/// affect other registered types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A primary-key annotation names a column that differs from its field.
    #[error("type '{type_name}': primary key annotation '{annotated}' does not match field '{field}'")]
    KeyNameMismatch {
        /// Type being extracted.
        type_name: String,
        /// Name of the annotated field.
        field: String,
        /// Column name carried by the annotation.
        annotated: String,
    },

    /// More than one field of a type is annotated as the primary key.
    #[error("type '{0}': more than one primary key annotation")]
    DuplicatePrimaryKey(String),

    /// A type was registered twice under the same name.
    #[error("duplicate type definition for '{0}'")]
    DuplicateType(String),

    /// A requested type or entity is not present in the registry.
    #[error("unknown type '{0}'")]
    UnknownType(String),

    /// An index specification names a column the entity does not have.
    #[error("type '{type_name}': index references unknown column '{column}'")]
    UnknownIndexColumn {
        /// Type being extracted.
        type_name: String,
        /// The missing column name.
        column: String,
    },

    /// An FTS mirror declaration references a column the entity does not have.
    #[error("type '{type_name}': FTS mirror references unknown column '{column}'")]
    UnknownFtsColumn {
        /// Type being extracted.
        type_name: String,
        /// The missing column name.
        column: String,
    },
}

/// Convenience alias for results with [`SchemaError`].
pub type Result<T> = std::result::Result<T, SchemaError>;
