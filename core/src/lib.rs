//! Core schema model and entity extraction for relmap.
//!
//! This crate turns declaratively annotated type definitions into derived
//! relational schema models:
//!
//! - [`TypeDef`] / [`FieldDef`] — the annotation surface: table markers,
//!   primary/foreign keys, uniqueness, ignored fields, index groups, FTS
//!   mirror declarations.
//! - [`mapper`] — the type mapper: semantic types to storage affinities
//!   (`INTEGER`/`REAL`/`TEXT`/`BLOB`) and encode strategies (direct,
//!   enum-as-text, JSON-as-text), with an opaque/JSON fallback arm.
//! - [`extract`] — the schema model extractor: flattens fields across a
//!   single-inheritance chain into an ordered [`Entity`] column list.
//! - [`SchemaRegistry`] / [`Schema`] — register definitions once at process
//!   start, derive every [`Entity`] and [`FtsEntity`] in one memoized pass.
//!
//! Generation is pure and side-effect free; the storage runtime lives in
//! the companion `relmap-sqlite` crate.
//!
//! # Example
//!
//! ```
//! use relmap_core::*;
//!
//! let mut registry = SchemaRegistry::new();
//! registry.register(
//!     TypeDef::table("Widget")
//!         .field(FieldDef::new("Id", FieldType::Int32).primary_key("Id", true))
//!         .field(FieldDef::new("Name", FieldType::Text))
//!         .field(FieldDef::new("Tags", FieldType::List(Box::new(FieldType::Text))).nullable())
//!         .fts_mirror(&["Id"]),
//! ).unwrap();
//!
//! let schema = registry.build().unwrap();
//! let widget = schema.entity("Widget").unwrap();
//! assert_eq!(widget.columns.len(), 3);
//! assert!(widget.has_identity());
//! ```

mod error;
mod extract;
pub mod mapper;
mod registry;
mod types;

pub use error::{Result, SchemaError};
pub use extract::extract;
pub use mapper::{Affinity, Encoding};
pub use registry::{Schema, SchemaRegistry};
pub use types::*;
