//! SQLite accessor runtime for mapped entities.
//!
//! This crate turns the entity models derived by
//! [`relmap_core`] into a working SQLite storage layer: generated DDL,
//! parameterized CRUD with both identity strategies, typed row decoding
//! with explicit narrowing, and derived FTS5 search mirrors.
//!
//! # Architecture
//!
//! - **`ddl`** — `CREATE TABLE` / `CREATE INDEX` / FTS5 statement generation
//! - **`sql`** — parameterized select/insert/update/delete builders
//! - **`table`** — the [`Table`] accessor and the [`Model`] row contract
//! - **`fts`** — [`FtsTable`] mirror rebuild and search
//! - **`convert`**, **`value`** — value encoding and typed row readers
//! - **`sanitize`** — markup scrubbing for indexed FTS text
//!
//! # Quick start
//!
//! ```no_run
//! use relmap_core::SchemaRegistry;
//! use relmap_sqlite::{Filters, Model, Table};
//! use rusqlite::Connection;
//! # struct Widget;
//! # impl Model for Widget {
//! #     fn type_def() -> relmap_core::TypeDef { todo!() }
//! #     fn to_row(&self) -> Vec<relmap_sqlite::Value> { todo!() }
//! #     fn from_row(_: &relmap_sqlite::RowValues) -> relmap_sqlite::Result<Self> { todo!() }
//! #     fn key(&self) -> Option<relmap_sqlite::Value> { todo!() }
//! # }
//!
//! let mut registry = SchemaRegistry::new();
//! registry.register(Widget::type_def()).unwrap();
//! let schema = registry.build().unwrap();
//!
//! let conn = Connection::open("widgets.db").unwrap();
//! let widgets: Table<Widget> = Table::new(&conn, &schema).unwrap();
//! widgets.create_table().unwrap();
//!
//! let count = widgets.count(&Filters::new()).unwrap();
//! println!("{count} widgets");
//! ```
//!
//! # Identity strategies
//!
//! Entities with an integer identity key receive their key from the store:
//! inserts omit the key column and the assigned value is written back via
//! [`Model::assign_key`]. All other keys are caller-assigned, optionally
//! through a [`KeyAllocator`] seeded from [`Table::max_key`].

pub mod convert;
pub mod ddl;
mod error;
mod fts;
pub mod sanitize;
mod sql;
mod table;
mod value;

pub use error::{Result, StoreError};
pub use fts::FtsTable;
pub use sql::{Direction, Filters, Order};
pub use table::{InsertOptions, KeyAllocator, Model, Table};
pub use value::{KeyValue, KeyedRows, RowValues, Value};
