//! Typed table accessors over a SQLite connection.
//!
//! [`Table`] binds a connection to one derived entity and executes the
//! generated statement shapes: create/drop, filtered selects (single, list,
//! dictionary, count), inserts with both identity strategies, updates, and
//! deletes. Every batch operation wraps exactly one transaction; callers
//! must not interleave independent transactions on the same connection.
//!
//! [`KeyAllocator`] is the one piece of runtime-mutable state this
//! subsystem owns: an in-process monotonic counter for entities whose keys
//! are caller-assigned, seeded from the store's current maximum key. It is
//! not persisted and must be re-seeded per process; two uncoordinated
//! processes sharing one store can collide.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use relmap_core::{Entity, Schema, TypeDef};
use rusqlite::{Connection, params_from_iter};
use tracing::debug;

use crate::ddl;
use crate::error::{Result, StoreError};
use crate::sql::{self, Filters, Order};
use crate::value::{KeyValue, KeyedRows, RowValues, Value};

/// Row marshalling contract between an application type and its entity.
///
/// `to_row` must yield one [`Value`] per entity column, in the entity's
/// column order; `from_row` reads the same order back. Types with an
/// identity key implement [`assign_key`](Model::assign_key) to receive the
/// store-assigned value after insert.
pub trait Model: Sized {
    /// The annotated type definition this model was registered under.
    fn type_def() -> TypeDef;

    /// Encodes the model into entity column order.
    fn to_row(&self) -> Vec<Value>;

    /// Decodes a model from entity column order.
    fn from_row(row: &RowValues) -> Result<Self>;

    /// Current primary-key value, if the model carries one.
    fn key(&self) -> Option<Value>;

    /// Receives the store-assigned key after an identity insert.
    fn assign_key(&mut self, _key: i64) {}
}

/// Options for insert operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsertOptions {
    /// Switch to `INSERT OR IGNORE` and accept zero rows affected.
    pub ignore_duplicates: bool,
    /// Insert the primary-key value as given, bypassing identity
    /// assignment (restore/seed scenarios).
    pub raw_key: bool,
}

/// In-process monotonic key counter for caller-assigned keys.
///
/// Explicit owned state, not a global: the application holds one per
/// entity (typically `Arc`-shared) and seeds it via
/// [`Table::allocator`]. Allocation is an atomic read-modify-write.
#[derive(Debug)]
pub struct KeyAllocator {
    next: AtomicI64,
}

impl KeyAllocator {
    /// Creates an allocator whose first allocation returns `seed + 1`.
    pub fn new(seed: i64) -> Self {
        Self {
            next: AtomicI64::new(seed),
        }
    }

    /// Allocates the next key.
    pub fn allocate(&self) -> i64 {
        self.next.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Typed accessor for one entity's table.
///
/// # Examples
///
/// ```no_run
/// use relmap_sqlite::{Filters, Model, Table};
/// use rusqlite::Connection;
/// # use relmap_core::TypeDef;
/// # use relmap_sqlite::{Result, RowValues, Value};
/// # struct Widget { id: i32, name: String }
/// # impl Model for Widget {
/// #     fn type_def() -> TypeDef { todo!() }
/// #     fn to_row(&self) -> Vec<Value> { todo!() }
/// #     fn from_row(_: &RowValues) -> Result<Self> { todo!() }
/// #     fn key(&self) -> Option<Value> { todo!() }
/// # }
///
/// # fn demo(schema: &relmap_core::Schema) -> relmap_sqlite::Result<()> {
/// let conn = Connection::open_in_memory()?;
/// let widgets: Table<Widget> = Table::new(&conn, schema)?;
/// widgets.create_table()?;
///
/// let mut row = Widget { id: 0, name: "a".into() };
/// widgets.insert(&mut row)?;
/// let found = widgets.select_one(&Filters::new().eq("Name", "a"))?;
/// assert!(found.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Table<'c, M: Model> {
    conn: &'c Connection,
    entity: Arc<Entity>,
    table: String,
    _model: PhantomData<M>,
}

impl<'c, M: Model> Table<'c, M> {
    /// Binds the model's entity to a connection under its declared table
    /// name.
    pub fn new(conn: &'c Connection, schema: &Schema) -> Result<Self> {
        let entity = Arc::clone(schema.entity(&M::type_def().name)?);
        let table = entity.table.clone();
        ddl::validate_identifier(&table)?;
        Ok(Self {
            conn,
            entity,
            table,
            _model: PhantomData,
        })
    }

    /// Binds with a runtime table name.
    ///
    /// Only entities that declared the dynamic-name flag may be bound this
    /// way.
    pub fn with_name(conn: &'c Connection, schema: &Schema, table: &str) -> Result<Self> {
        let entity = Arc::clone(schema.entity(&M::type_def().name)?);
        if !entity.dynamic_name {
            return Err(StoreError::NotDynamic(entity.name.clone()));
        }
        ddl::validate_identifier(table)?;
        Ok(Self {
            conn,
            entity,
            table: table.to_string(),
            _model: PhantomData,
        })
    }

    /// The bound table name.
    pub fn name(&self) -> &str {
        &self.table
    }

    /// The bound entity model.
    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    /// Creates the table and its indexes. Idempotent.
    pub fn create_table(&self) -> Result<()> {
        let sql = ddl::create_table_sql(&self.entity, &self.table)?;
        self.conn.execute_batch(&sql)?;
        for index_sql in ddl::create_index_sql(&self.entity, &self.table)? {
            self.conn.execute_batch(&index_sql)?;
        }
        debug!(table = %self.table, "created table");
        Ok(())
    }

    /// Drops the table if it exists.
    pub fn drop_table(&self) -> Result<()> {
        self.conn.execute_batch(&ddl::drop_table_sql(&self.table)?)?;
        debug!(table = %self.table, "dropped table");
        Ok(())
    }

    /// Current maximum key, or `default` when the table is empty or the
    /// bootstrap query fails.
    ///
    /// # Errors
    ///
    /// Only [`StoreError::MissingPrimaryKey`]; query-level failures fall
    /// back to the default by design.
    pub fn max_key(&self, default: i64) -> Result<i64> {
        let sql = sql::max_key_sql(&self.entity, &self.table)?;
        match self
            .conn
            .query_row(&sql, [], |row| row.get::<_, Option<i64>>(0))
        {
            Ok(Some(max)) => Ok(max),
            Ok(None) => Ok(default),
            Err(_) => Ok(default),
        }
    }

    /// Seeds a [`KeyAllocator`] from the current maximum key.
    pub fn allocator(&self, default: i64) -> Result<KeyAllocator> {
        Ok(KeyAllocator::new(self.max_key(default)?))
    }

    fn query_rows(&self, sql: &str, params: &[Value]) -> Result<Vec<RowValues>> {
        let mut stmt = self.conn.prepare(sql)?;
        let column_count = stmt.column_count();
        let mut rows = Vec::new();
        let mut raw = stmt.query(params_from_iter(params.iter()))?;
        while let Some(row) = raw.next()? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(row.get::<_, Value>(i)?);
            }
            rows.push(RowValues::new(values));
        }
        Ok(rows)
    }

    /// Selects the first row matching the filters.
    pub fn select_one(&self, filters: &Filters) -> Result<Option<M>> {
        let (sql, params) = sql::select_sql(&self.entity, &self.table, filters, &[])?;
        let rows = self.query_rows(&sql, &params)?;
        rows.first().map(|r| M::from_row(r)).transpose()
    }

    /// Selects all rows matching the filters, optionally ordered.
    pub fn select_all(&self, filters: &Filters, order: &[Order]) -> Result<Vec<M>> {
        let (sql, params) = sql::select_sql(&self.entity, &self.table, filters, order)?;
        self.query_rows(&sql, &params)?
            .iter()
            .map(M::from_row)
            .collect()
    }

    /// Selects matching rows keyed by primary-key value.
    ///
    /// Entities without a declared primary key are keyed by a zero-based
    /// synthetic counter instead.
    pub fn select_map(&self, filters: &Filters) -> Result<KeyedRows<M>> {
        let rows = self.select_all(filters, &[])?;
        let keyed = self.entity.primary_key().is_some();

        let mut map = BTreeMap::new();
        for (i, row) in rows.into_iter().enumerate() {
            let key = if keyed {
                let value = row
                    .key()
                    .ok_or_else(|| StoreError::MissingPrimaryKey(self.entity.name.clone()))?;
                KeyValue::from_value(&value).ok_or(StoreError::TypeMismatch {
                    index: 0,
                    expected: "INTEGER or TEXT key",
                })?
            } else {
                KeyValue::Integer(i as i64)
            };
            map.insert(key, row);
        }
        Ok(map)
    }

    /// Counts rows matching the filters.
    pub fn count(&self, filters: &Filters) -> Result<i64> {
        let (sql, params) = sql::count_sql(&self.entity, &self.table, filters)?;
        Ok(self
            .conn
            .query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?)
    }

    /// Inserts one row with default options.
    ///
    /// Identity entities receive their store-assigned key back through
    /// [`Model::assign_key`].
    pub fn insert(&self, row: &mut M) -> Result<()> {
        self.insert_with(row, InsertOptions::default())
    }

    /// Inserts one row with explicit options.
    pub fn insert_with(&self, row: &mut M, options: InsertOptions) -> Result<()> {
        let inserted = self.insert_many_with(std::slice::from_mut(row), options)?;
        if inserted == 0 && !options.ignore_duplicates {
            return Err(StoreError::NoRowsAffected {
                table: self.table.clone(),
                operation: "insert",
            });
        }
        Ok(())
    }

    /// Inserts a batch with default options. Returns the number inserted.
    pub fn insert_many(&self, rows: &mut [M]) -> Result<usize> {
        self.insert_many_with(rows, InsertOptions::default())
    }

    /// Inserts a batch: one prepared statement, one transaction, one
    /// execute per row. Returns the number of rows actually inserted
    /// (duplicates skipped under `ignore_duplicates` are not counted).
    pub fn insert_many_with(&self, rows: &mut [M], options: InsertOptions) -> Result<usize> {
        let plan = sql::insert_plan(
            &self.entity,
            &self.table,
            options.ignore_duplicates,
            options.raw_key,
        )?;

        let tx = self.conn.unchecked_transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(&plan.sql)?;
            for row in rows.iter_mut() {
                let values = row.to_row();
                let params: Vec<&Value> = plan
                    .columns
                    .iter()
                    .map(|&i| values.get(i).ok_or(StoreError::ColumnIndex(i)))
                    .collect::<Result<_>>()?;

                if plan.returning {
                    match stmt.query_row(params_from_iter(params), |r| r.get::<_, i64>(0)) {
                        Ok(key) => {
                            row.assign_key(key);
                            inserted += 1;
                        }
                        Err(rusqlite::Error::QueryReturnedNoRows) if options.ignore_duplicates => {}
                        Err(e) => return Err(e.into()),
                    }
                } else {
                    let affected = stmt.execute(params_from_iter(params))?;
                    if affected > 0 {
                        inserted += 1;
                    } else if !options.ignore_duplicates {
                        return Err(StoreError::NoRowsAffected {
                            table: self.table.clone(),
                            operation: "insert",
                        });
                    }
                }
            }
        }
        tx.commit()?;
        debug!(table = %self.table, rows = inserted, "batch insert");
        Ok(inserted)
    }

    /// Updates one row, keyed by its primary key.
    pub fn update(&self, row: &M) -> Result<()> {
        self.update_many(std::slice::from_ref(row))
    }

    /// Updates a batch sharing one prepared statement and one transaction.
    ///
    /// A row whose key matches nothing fails the batch with
    /// [`StoreError::NoRowsAffected`].
    pub fn update_many(&self, rows: &[M]) -> Result<()> {
        let plan = sql::update_plan(&self.entity, &self.table)?;

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&plan.sql)?;
            for row in rows {
                let values = row.to_row();
                let params: Vec<&Value> = plan
                    .columns
                    .iter()
                    .map(|&i| values.get(i).ok_or(StoreError::ColumnIndex(i)))
                    .collect::<Result<_>>()?;
                let affected = stmt.execute(params_from_iter(params))?;
                if affected == 0 {
                    return Err(StoreError::NoRowsAffected {
                        table: self.table.clone(),
                        operation: "update",
                    });
                }
            }
        }
        tx.commit()?;
        debug!(table = %self.table, rows = rows.len(), "batch update");
        Ok(())
    }

    /// Deletes one row by its primary-key value.
    pub fn delete(&self, row: &M) -> Result<()> {
        self.delete_many(std::slice::from_ref(row))
    }

    /// Deletes a batch of rows by key inside one transaction.
    pub fn delete_many(&self, rows: &[M]) -> Result<()> {
        let sql = sql::delete_by_key_sql(&self.entity, &self.table)?;

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in rows {
                let key = row
                    .key()
                    .ok_or_else(|| StoreError::MissingPrimaryKey(self.entity.name.clone()))?;
                let affected = stmt.execute([&key])?;
                if affected == 0 {
                    return Err(StoreError::NoRowsAffected {
                        table: self.table.clone(),
                        operation: "delete",
                    });
                }
            }
        }
        tx.commit()?;
        debug!(table = %self.table, rows = rows.len(), "batch delete");
        Ok(())
    }

    /// Deletes rows matching the filter set inside one transaction.
    /// Returns the number of rows removed; matching nothing is not an
    /// error.
    pub fn delete_where(&self, filters: &Filters) -> Result<usize> {
        let (sql, params) = sql::delete_where_sql(&self.entity, &self.table, filters)?;
        let tx = self.conn.unchecked_transaction()?;
        let affected = tx.execute(&sql, params_from_iter(params.iter()))?;
        tx.commit()?;
        debug!(table = %self.table, rows = affected, "filtered delete");
        Ok(affected)
    }
}
