//! Full-text mirror tables.
//!
//! An FTS mirror is a derived FTS5 virtual table holding a scrubbed copy of
//! one entity's searchable columns. The mirror is rebuilt wholesale from
//! the source table; it is never written to incrementally, so a rebuild
//! after bulk changes is the consistency mechanism.

use std::sync::Arc;

use relmap_core::{FtsEntity, Schema};
use rusqlite::{Connection, params_from_iter};
use tracing::debug;

use crate::ddl;
use crate::error::Result;
use crate::sanitize::scrub_markup;
use crate::sql::{self, Filters, Order};
use crate::value::{RowValues, Value};

/// Accessor for one entity's FTS5 mirror.
pub struct FtsTable<'c> {
    conn: &'c Connection,
    fts: Arc<FtsEntity>,
}

impl<'c> FtsTable<'c> {
    /// Binds the mirror derived for the named type.
    pub fn new(conn: &'c Connection, schema: &Schema, type_name: &str) -> Result<Self> {
        let fts = Arc::clone(schema.fts_entity(type_name)?);
        Ok(Self { conn, fts })
    }

    /// The mirror table name.
    pub fn name(&self) -> &str {
        &self.fts.table
    }

    /// The derived mirror model.
    pub fn entity(&self) -> &FtsEntity {
        &self.fts
    }

    /// Creates the FTS5 virtual table. Idempotent.
    pub fn create_table(&self) -> Result<()> {
        self.conn
            .execute_batch(&ddl::create_fts_table_sql(&self.fts)?)?;
        debug!(table = %self.fts.table, "created fts mirror");
        Ok(())
    }

    /// Drops the mirror if it exists.
    pub fn drop_table(&self) -> Result<()> {
        self.conn
            .execute_batch(&ddl::drop_table_sql(&self.fts.table)?)?;
        debug!(table = %self.fts.table, "dropped fts mirror");
        Ok(())
    }

    /// Rebuilds the mirror from the source table.
    ///
    /// Clears existing mirror rows, then copies every source row. With
    /// `sanitize` set, markup is scrubbed from the indexed text columns;
    /// without it, rows copy through verbatim. Unindexed and non-text
    /// columns are never touched. One transaction, one prepared insert.
    /// Returns the number of rows mirrored.
    pub fn populate(&self, sanitize: bool) -> Result<usize> {
        let (select, insert) = sql::fts_populate_sql(&self.fts)?;
        let delete = format!("DELETE FROM {}", self.fts.table);

        let tx = self.conn.unchecked_transaction()?;
        let mut copied = 0;
        {
            tx.execute(&delete, [])?;
            let mut source = tx.prepare(&select)?;
            let mut sink = tx.prepare(&insert)?;
            let mut rows = source.query([])?;
            while let Some(row) = rows.next()? {
                let mut values = Vec::with_capacity(self.fts.columns.len());
                for (i, column) in self.fts.columns.iter().enumerate() {
                    let value = row.get::<_, Value>(i)?;
                    values.push(match value {
                        Value::Text(text) if sanitize && column.text && !column.unindexed => {
                            Value::Text(scrub_markup(&text))
                        }
                        other => other,
                    });
                }
                sink.execute(params_from_iter(values.iter()))?;
                copied += 1;
            }
        }
        tx.commit()?;
        debug!(table = %self.fts.table, rows = copied, "populated fts mirror");
        Ok(copied)
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

    /// Searches the mirror: every non-blank term must match (AND
    /// semantics), with optional ordering over mirror columns. Rows come
    /// back in mirror column order.
    pub fn search(&self, terms: &[&str], order: &[Order]) -> Result<Vec<RowValues>> {
        let (sql, params) = sql::fts_search_sql(&self.fts, terms, order)?;
        self.query_rows(&sql, &params)
    }

    /// Counts mirror rows, optionally filtered by column equality.
    pub fn count(&self, filters: &Filters) -> Result<i64> {
        let (sql, params) = sql::fts_count_sql(&self.fts, filters)?;
        Ok(self
            .conn
            .query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?)
    }
}
