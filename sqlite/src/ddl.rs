//! DDL generation for entities and FTS mirrors.
//!
//! Turns a derived [`Entity`] into `CREATE TABLE` / `CREATE INDEX` /
//! `DROP TABLE` statements. All statements use `IF NOT EXISTS` /
//! `IF EXISTS` semantics and index names derive deterministically from the
//! table and column list, so re-running DDL generation is idempotent.
//!
//! Identifiers are never trusted: every table and column name must contain
//! only alphanumeric characters and underscores, which keeps generated SQL
//! free of injection vectors even for dynamic table names.

use relmap_core::{Entity, FtsEntity};

use crate::error::{Result, StoreError};

/// Validates that an identifier contains only alphanumerics and underscores.
pub(crate) fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(StoreError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

/// Generates the `CREATE TABLE IF NOT EXISTS` statement for an entity.
///
/// Column fragments: the primary key renders as
/// `<name> <affinity> UNIQUE PRIMARY KEY NOT NULL` (the key clause covers
/// nullability, no redundant constraint is added); unique non-key columns
/// get `UNIQUE`; non-nullable columns get `NOT NULL`; nullable non-key
/// columns are bare. Foreign keys append as trailing
/// `FOREIGN KEY (col) REFERENCES table(col)` clauses.
///
/// # Examples
///
/// ```
/// use relmap_core::{extract, FieldDef, FieldType, TypeDef};
/// use relmap_sqlite::ddl::create_table_sql;
///
/// let def = TypeDef::table("Widget")
///     .field(FieldDef::new("Id", FieldType::Int32).primary_key("Id", true))
///     .field(FieldDef::new("Name", FieldType::Text));
/// let entity = extract(&def, &std::collections::HashMap::new()).unwrap();
///
/// assert_eq!(
///     create_table_sql(&entity, "Widget").unwrap(),
///     "CREATE TABLE IF NOT EXISTS Widget (Id INTEGER UNIQUE PRIMARY KEY NOT NULL, Name TEXT NOT NULL)"
/// );
/// ```
pub fn create_table_sql(entity: &Entity, table: &str) -> Result<String> {
    validate_identifier(table)?;

    let mut fragments = Vec::with_capacity(entity.columns.len());
    for column in &entity.columns {
        validate_identifier(&column.name)?;

        let mut fragment = format!("{} {}", column.name, column.affinity().as_sql());
        if column.primary_key {
            fragment.push_str(" UNIQUE PRIMARY KEY NOT NULL");
        } else {
            if column.unique {
                fragment.push_str(" UNIQUE");
            }
            if !column.nullable {
                fragment.push_str(" NOT NULL");
            }
        }
        fragments.push(fragment);
    }

    for column in &entity.columns {
        for fk in &column.foreign_keys {
            validate_identifier(&fk.table)?;
            validate_identifier(&fk.column)?;
            fragments.push(format!(
                "FOREIGN KEY ({}) REFERENCES {}({})",
                column.name, fk.table, fk.column
            ));
        }
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {table} ({})",
        fragments.join(", ")
    ))
}

/// Generates one `CREATE INDEX IF NOT EXISTS` statement per index
/// specification, named `IDX_<table>_<col1>_<col2>…`.
pub fn create_index_sql(entity: &Entity, table: &str) -> Result<Vec<String>> {
    validate_identifier(table)?;

    let mut statements = Vec::with_capacity(entity.indexes.len());
    for index in &entity.indexes {
        for column in index {
            validate_identifier(column)?;
        }
        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS IDX_{table}_{} ON {table} ({})",
            index.join("_"),
            index.join(", ")
        ));
    }
    Ok(statements)
}

/// Generates the `DROP TABLE IF EXISTS` statement.
pub fn drop_table_sql(table: &str) -> Result<String> {
    validate_identifier(table)?;
    Ok(format!("DROP TABLE IF EXISTS {table}"))
}

/// Generates the FTS5 virtual-table statement for a mirror.
///
/// Unindexed columns are stored but not matched:
/// `CREATE VIRTUAL TABLE IF NOT EXISTS <t> USING fts5(a, b UNINDEXED)`.
pub fn create_fts_table_sql(fts: &FtsEntity) -> Result<String> {
    validate_identifier(&fts.table)?;

    let mut fragments = Vec::with_capacity(fts.columns.len());
    for column in &fts.columns {
        validate_identifier(&column.name)?;
        if column.unindexed {
            fragments.push(format!("{} UNINDEXED", column.name));
        } else {
            fragments.push(column.name.clone());
        }
    }

    Ok(format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS {} USING fts5({})",
        fts.table,
        fragments.join(", ")
    ))
}
