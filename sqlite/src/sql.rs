//! Parameterized CRUD statement generation.
//!
//! Every statement shape the accessor runtime executes is built here as a
//! pure function of the entity model, with values bound as positional
//! parameters — a value is never interpolated into SQL text. Column and
//! table identifiers are validated against the entity before use, so an
//! unknown or malformed name fails with a typed error instead of reaching
//! the database.

use relmap_core::{Entity, FtsEntity};

use crate::ddl::validate_identifier;
use crate::error::{Result, StoreError};
use crate::value::Value;

/// One filter condition over an exposed column.
#[derive(Debug, Clone, PartialEq)]
enum Condition {
    /// Equality against a bound value.
    Eq(String, Value),
    /// `IS NULL` test for nullable columns.
    Null(String),
    /// `IS NOT NULL` test for nullable columns.
    NotNull(String),
}

/// Optional per-column equality filters, combined with `AND`.
///
/// Every exposed column of an entity can be filtered by equality; nullable
/// columns additionally support null/not-null tests. An empty filter set
/// selects everything.
///
/// # Examples
///
/// ```
/// use relmap_sqlite::Filters;
///
/// let filters = Filters::new().eq("Name", "a").not_null("Tags");
/// assert!(!filters.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    conditions: Vec<Condition>,
}

impl Filters {
    /// Creates an empty filter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality condition.
    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Eq(column.to_string(), value.into()));
        self
    }

    /// Adds an `IS NULL` condition.
    pub fn is_null(mut self, column: &str) -> Self {
        self.conditions.push(Condition::Null(column.to_string()));
        self
    }

    /// Adds an `IS NOT NULL` condition.
    pub fn not_null(mut self, column: &str) -> Self {
        self.conditions.push(Condition::NotNull(column.to_string()));
        self
    }

    /// Whether no conditions were added.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// Sort direction for ordered selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Ascending (the default).
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl Direction {
    /// Parses a direction string: any case-insensitive prefix of "d"
    /// ("d", "desc", "DESCENDING") is descending, everything else ascends.
    pub fn parse(s: &str) -> Self {
        if s.trim().to_ascii_lowercase().starts_with('d') {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One ordering term of a select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    column: String,
    direction: Direction,
}

impl Order {
    /// Ascending order on a column.
    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            direction: Direction::Asc,
        }
    }

    /// Descending order on a column.
    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            direction: Direction::Desc,
        }
    }

    /// Order with a parsed direction string (see [`Direction::parse`]).
    pub fn new(column: &str, direction: &str) -> Self {
        Self {
            column: column.to_string(),
            direction: Direction::parse(direction),
        }
    }
}

fn unknown_column(table: &str, column: &str) -> StoreError {
    StoreError::UnknownColumn {
        table: table.to_string(),
        column: column.to_string(),
    }
}

fn check_column(columns: &[&str], table: &str, column: &str) -> Result<()> {
    validate_identifier(column)?;
    if !columns.contains(&column) {
        return Err(unknown_column(table, column));
    }
    Ok(())
}

/// Renders a `WHERE` clause and its bound parameters.
///
/// The first condition introduces `WHERE`, subsequent ones `AND`. An empty
/// filter set renders nothing.
fn where_clause(
    columns: &[&str],
    table: &str,
    filters: &Filters,
) -> Result<(String, Vec<Value>)> {
    let mut sql = String::new();
    let mut params = Vec::new();

    for condition in &filters.conditions {
        let (column, fragment, value) = match condition {
            Condition::Eq(c, v) => (c, format!("{c} = ?"), Some(v.clone())),
            Condition::Null(c) => (c, format!("{c} IS NULL"), None),
            Condition::NotNull(c) => (c, format!("{c} IS NOT NULL"), None),
        };
        check_column(columns, table, column)?;

        sql.push_str(if sql.is_empty() { " WHERE " } else { " AND " });
        sql.push_str(&fragment);
        if let Some(value) = value {
            params.push(value);
        }
    }

    Ok((sql, params))
}

fn order_clause(columns: &[&str], table: &str, order: &[Order]) -> Result<String> {
    if order.is_empty() {
        return Ok(String::new());
    }
    let mut terms = Vec::with_capacity(order.len());
    for o in order {
        check_column(columns, table, &o.column)?;
        terms.push(format!("{} {}", o.column, o.direction.as_sql()));
    }
    Ok(format!(" ORDER BY {}", terms.join(", ")))
}

fn column_names(entity: &Entity) -> Vec<&str> {
    entity.columns.iter().map(|c| c.name.as_str()).collect()
}

/// Builds a column-list select with optional filters and ordering.
pub fn select_sql(
    entity: &Entity,
    table: &str,
    filters: &Filters,
    order: &[Order],
) -> Result<(String, Vec<Value>)> {
    validate_identifier(table)?;
    let columns = column_names(entity);
    let (where_sql, params) = where_clause(&columns, table, filters)?;
    let order_sql = order_clause(&columns, table, order)?;

    Ok((
        format!(
            "SELECT {} FROM {table}{where_sql}{order_sql}",
            columns.join(", ")
        ),
        params,
    ))
}

/// Builds a `COUNT(*)` select with optional filters.
pub fn count_sql(entity: &Entity, table: &str, filters: &Filters) -> Result<(String, Vec<Value>)> {
    validate_identifier(table)?;
    let columns = column_names(entity);
    let (where_sql, params) = where_clause(&columns, table, filters)?;
    Ok((format!("SELECT COUNT(*) FROM {table}{where_sql}"), params))
}

/// Builds the max-key bootstrap query for the identity counter.
pub fn max_key_sql(entity: &Entity, table: &str) -> Result<String> {
    validate_identifier(table)?;
    let (_, pk) = entity
        .primary_key()
        .ok_or_else(|| StoreError::MissingPrimaryKey(entity.name.clone()))?;
    Ok(format!("SELECT MAX({}) FROM {table}", pk.name))
}

/// Prepared-insert description: the SQL text plus the entity column
/// ordinals bound, in parameter order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertPlan {
    /// Statement text.
    pub sql: String,
    /// Entity column ordinals supplying the parameters.
    pub columns: Vec<usize>,
    /// Statement ends with `RETURNING <key>` and yields the assigned key.
    pub returning: bool,
}

/// Builds the insert statement for an entity.
///
/// When the entity has an identity key and `raw_key` is false, the key
/// column is omitted and a `RETURNING` clause yields the store-assigned
/// value. `ignore_duplicates` switches the verb to `INSERT OR IGNORE`.
pub fn insert_plan(
    entity: &Entity,
    table: &str,
    ignore_duplicates: bool,
    raw_key: bool,
) -> Result<InsertPlan> {
    validate_identifier(table)?;

    let omit_key = entity.has_identity() && !raw_key;
    let mut names = Vec::new();
    let mut columns = Vec::new();
    for (i, column) in entity.columns.iter().enumerate() {
        if omit_key && column.primary_key {
            continue;
        }
        validate_identifier(&column.name)?;
        names.push(column.name.as_str());
        columns.push(i);
    }

    let verb = if ignore_duplicates {
        "INSERT OR IGNORE"
    } else {
        "INSERT"
    };
    let placeholders = vec!["?"; names.len()].join(", ");
    let mut sql = format!(
        "{verb} INTO {table} ({}) VALUES ({placeholders})",
        names.join(", ")
    );
    if omit_key {
        let (_, pk) = entity
            .primary_key()
            .ok_or_else(|| StoreError::MissingPrimaryKey(entity.name.clone()))?;
        sql.push_str(&format!(" RETURNING {}", pk.name));
    }

    Ok(InsertPlan {
        sql,
        columns,
        returning: omit_key,
    })
}

/// Prepared-update description: SQL text plus bound column ordinals
/// (non-key columns in order, then the key for the `WHERE`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePlan {
    /// Statement text.
    pub sql: String,
    /// Entity column ordinals supplying the parameters.
    pub columns: Vec<usize>,
}

/// Builds the update statement: sets every non-key column, keyed by the
/// declared primary key's equality.
pub fn update_plan(entity: &Entity, table: &str) -> Result<UpdatePlan> {
    validate_identifier(table)?;
    let (pk_index, pk) = entity
        .primary_key()
        .ok_or_else(|| StoreError::MissingPrimaryKey(entity.name.clone()))?;

    let mut assignments = Vec::new();
    let mut columns = Vec::new();
    for (i, column) in entity.columns.iter().enumerate() {
        if column.primary_key {
            continue;
        }
        validate_identifier(&column.name)?;
        assignments.push(format!("{} = ?", column.name));
        columns.push(i);
    }
    columns.push(pk_index);

    Ok(UpdatePlan {
        sql: format!(
            "UPDATE {table} SET {} WHERE {} = ?",
            assignments.join(", "),
            pk.name
        ),
        columns,
    })
}

/// Builds the delete-by-key statement.
pub fn delete_by_key_sql(entity: &Entity, table: &str) -> Result<String> {
    validate_identifier(table)?;
    let (_, pk) = entity
        .primary_key()
        .ok_or_else(|| StoreError::MissingPrimaryKey(entity.name.clone()))?;
    Ok(format!("DELETE FROM {table} WHERE {} = ?", pk.name))
}

/// Builds a filtered delete. An empty filter set deletes every row.
pub fn delete_where_sql(
    entity: &Entity,
    table: &str,
    filters: &Filters,
) -> Result<(String, Vec<Value>)> {
    validate_identifier(table)?;
    let columns = column_names(entity);
    let (where_sql, params) = where_clause(&columns, table, filters)?;
    Ok((format!("DELETE FROM {table}{where_sql}"), params))
}

/// Builds the FTS match query: one parameterized MATCH conjunct per
/// non-blank term, plus optional ordering over mirror columns.
///
/// FTS5 accepts only one bare MATCH constraint per table reference, so each
/// term binds inside its own `rowid IN (SELECT rowid … MATCH ?)` conjunct —
/// AND semantics with one parameter per term, and per-term statistics stay
/// available to the query planner.
pub fn fts_search_sql(
    fts: &FtsEntity,
    terms: &[&str],
    order: &[Order],
) -> Result<(String, Vec<Value>)> {
    validate_identifier(&fts.table)?;
    let columns: Vec<&str> = fts.columns.iter().map(|c| c.name.as_str()).collect();

    let mut where_sql = String::new();
    let mut params = Vec::new();
    for term in terms {
        if term.trim().is_empty() {
            continue;
        }
        where_sql.push_str(if where_sql.is_empty() {
            " WHERE "
        } else {
            " AND "
        });
        where_sql.push_str(&format!(
            "rowid IN (SELECT rowid FROM {} WHERE {} MATCH ?)",
            fts.table, fts.table
        ));
        params.push(Value::Text(term.trim().to_string()));
    }

    let order_sql = order_clause(&columns, &fts.table, order)?;
    Ok((
        format!(
            "SELECT {} FROM {}{where_sql}{order_sql}",
            columns.join(", "),
            fts.table
        ),
        params,
    ))
}

/// Builds a `COUNT(*)` over the mirror with optional filters.
pub fn fts_count_sql(fts: &FtsEntity, filters: &Filters) -> Result<(String, Vec<Value>)> {
    validate_identifier(&fts.table)?;
    let columns: Vec<&str> = fts.columns.iter().map(|c| c.name.as_str()).collect();
    let (where_sql, params) = where_clause(&columns, &fts.table, filters)?;
    Ok((
        format!("SELECT COUNT(*) FROM {}{where_sql}", fts.table),
        params,
    ))
}

/// Builds the source-select and mirror-insert pair for FTS population.
pub fn fts_populate_sql(fts: &FtsEntity) -> Result<(String, String)> {
    validate_identifier(&fts.table)?;
    validate_identifier(&fts.source)?;
    let columns: Vec<&str> = fts.columns.iter().map(|c| c.name.as_str()).collect();
    for column in &columns {
        validate_identifier(column)?;
    }

    let select = format!("SELECT {} FROM {}", columns.join(", "), fts.source);
    let placeholders = vec!["?"; columns.len()].join(", ");
    let insert = format!(
        "INSERT INTO {} ({}) VALUES ({placeholders})",
        fts.table,
        columns.join(", ")
    );
    Ok((select, insert))
}
