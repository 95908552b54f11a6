//! Schema type definitions for relational mapping.
//!
//! This module defines the declarative annotation surface ([`TypeDef`],
//! [`FieldDef`]) that application code uses to describe its data model, and
//! the derived schema model ([`Entity`], [`Column`], [`FtsEntity`]) that the
//! extractor produces from it. All types serialize with [`serde`] so model
//! definitions can also be loaded from JSON documents.

use serde::{Deserialize, Serialize};

use crate::mapper::{self, Affinity, Encoding};

/// Semantic type of a field.
///
/// A closed taxonomy of known scalar kinds plus two composite forms and one
/// catch-all. Anything that is not a known scalar maps to `TEXT` storage via
/// JSON encoding — the mapper never refuses a type.
///
/// # Examples
///
/// ```
/// use relmap_core::{Affinity, FieldType};
///
/// assert_eq!(FieldType::Int64.affinity(), Affinity::Integer);
/// assert_eq!(FieldType::Enum("Color".into()).affinity(), Affinity::Text);
/// assert_eq!(FieldType::Bytes.affinity(), Affinity::Blob);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// Boolean, stored as 0/1.
    Bool,
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 8-bit integer.
    UInt8,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Unsigned 64-bit integer.
    UInt64,
    /// 32-bit float.
    Float32,
    /// 64-bit float.
    Float64,
    /// Arbitrary-precision decimal, stored as canonical text.
    Decimal,
    /// Timestamp, stored as RFC 3339 text.
    DateTime,
    /// UUID/GUID, stored as hyphenated text.
    Guid,
    /// URI, stored as text.
    Uri,
    /// Single character.
    Char,
    /// UTF-8 string.
    Text,
    /// Raw byte sequence.
    Bytes,
    /// Named enumeration, stored as the member's name.
    Enum(String),
    /// Homogeneous ordered collection of the element type, stored as a JSON array.
    List(Box<FieldType>),
    /// Opaque complex object of the named type, stored as JSON text.
    Opaque(String),
}

impl FieldType {
    /// Storage affinity for this type. Delegates to the type mapper.
    pub fn affinity(&self) -> Affinity {
        mapper::affinity(self)
    }

    /// Encode/decode strategy for this type. Delegates to the type mapper.
    pub fn encoding(&self) -> Encoding {
        mapper::encoding(self)
    }

    /// Whether this is a 64-bit-or-narrower integer kind, and therefore
    /// eligible for identity (auto-generated) key assignment.
    pub fn is_integer(&self) -> bool {
        mapper::is_integer(self)
    }
}

/// Foreign-key reference to another table's column.
///
/// # Examples
///
/// ```
/// use relmap_core::ForeignKey;
///
/// let fk = ForeignKey::new("Widget", "Id");
/// assert_eq!(fk.table, "Widget");
/// assert_eq!(fk.column, "Id");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Target table name.
    pub table: String,
    /// Target column name.
    pub column: String,
}

impl ForeignKey {
    /// Creates a foreign-key reference.
    pub fn new(table: &str, column: &str) -> Self {
        Self {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

/// Primary-key annotation on a field.
///
/// Carries its own column name; the extractor rejects the annotation when
/// it does not match the underlying field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDef {
    /// Column name as written in the annotation.
    pub column: String,
    /// Request store-assigned (auto-increment) values on insert.
    pub auto: bool,
}

/// Declarative definition of one field of a data-model type.
///
/// Built with [`new`](FieldDef::new) and the chainable markers, mirroring
/// the per-field annotation surface: primary key, foreign key, ignore,
/// unique, FTS-unindexed.
///
/// # Examples
///
/// ```
/// use relmap_core::{FieldDef, FieldType};
///
/// let id = FieldDef::new("Id", FieldType::Int32).primary_key("Id", true);
/// assert!(id.key.is_some());
///
/// let tags = FieldDef::new("Tags", FieldType::List(Box::new(FieldType::Text)))
///     .nullable();
/// assert!(tags.nullable);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field (and column) name.
    pub name: String,
    /// Semantic type.
    pub ty: FieldType,
    /// Whether the field's declared type is optional.
    #[serde(default)]
    pub nullable: bool,
    /// Primary-key annotation, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<KeyDef>,
    /// Foreign-key references (repeatable).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<ForeignKey>,
    /// Skip this field entirely during extraction.
    #[serde(default)]
    pub ignored: bool,
    /// Enforce uniqueness at the storage level.
    #[serde(default)]
    pub unique: bool,
    /// Store but do not index this column in FTS mirrors.
    #[serde(default)]
    pub fts_unindexed: bool,
}

impl FieldDef {
    /// Creates a field definition with the given name and semantic type.
    pub fn new(name: &str, ty: FieldType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            nullable: false,
            key: None,
            references: Vec::new(),
            ignored: false,
            unique: false,
            fts_unindexed: false,
        }
    }

    /// Marks the field's type as optional.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Annotates the field as the primary key.
    ///
    /// The annotation carries its own column name; extraction fails when it
    /// does not match the field name. `auto` requests store-assigned values
    /// on insert, honored only for integer-typed keys.
    pub fn primary_key(mut self, column: &str, auto: bool) -> Self {
        self.key = Some(KeyDef {
            column: column.to_string(),
            auto,
        });
        self
    }

    /// Adds a foreign-key reference. May be called multiple times.
    pub fn references(mut self, table: &str, column: &str) -> Self {
        self.references.push(ForeignKey::new(table, column));
        self
    }

    /// Excludes the field from extraction entirely.
    pub fn ignore(mut self) -> Self {
        self.ignored = true;
        self
    }

    /// Enforces a uniqueness constraint on the column.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Stores the column in FTS mirrors without indexing it.
    pub fn fts_unindexed(mut self) -> Self {
        self.fts_unindexed = true;
        self
    }
}

/// FTS mirror declaration attached to a table type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FtsDef {
    /// Mirror table name. Defaults to `<source table>_fts`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Source columns excluded from the mirror.
    #[serde(default)]
    pub excluded: Vec<String>,
}

/// Declarative definition of one data-model type.
///
/// Mirrors the per-type annotation surface: table marker with optional
/// explicit name, dynamic-name flag, base-type name for single-inheritance
/// field flattening, index column groups, and an optional FTS mirror
/// declaration.
///
/// # Examples
///
/// ```
/// use relmap_core::{FieldDef, FieldType, TypeDef};
///
/// let widget = TypeDef::table("Widget")
///     .field(FieldDef::new("Id", FieldType::Int32).primary_key("Id", true))
///     .field(FieldDef::new("Name", FieldType::Text))
///     .index(&["Name"]);
///
/// assert!(widget.is_table);
/// assert_eq!(widget.fields.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    /// Type name.
    pub name: String,
    /// Whether this type maps to a table of its own.
    #[serde(default)]
    pub is_table: bool,
    /// Explicit table name override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Allow the table name to be supplied per accessor at runtime.
    #[serde(default)]
    pub dynamic_name: bool,
    /// Base type whose fields are flattened into this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    /// Index specifications as ordered column-name lists.
    #[serde(default)]
    pub indexes: Vec<Vec<String>>,
    /// Field definitions declared by this type itself.
    pub fields: Vec<FieldDef>,
    /// FTS mirror declaration, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fts: Option<FtsDef>,
}

impl TypeDef {
    /// Creates a table-mapped type definition.
    pub fn table(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_table: true,
            table: None,
            dynamic_name: false,
            base: None,
            indexes: Vec::new(),
            fields: Vec::new(),
            fts: None,
        }
    }

    /// Creates a base-only type definition (no table of its own).
    ///
    /// Fragments exist to contribute fields to types that name them as
    /// their [`base`](TypeDef::base).
    pub fn fragment(name: &str) -> Self {
        Self {
            is_table: false,
            ..Self::table(name)
        }
    }

    /// Overrides the derived table name.
    pub fn with_table_name(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    /// Allows the table name to be supplied per accessor at runtime.
    pub fn dynamic_name(mut self) -> Self {
        self.dynamic_name = true;
        self
    }

    /// Names the base type whose fields precede this type's own.
    pub fn base(mut self, name: &str) -> Self {
        self.base = Some(name.to_string());
        self
    }

    /// Adds an index over the given columns.
    pub fn index(mut self, columns: &[&str]) -> Self {
        self.indexes
            .push(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Adds a field definition.
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Declares an FTS mirror with the given excluded columns.
    pub fn fts_mirror(mut self, excluded: &[&str]) -> Self {
        self.fts = Some(FtsDef {
            table: None,
            excluded: excluded.iter().map(|c| c.to_string()).collect(),
        });
        self
    }

    /// Resolved table name: the explicit override or the type name.
    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.name)
    }
}

/// One derived column of an [`Entity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Semantic type.
    pub ty: FieldType,
    /// Whether NULL is a legal stored value.
    pub nullable: bool,
    /// Whether this is the entity's primary key.
    pub primary_key: bool,
    /// Whether the key value is assigned by the store on insert.
    pub identity: bool,
    /// Whether a uniqueness constraint applies.
    pub unique: bool,
    /// Foreign-key references emitted as trailing table clauses.
    pub foreign_keys: Vec<ForeignKey>,
    /// Store but do not index in FTS mirrors.
    pub fts_unindexed: bool,
}

impl Column {
    /// Storage affinity of this column.
    pub fn affinity(&self) -> Affinity {
        self.ty.affinity()
    }

    /// Encode/decode strategy of this column.
    pub fn encoding(&self) -> Encoding {
        self.ty.encoding()
    }
}

/// Derived schema model for one relational table.
///
/// Produced once per type definition by the extractor and immutable
/// thereafter. The column order is deterministic: ancestor fields first
/// (closest ancestor level first), then the type's own fields; row readers
/// rely on it for index assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Originating type name.
    pub name: String,
    /// Resolved table name.
    pub table: String,
    /// Ordered column list.
    pub columns: Vec<Column>,
    /// Index specifications.
    pub indexes: Vec<Vec<String>>,
    /// Table name may be supplied per accessor at runtime.
    pub dynamic_name: bool,
}

impl Entity {
    /// The declared primary-key column with its ordinal, if any.
    pub fn primary_key(&self) -> Option<(usize, &Column)> {
        self.columns.iter().enumerate().find(|(_, c)| c.primary_key)
    }

    /// Looks up a column by name with its ordinal.
    pub fn column(&self, name: &str) -> Option<(usize, &Column)> {
        self.columns.iter().enumerate().find(|(_, c)| c.name == name)
    }

    /// Whether inserts use store-assigned key values.
    pub fn has_identity(&self) -> bool {
        self.primary_key().is_some_and(|(_, c)| c.identity)
    }
}

/// One column of an FTS mirror table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FtsColumn {
    /// Column name, shared with the source entity.
    pub name: String,
    /// Stored but not matched by FTS queries.
    pub unindexed: bool,
    /// Directly-stored text column, eligible for markup sanitization.
    pub text: bool,
}

/// Derived schema model for a full-text-search mirror table.
///
/// References its source [`Entity`] by table name; the column list is the
/// source's minus explicit exclusions, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FtsEntity {
    /// Source table name.
    pub source: String,
    /// Mirror table name.
    pub table: String,
    /// Mirror columns in source order.
    pub columns: Vec<FtsColumn>,
}

impl FtsEntity {
    /// Derives a mirror schema from a source entity.
    ///
    /// Columns listed in `excluded` are dropped; columns listed in
    /// `unindexed` (or flagged unindexed on the source field annotation)
    /// are stored without being searchable. The mirror table name defaults
    /// to `<source>_fts`.
    pub fn derive(
        source: &Entity,
        table: Option<&str>,
        excluded: &[String],
        unindexed: &[String],
    ) -> Self {
        let columns = source
            .columns
            .iter()
            .filter(|c| !excluded.iter().any(|e| e == &c.name))
            .map(|c| FtsColumn {
                name: c.name.clone(),
                unindexed: c.fts_unindexed || unindexed.iter().any(|u| u == &c.name),
                text: matches!(c.ty, FieldType::Text | FieldType::Char)
                    && c.encoding() == Encoding::Direct,
            })
            .collect();

        Self {
            source: source.table.clone(),
            table: table
                .map(String::from)
                .unwrap_or_else(|| format!("{}_fts", source.table)),
            columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> Entity {
        Entity {
            name: "Widget".to_string(),
            table: "Widget".to_string(),
            columns: vec![
                Column {
                    name: "Id".to_string(),
                    ty: FieldType::Int32,
                    nullable: false,
                    primary_key: true,
                    identity: true,
                    unique: false,
                    foreign_keys: Vec::new(),
                    fts_unindexed: false,
                },
                Column {
                    name: "Name".to_string(),
                    ty: FieldType::Text,
                    nullable: false,
                    primary_key: false,
                    identity: false,
                    unique: false,
                    foreign_keys: Vec::new(),
                    fts_unindexed: false,
                },
            ],
            indexes: Vec::new(),
            dynamic_name: false,
        }
    }

    #[test]
    fn test_field_def_builders() {
        let field = FieldDef::new("Parent", FieldType::Int64)
            .nullable()
            .references("Widget", "Id")
            .unique();

        assert!(field.nullable);
        assert!(field.unique);
        assert_eq!(field.references.len(), 1);
        assert_eq!(field.references[0].table, "Widget");
    }

    #[test]
    fn test_type_def_table_name_override() {
        let def = TypeDef::table("WidgetRecord").with_table_name("Widget");
        assert_eq!(def.table_name(), "Widget");

        let def = TypeDef::table("Widget");
        assert_eq!(def.table_name(), "Widget");
    }

    #[test]
    fn test_entity_primary_key_lookup() {
        let entity = widget();
        let (idx, pk) = entity.primary_key().unwrap();
        assert_eq!(idx, 0);
        assert_eq!(pk.name, "Id");
        assert!(entity.has_identity());
    }

    #[test]
    fn test_fts_entity_derive_defaults() {
        let entity = widget();
        let fts = FtsEntity::derive(&entity, None, &[], &[]);

        assert_eq!(fts.table, "Widget_fts");
        assert_eq!(fts.source, "Widget");
        assert_eq!(fts.columns.len(), 2);
        assert!(fts.columns[1].text);
        assert!(!fts.columns[0].text);
    }

    #[test]
    fn test_fts_entity_derive_excluded_and_unindexed() {
        let entity = widget();
        let fts = FtsEntity::derive(
            &entity,
            Some("widget_search"),
            &["Id".to_string()],
            &["Name".to_string()],
        );

        assert_eq!(fts.table, "widget_search");
        assert_eq!(fts.columns.len(), 1);
        assert!(fts.columns[0].unindexed);
    }

    #[test]
    fn test_type_def_serde_round_trip() {
        let def = TypeDef::table("Widget")
            .field(FieldDef::new("Id", FieldType::Int32).primary_key("Id", true))
            .field(
                FieldDef::new("Tags", FieldType::List(Box::new(FieldType::Text))).nullable(),
            )
            .fts_mirror(&["Id"]);

        let json = serde_json::to_string(&def).unwrap();
        let back: TypeDef = serde_json::from_str(&json).unwrap();
        assert_eq!(def, back);
    }
}
