//! Schema model extraction: type definitions to entities.
//!
//! Walks a [`TypeDef`]'s declared fields, flattened across its
//! single-inheritance chain, and produces the ordered [`Entity`] column
//! list. Extraction is a pure structural transform — all cost is paid once
//! at generation time, and the resulting entity is immutable.
//!
//! # Column order
//!
//! Ancestor fields precede the type's own, concatenated per ancestor level
//! with the closest ancestor first. Row readers rely on this order for
//! index assignment, so it is part of the entity's contract.

use std::collections::HashMap;

use crate::error::{Result, SchemaError};
use crate::types::{Column, Entity, FieldDef, TypeDef};

/// Derives an [`Entity`] from a type definition.
///
/// `types` is the full set of registered definitions, used to resolve the
/// ancestor chain. A base name with no registered definition truncates the
/// chain silently — known ancestors still contribute their fields.
///
/// # Errors
///
/// Fails fast on a primary-key annotation whose column name does not match
/// its field ([`SchemaError::KeyNameMismatch`]), on more than one annotated
/// key ([`SchemaError::DuplicatePrimaryKey`]), and on an index referencing
/// a column the entity does not have.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use relmap_core::{extract, FieldDef, FieldType, TypeDef};
///
/// let def = TypeDef::table("Widget")
///     .field(FieldDef::new("Id", FieldType::Int32).primary_key("Id", true))
///     .field(FieldDef::new("Name", FieldType::Text));
///
/// let entity = extract(&def, &HashMap::new()).unwrap();
/// assert_eq!(entity.table, "Widget");
/// assert_eq!(entity.columns.len(), 2);
/// assert!(entity.has_identity());
/// ```
pub fn extract(def: &TypeDef, types: &HashMap<String, TypeDef>) -> Result<Entity> {
    let mut columns = Vec::new();

    for level in ancestor_chain(def, types) {
        for field in &level.fields {
            if let Some(column) = column_from_field(&level.name, field)? {
                columns.push(column);
            }
        }
    }
    for field in &def.fields {
        if let Some(column) = column_from_field(&def.name, field)? {
            columns.push(column);
        }
    }

    if columns.iter().filter(|c| c.primary_key).count() > 1 {
        return Err(SchemaError::DuplicatePrimaryKey(def.name.clone()));
    }

    for index in &def.indexes {
        for name in index {
            if !columns.iter().any(|c| &c.name == name) {
                return Err(SchemaError::UnknownIndexColumn {
                    type_name: def.name.clone(),
                    column: name.clone(),
                });
            }
        }
    }

    Ok(Entity {
        name: def.name.clone(),
        table: def.table_name().to_string(),
        columns,
        indexes: def.indexes.clone(),
        dynamic_name: def.dynamic_name,
    })
}

/// Collects the ancestor chain, closest ancestor first.
///
/// Stops at the first base name that is not registered or at a cycle; the
/// chain simply truncates, which is not an error.
fn ancestor_chain<'a>(def: &TypeDef, types: &'a HashMap<String, TypeDef>) -> Vec<&'a TypeDef> {
    let mut chain = Vec::new();
    let mut current = def.base.as_deref();
    while let Some(name) = current {
        let Some(base) = types.get(name) else { break };
        if chain.iter().any(|seen: &&TypeDef| seen.name == base.name) {
            break;
        }
        chain.push(base);
        current = base.base.as_deref();
    }
    chain
}

/// Classifies one retained field into a column, or `None` for ignored fields.
fn column_from_field(type_name: &str, field: &FieldDef) -> Result<Option<Column>> {
    if field.ignored {
        return Ok(None);
    }

    let primary_key = match &field.key {
        Some(key) if key.column != field.name => {
            return Err(SchemaError::KeyNameMismatch {
                type_name: type_name.to_string(),
                field: field.name.clone(),
                annotated: key.column.clone(),
            });
        }
        Some(_) => true,
        None => false,
    };

    // Identity only applies to integer-typed keys; the auto flag is
    // otherwise inert and the caller assigns the value.
    let identity = field
        .key
        .as_ref()
        .is_some_and(|k| k.auto && field.ty.is_integer());

    Ok(Some(Column {
        name: field.name.clone(),
        ty: field.ty.clone(),
        nullable: field.nullable,
        primary_key,
        identity,
        unique: field.unique,
        foreign_keys: field.references.clone(),
        fts_unindexed: field.fts_unindexed,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldType;

    fn registry_of(defs: &[TypeDef]) -> HashMap<String, TypeDef> {
        defs.iter()
            .map(|d| (d.name.clone(), d.clone()))
            .collect()
    }

    #[test]
    fn test_ignored_fields_are_skipped() {
        let def = TypeDef::table("Widget")
            .field(FieldDef::new("Id", FieldType::Int64).primary_key("Id", true))
            .field(FieldDef::new("Scratch", FieldType::Text).ignore());

        let entity = extract(&def, &HashMap::new()).unwrap();
        assert_eq!(entity.columns.len(), 1);
        assert_eq!(entity.columns[0].name, "Id");
    }

    #[test]
    fn test_key_name_mismatch_fails_fast() {
        let def = TypeDef::table("Widget")
            .field(FieldDef::new("Id", FieldType::Int64).primary_key("WidgetId", true));

        let err = extract(&def, &HashMap::new()).unwrap_err();
        assert!(matches!(err, SchemaError::KeyNameMismatch { .. }));
    }

    #[test]
    fn test_duplicate_primary_key_rejected() {
        let def = TypeDef::table("Widget")
            .field(FieldDef::new("Id", FieldType::Int64).primary_key("Id", true))
            .field(FieldDef::new("AltId", FieldType::Int64).primary_key("AltId", false));

        let err = extract(&def, &HashMap::new()).unwrap_err();
        assert_eq!(err, SchemaError::DuplicatePrimaryKey("Widget".to_string()));
    }

    #[test]
    fn test_identity_requires_integer_key() {
        let def = TypeDef::table("Page")
            .field(FieldDef::new("Url", FieldType::Uri).primary_key("Url", true));

        let entity = extract(&def, &HashMap::new()).unwrap();
        let (_, pk) = entity.primary_key().unwrap();
        assert!(pk.primary_key);
        assert!(!pk.identity);
    }

    #[test]
    fn test_ancestor_fields_precede_own() {
        let base = TypeDef::fragment("Tracked")
            .field(FieldDef::new("CreatedAt", FieldType::DateTime))
            .field(FieldDef::new("UpdatedAt", FieldType::DateTime).nullable());
        let def = TypeDef::table("Widget")
            .base("Tracked")
            .field(FieldDef::new("Id", FieldType::Int64).primary_key("Id", true))
            .field(FieldDef::new("Name", FieldType::Text));

        let types = registry_of(&[base, def.clone()]);
        let entity = extract(&def, &types).unwrap();

        let names: Vec<&str> = entity.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["CreatedAt", "UpdatedAt", "Id", "Name"]);
    }

    #[test]
    fn test_multi_level_chain_closest_ancestor_first() {
        let root = TypeDef::fragment("Root").field(FieldDef::new("RootField", FieldType::Text));
        let mid = TypeDef::fragment("Mid")
            .base("Root")
            .field(FieldDef::new("MidField", FieldType::Text));
        let def = TypeDef::table("Leaf")
            .base("Mid")
            .field(FieldDef::new("LeafField", FieldType::Text));

        let types = registry_of(&[root, mid, def.clone()]);
        let entity = extract(&def, &types).unwrap();

        let names: Vec<&str> = entity.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["MidField", "RootField", "LeafField"]);
    }

    #[test]
    fn test_unresolvable_base_truncates_chain() {
        let mid = TypeDef::fragment("Mid")
            .base("Missing")
            .field(FieldDef::new("MidField", FieldType::Text));
        let def = TypeDef::table("Leaf")
            .base("Mid")
            .field(FieldDef::new("LeafField", FieldType::Text));

        let types = registry_of(&[mid, def.clone()]);
        let entity = extract(&def, &types).unwrap();

        let names: Vec<&str> = entity.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["MidField", "LeafField"]);
    }

    #[test]
    fn test_base_cycle_truncates_instead_of_looping() {
        let a = TypeDef::fragment("A")
            .base("B")
            .field(FieldDef::new("AField", FieldType::Text));
        let b = TypeDef::fragment("B")
            .base("A")
            .field(FieldDef::new("BField", FieldType::Text));
        let def = TypeDef::table("Leaf")
            .base("A")
            .field(FieldDef::new("LeafField", FieldType::Text));

        let types = registry_of(&[a, b, def.clone()]);
        let entity = extract(&def, &types).unwrap();
        assert_eq!(entity.columns.len(), 3);
    }

    #[test]
    fn test_index_with_unknown_column_rejected() {
        let def = TypeDef::table("Widget")
            .field(FieldDef::new("Id", FieldType::Int64).primary_key("Id", true))
            .index(&["Nope"]);

        let err = extract(&def, &HashMap::new()).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownIndexColumn { .. }));
    }

    #[test]
    fn test_nullability_and_non_scalar_classification() {
        let def = TypeDef::table("Widget")
            .field(FieldDef::new("Id", FieldType::Int32).primary_key("Id", true))
            .field(
                FieldDef::new("Tags", FieldType::List(Box::new(FieldType::Text))).nullable(),
            );

        let entity = extract(&def, &HashMap::new()).unwrap();
        let (_, tags) = entity.column("Tags").unwrap();
        assert!(tags.nullable);
        assert_eq!(tags.encoding(), crate::mapper::Encoding::Json);
    }
}
