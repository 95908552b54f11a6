//! Schema registry: register type definitions once, build memoized entities.
//!
//! [`SchemaRegistry`] collects [`TypeDef`]s at process start;
//! [`build`](SchemaRegistry::build) runs the extractor over every
//! table-mapped type exactly once and produces an immutable [`Schema`]
//! holding the derived [`Entity`] and [`FtsEntity`] models. Downstream
//! generators are pure functions of these models, so entities can be
//! consumed concurrently without coordination.
//!
//! # Example
//!
//! ```
//! use relmap_core::{FieldDef, FieldType, SchemaRegistry, TypeDef};
//!
//! let mut registry = SchemaRegistry::new();
//! registry
//!     .register(
//!         TypeDef::table("Widget")
//!             .field(FieldDef::new("Id", FieldType::Int32).primary_key("Id", true))
//!             .field(FieldDef::new("Name", FieldType::Text)),
//!     )
//!     .unwrap();
//!
//! let schema = registry.build().unwrap();
//! assert!(schema.entity("Widget").is_ok());
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::{Result, SchemaError};
use crate::extract::extract;
use crate::types::{Entity, FtsEntity, TypeDef};

/// Collects type definitions prior to the one-time schema build pass.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    types: HashMap<String, TypeDef>,
    order: Vec<String>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type definition.
    ///
    /// Base-only fragments must be registered alongside the tables that
    /// name them so the extractor can resolve ancestor chains.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateType`] if a definition with the same
    /// name was already registered.
    pub fn register(&mut self, def: TypeDef) -> Result<&mut Self> {
        if self.types.contains_key(&def.name) {
            return Err(SchemaError::DuplicateType(def.name));
        }
        self.order.push(def.name.clone());
        self.types.insert(def.name.clone(), def);
        Ok(self)
    }

    /// Runs extraction over every table-mapped definition and produces the
    /// immutable schema.
    ///
    /// A failure aborts the build with the first offending entity's error;
    /// registration order does not matter because ancestor resolution works
    /// over the full definition map.
    pub fn build(self) -> Result<Schema> {
        let mut entities = BTreeMap::new();
        let mut fts = BTreeMap::new();

        for name in &self.order {
            let def = &self.types[name];
            if !def.is_table {
                continue;
            }

            let entity = Arc::new(extract(def, &self.types)?);

            if let Some(fts_def) = &def.fts {
                for excluded in &fts_def.excluded {
                    if entity.column(excluded).is_none() {
                        return Err(SchemaError::UnknownFtsColumn {
                            type_name: def.name.clone(),
                            column: excluded.clone(),
                        });
                    }
                }
                let mirror = FtsEntity::derive(
                    &entity,
                    fts_def.table.as_deref(),
                    &fts_def.excluded,
                    &[],
                );
                fts.insert(def.name.clone(), Arc::new(mirror));
            }

            entities.insert(def.name.clone(), entity);
        }

        Ok(Schema { entities, fts })
    }
}

/// Immutable set of derived entities, built once per process.
///
/// Lookups are by originating type name. Entities are held behind [`Arc`]
/// so runtime accessors can share them cheaply.
#[derive(Debug, Clone)]
pub struct Schema {
    entities: BTreeMap<String, Arc<Entity>>,
    fts: BTreeMap<String, Arc<FtsEntity>>,
}

impl Schema {
    /// Looks up the entity derived for a type name.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownType`] if the type was not registered
    /// as a table.
    pub fn entity(&self, name: &str) -> Result<&Arc<Entity>> {
        self.entities
            .get(name)
            .ok_or_else(|| SchemaError::UnknownType(name.to_string()))
    }

    /// Looks up the FTS mirror derived for a type name.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownType`] if the type did not declare a
    /// mirror.
    pub fn fts_entity(&self, name: &str) -> Result<&Arc<FtsEntity>> {
        self.fts
            .get(name)
            .ok_or_else(|| SchemaError::UnknownType(name.to_string()))
    }

    /// Iterates all derived entities in name order.
    pub fn entities(&self) -> impl Iterator<Item = &Arc<Entity>> {
        self.entities.values()
    }

    /// Iterates all derived FTS mirrors in source type-name order.
    pub fn fts_entities(&self) -> impl Iterator<Item = &Arc<FtsEntity>> {
        self.fts.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldDef, FieldType};

    fn widget_def() -> TypeDef {
        TypeDef::table("Widget")
            .field(FieldDef::new("Id", FieldType::Int32).primary_key("Id", true))
            .field(FieldDef::new("Name", FieldType::Text))
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = SchemaRegistry::new();
        registry.register(widget_def()).unwrap();
        let err = registry.register(widget_def()).unwrap_err();
        assert_eq!(err, SchemaError::DuplicateType("Widget".to_string()));
    }

    #[test]
    fn test_fragments_do_not_become_entities() {
        let mut registry = SchemaRegistry::new();
        registry
            .register(TypeDef::fragment("Tracked").field(FieldDef::new(
                "CreatedAt",
                FieldType::DateTime,
            )))
            .unwrap();
        registry.register(widget_def()).unwrap();

        let schema = registry.build().unwrap();
        assert!(schema.entity("Widget").is_ok());
        assert!(schema.entity("Tracked").is_err());
        assert_eq!(schema.entities().count(), 1);
    }

    #[test]
    fn test_repeated_lookup_returns_same_entity() {
        let mut registry = SchemaRegistry::new();
        registry.register(widget_def()).unwrap();
        let schema = registry.build().unwrap();

        let a = schema.entity("Widget").unwrap();
        let b = schema.entity("Widget").unwrap();
        assert!(Arc::ptr_eq(a, b));
    }

    #[test]
    fn test_fts_mirror_derivation_and_validation() {
        let mut registry = SchemaRegistry::new();
        registry
            .register(widget_def().fts_mirror(&["Id"]))
            .unwrap();
        let schema = registry.build().unwrap();

        let fts = schema.fts_entity("Widget").unwrap();
        assert_eq!(fts.table, "Widget_fts");
        assert_eq!(fts.columns.len(), 1);
        assert_eq!(fts.columns[0].name, "Name");

        let mut registry = SchemaRegistry::new();
        registry
            .register(widget_def().fts_mirror(&["Nope"]))
            .unwrap();
        let err = registry.build().unwrap_err();
        assert!(matches!(err, SchemaError::UnknownFtsColumn { .. }));
    }

    #[test]
    fn test_base_registered_after_dependent_still_resolves() {
        let mut registry = SchemaRegistry::new();
        registry
            .register(
                TypeDef::table("Widget")
                    .base("Tracked")
                    .field(FieldDef::new("Id", FieldType::Int32).primary_key("Id", true)),
            )
            .unwrap();
        registry
            .register(TypeDef::fragment("Tracked").field(FieldDef::new(
                "CreatedAt",
                FieldType::DateTime,
            )))
            .unwrap();

        let schema = registry.build().unwrap();
        let entity = schema.entity("Widget").unwrap();
        assert_eq!(entity.columns[0].name, "CreatedAt");
    }
}
