//! The immutable model graph shared by every request

use std::collections::HashMap;

use tracing::info;

use super::declaration::SchemaDeclaration;
use super::error::SchemaError;
use super::extract::extract_models;
use super::model::{Field, Model, ModelId, Relation};
use super::relations::resolve_relations;

/// Every model of a schema with its relations resolved.
///
/// Built once at startup and read-only afterwards; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: Vec<Model>,
    by_name: HashMap<String, ModelId>,
}

impl ModelRegistry {
    /// Extract models and resolve relations. Fails without a partial graph.
    pub fn build(declaration: &SchemaDeclaration) -> Result<Self, SchemaError> {
        let mut models = extract_models(&declaration.tables)?;
        resolve_relations(&mut models, &declaration.relations)?;

        let registry = Self::from_models(models);
        info!(
            models = registry.len(),
            relations = registry.models().map(|m| m.relations.len()).sum::<usize>(),
            "Model graph built"
        );
        Ok(registry)
    }

    fn from_models(models: Vec<Model>) -> Self {
        let by_name = models.iter().map(|m| (m.name.clone(), m.id)).collect();
        Self { models, by_name }
    }

    pub fn get(&self, name: &str) -> Option<&Model> {
        self.by_name.get(name).map(|id| &self.models[id.index()])
    }

    pub fn get_by_table(&self, table_name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.table_name == table_name)
    }

    /// Model for an id handed out by this registry.
    ///
    /// # Panics
    /// If the id comes from a different registry with more models.
    pub fn model(&self, id: ModelId) -> &Model {
        &self.models[id.index()]
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.iter()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn foreign_model(&self, relation: &Relation) -> &Model {
        self.model(relation.foreign_model)
    }

    /// Both join fields of a relation: (field on the owner, field on the foreign model).
    pub fn join_fields(&self, relation: &Relation) -> Option<(&Field, &Field)> {
        let local = self.model(relation.owner).field(&relation.local_field)?;
        let foreign = self.foreign_model(relation).field(&relation.foreign_field)?;
        Some((local, foreign))
    }
}
