//! Resolved models, fields and relations

use serde::Serialize;

use super::types::{DataType, RelationKind};

/// Position of a model inside its [`ModelRegistry`](super::ModelRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModelId(pub(crate) usize);

impl ModelId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub column_name: String,
    pub is_primary_key: bool,
    pub nullable: bool,
    pub has_default: bool,
}

/// One table with its fields and, once resolved, its relations.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: ModelId,
    pub name: String,
    pub table_name: String,
    pub fields: Vec<Field>,
    #[serde(skip)]
    pub(crate) primary_key: usize,
    pub relations: Vec<Relation>,
}

impl Model {
    pub fn primary_key(&self) -> &Field {
        &self.fields[self.primary_key]
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_by_column(&self, column: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.column_name == column)
    }

    #[inline]
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.field_name == name)
    }
}

/// A navigable edge from `owner` to `foreign_model`.
///
/// `local_field` names a field on the owner and `foreign_field` a field on
/// the foreign model; rows join where the two are equal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub owner: ModelId,
    pub field_name: String,
    pub foreign_model: ModelId,
    pub kind: RelationKind,
    pub nullable: bool,
    pub local_field: String,
    pub foreign_field: String,
}

impl Relation {
    pub fn is_many(&self) -> bool {
        self.kind == RelationKind::Many
    }
}
