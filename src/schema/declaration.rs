//! Schema declarations consumed by extraction and relation resolution
//!
//! A [`SchemaDeclaration`] is the in-memory form of a schema file: tables keyed
//! by logical model name, plus per-model relation declaration sets. Both maps
//! are ordered so that extraction visits tables in a deterministic order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::{DataType, RelationKind};

/// Relation entries declared by one owning model, keyed by relation field name.
pub type RelationDeclarationSet = BTreeMap<String, RelationEntry>;

/// Tables and relations making up one schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDeclaration {
    #[serde(default)]
    pub tables: BTreeMap<String, TableDescription>,
    #[serde(default)]
    pub relations: BTreeMap<String, RelationDeclarationSet>,
}

impl SchemaDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table under its logical model name.
    pub fn table(mut self, model: impl Into<String>, table: TableDescription) -> Self {
        self.tables.insert(model.into(), table);
        self
    }

    /// Add a relation entry to `model`'s declaration set.
    pub fn relation(
        mut self,
        model: impl Into<String>,
        field: impl Into<String>,
        entry: RelationEntry,
    ) -> Self {
        self.relations
            .entry(model.into())
            .or_default()
            .insert(field.into(), entry);
        self
    }
}

/// A table and its ordered columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDescription {
    pub table_name: String,
    pub columns: Vec<ColumnDescription>,
}

impl TableDescription {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnDescription) -> Self {
        self.columns.push(column);
        self
    }
}

/// One column of a table. `column_name` falls back to `name` when omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub has_default: bool,
}

impl ColumnDescription {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            column_name: None,
            primary_key: false,
            nullable: false,
            has_default: false,
        }
    }

    pub fn column_name(mut self, column_name: impl Into<String>) -> Self {
        self.column_name = Some(column_name.into());
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn has_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    /// Storage column name
    pub fn storage_name(&self) -> &str {
        self.column_name.as_deref().unwrap_or(&self.name)
    }
}

/// A named relation declared by an owning model.
///
/// `fields` are column names on the owning table and `references` the
/// matching column names on the referenced table. Both are empty when the
/// join has to be inferred from the referenced table's own declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationEntry {
    pub kind: RelationKind,
    /// Referenced model name (or its storage table name)
    pub table: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    /// Correlation name shared with the inverse declaration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_name: Option<String>,
    #[serde(default)]
    pub optional: bool,
}

impl RelationEntry {
    pub fn one(table: impl Into<String>) -> Self {
        Self::new(RelationKind::One, table)
    }

    pub fn many(table: impl Into<String>) -> Self {
        Self::new(RelationKind::Many, table)
    }

    fn new(kind: RelationKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            fields: Vec::new(),
            references: Vec::new(),
            relation_name: None,
            optional: false,
        }
    }

    /// Declare the join explicitly: `field` on this table references `reference`.
    pub fn join(mut self, field: impl Into<String>, reference: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self.references.push(reference.into());
        self
    }

    pub fn named(mut self, relation_name: impl Into<String>) -> Self {
        self.relation_name = Some(relation_name.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn has_join_columns(&self) -> bool {
        !self.fields.is_empty() || !self.references.is_empty()
    }
}
