//! Model extraction from table declarations
//!
//! Extraction only builds fields and primary keys. Relations are attached by a
//! later pass so that every model exists before any relation needs to find
//! its foreign model.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use super::declaration::TableDescription;
use super::error::SchemaError;
use super::model::{Field, Model, ModelId};

/// Build one model per declared table, in declaration-map order.
pub fn extract_models(
    tables: &BTreeMap<String, TableDescription>,
) -> Result<Vec<Model>, SchemaError> {
    tables
        .iter()
        .enumerate()
        .map(|(index, (name, table))| extract_model(ModelId(index), name, table))
        .collect()
}

fn extract_model(id: ModelId, name: &str, table: &TableDescription) -> Result<Model, SchemaError> {
    let fields = extract_fields(name, table)?;

    let primary_keys: Vec<usize> = fields
        .iter()
        .enumerate()
        .filter(|(_, field)| field.is_primary_key)
        .map(|(index, _)| index)
        .collect();

    let primary_key = match primary_keys.as_slice() {
        [index] => *index,
        other => {
            return Err(SchemaError::MissingPrimaryKey {
                model: name.to_owned(),
                table: table.table_name.clone(),
                found: other.len(),
            });
        }
    };

    debug!(
        model = name,
        table = %table.table_name,
        fields = fields.len(),
        primary_key = %fields[primary_key].name,
        "Extracted model"
    );

    Ok(Model {
        id,
        name: name.to_owned(),
        table_name: table.table_name.clone(),
        fields,
        primary_key,
        relations: Vec::new(),
    })
}

fn extract_fields(model: &str, table: &TableDescription) -> Result<Vec<Field>, SchemaError> {
    let mut names = HashSet::with_capacity(table.columns.len());
    let mut fields = Vec::with_capacity(table.columns.len());

    for column in &table.columns {
        if !names.insert(column.name.as_str()) {
            return Err(SchemaError::DuplicateField {
                model: model.to_owned(),
                field: column.name.clone(),
            });
        }

        fields.push(Field {
            name: column.name.clone(),
            data_type: column.data_type,
            column_name: column.storage_name().to_owned(),
            is_primary_key: column.primary_key,
            nullable: column.nullable,
            has_default: column.has_default,
        });
    }

    Ok(fields)
}
