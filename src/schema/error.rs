use thiserror::Error;

/// Failures while building the model graph. All of them are fatal at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error(
        "table {table:?} ({model}) must have exactly one primary key column, found {found}"
    )]
    MissingPrimaryKey {
        model: String,
        table: String,
        found: usize,
    },
    #[error("model {model} has a duplicated field {field:?}")]
    DuplicateField { model: String, field: String },
    #[error("model {name:?} referenced by {referenced_by} is not declared")]
    UnknownModel { name: String, referenced_by: String },
    #[error("relation {model}.{relation} joins on column {column:?}, which {table} does not have")]
    UnknownJoinColumn {
        model: String,
        relation: String,
        table: String,
        column: String,
    },
    #[error("relation {model}.{relation} declares a composite join, only single-column joins are supported")]
    CompositeJoin { model: String, relation: String },
    #[error("cannot resolve relation {model}.{relation}: {reason}")]
    UnresolvableRelation {
        model: String,
        relation: String,
        reason: String,
    },
}
