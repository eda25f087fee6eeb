use thiserror::Error;

/// A filter expression that cannot be translated. Rejects only the request it came from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("unknown field {field:?} in filter on {model}")]
    UnknownField { model: String, field: String },
    #[error("unknown filter operator {operator:?} on {model}.{field}")]
    UnknownOperator {
        model: String,
        field: String,
        operator: String,
    },
    #[error("invalid operand for {field}.{operator}: {reason}")]
    InvalidOperand {
        field: String,
        operator: String,
        reason: String,
    },
    #[error("malformed filter: {reason}")]
    Malformed { reason: String },
}

/// Per-request planning failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("model {name:?} is not registered")]
    ModelNotFound { name: String },
    #[error("{model} has no field or relation {field:?}")]
    UnknownField { model: String, field: String },
    #[error("{model} has no relation {field:?}")]
    UnknownRelation { model: String, field: String },
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error("invalid argument {argument:?}: {reason}")]
    InvalidArgument { argument: String, reason: String },
    #[error("operation {operation} is not supported")]
    Unsupported { operation: String },
    #[error("operation {operation} rejected: {reason}")]
    Rejected { operation: String, reason: String },
}
