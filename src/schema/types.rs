//! Storage data types and their GraphQL counterparts

use std::fmt;

use serde::{Deserialize, Serialize};

/// Column data type as reported by the table declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Integer,
    Text,
    Timestamp,
    Number,
    Boolean,
    Serial,
    String,
    Bigint,
    Json,
}

/// GraphQL scalar a column is exposed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GraphQlScalar {
    Int,
    String,
    Boolean,
}

impl GraphQlScalar {
    pub fn as_str(&self) -> &'static str {
        match self {
            GraphQlScalar::Int => "Int",
            GraphQlScalar::String => "String",
            GraphQlScalar::Boolean => "Boolean",
        }
    }
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Integer => "integer",
            DataType::Text => "text",
            DataType::Timestamp => "timestamp",
            DataType::Number => "number",
            DataType::Boolean => "boolean",
            DataType::Serial => "serial",
            DataType::String => "string",
            DataType::Bigint => "bigint",
            DataType::Json => "json",
        }
    }

    /// Scalar used when the column appears in a generated object or input type.
    ///
    /// Timestamps and JSON documents travel as strings.
    pub fn graphql_scalar(&self) -> GraphQlScalar {
        match self {
            DataType::Integer | DataType::Number | DataType::Serial | DataType::Bigint => {
                GraphQlScalar::Int
            }
            DataType::Boolean => GraphQlScalar::Boolean,
            DataType::Text | DataType::Timestamp | DataType::String | DataType::Json => {
                GraphQlScalar::String
            }
        }
    }

    /// Name of the filter input type matching this column's scalar
    pub fn filter_input(&self) -> &'static str {
        match self.graphql_scalar() {
            GraphQlScalar::Int => "IntFilter",
            GraphQlScalar::String => "StringFilter",
            GraphQlScalar::Boolean => "BooleanFilter",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cardinality of a relation as seen from its owning model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    One,
    Many,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::One => "one",
            RelationKind::Many => "many",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_types_map_to_int() {
        for data_type in [
            DataType::Integer,
            DataType::Number,
            DataType::Serial,
            DataType::Bigint,
        ] {
            assert_eq!(data_type.graphql_scalar(), GraphQlScalar::Int);
            assert_eq!(data_type.filter_input(), "IntFilter");
        }
    }

    #[test]
    fn test_textual_types_map_to_string() {
        assert_eq!(DataType::Timestamp.graphql_scalar(), GraphQlScalar::String);
        assert_eq!(DataType::Json.filter_input(), "StringFilter");
        assert_eq!(DataType::Boolean.filter_input(), "BooleanFilter");
    }

    #[test]
    fn test_data_type_deserializes_from_lowercase() {
        let parsed: DataType = serde_json::from_str("\"bigint\"").unwrap();
        assert_eq!(parsed, DataType::Bigint);
        assert_eq!(parsed.to_string(), "bigint");
    }
}
