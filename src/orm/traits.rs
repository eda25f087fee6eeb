//! Values and statements produced by the SQL renderer

use serde::Serialize;
use serde_json::Value;

/// Represents a SQL value that can be bound to a query.
///
/// Arrays and objects have no column counterpart and bind as their JSON text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl From<&Value> for SqlValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Int(i),
                None => SqlValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => SqlValue::String(s.clone()),
            other => SqlValue::String(other.to_string()),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::String(value.to_owned())
    }
}

/// A parameterized statement. Placeholders are numbered `?1`, `?2`, ... in
/// the order of `values`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlStatement {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_from_json() {
        assert_eq!(SqlValue::from(&json!(3)), SqlValue::Int(3));
        assert_eq!(SqlValue::from(&json!(1.5)), SqlValue::Float(1.5));
        assert_eq!(SqlValue::from(&json!("a")), SqlValue::String("a".into()));
        assert_eq!(SqlValue::from(&json!(false)), SqlValue::Bool(false));
        assert_eq!(SqlValue::from(&Value::Null), SqlValue::Null);
        assert_eq!(SqlValue::from(&json!([1])), SqlValue::String("[1]".into()));
    }

    #[test]
    fn test_serializes_untagged() {
        let statement = SqlStatement {
            sql: "SELECT 1".into(),
            values: vec![SqlValue::Int(1), SqlValue::String("x".into()), SqlValue::Null],
        };
        assert_eq!(
            serde_json::to_value(statement).unwrap(),
            json!({ "sql": "SELECT 1", "values": [1, "x", null] })
        );
    }
}
