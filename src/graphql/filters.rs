//! Filter expression translation
//!
//! Filters arrive as nested JSON objects and become [`Predicate`] trees:
//! - `and`, `or`: a list of nested filters
//! - `not`: a single nested filter
//! - any other key: a field name mapped to `{ operator: operand }`
//!
//! Supported operators are Equals, Not, In, Lt, Lte, Gt, Gte, IsNull and
//! Includes (substring match). Several operators on one field combine with
//! AND, as do several keys on one object.
//!
//! ```json
//! { "or": [ { "age": { "gte": 18, "lt": 65 } }, { "name": { "includes": "admin" } } ] }
//! ```
//!
//! Object keys are visited in sorted order, so the resulting tree does not
//! depend on how the caller's map happened to be ordered. List order is kept.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::error::FilterError;
use crate::schema::Model;

const AND: &str = "and";
const OR: &str = "or";
const NOT: &str = "not";

/// Comparison operator of a filter leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equals,
    Not,
    In,
    Lt,
    Lte,
    Gt,
    Gte,
    IsNull,
    Includes,
}

impl Operator {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "equals" => Operator::Equals,
            "not" => Operator::Not,
            "in" => Operator::In,
            "lt" => Operator::Lt,
            "lte" => Operator::Lte,
            "gt" => Operator::Gt,
            "gte" => Operator::Gte,
            "isNull" => Operator::IsNull,
            "includes" => Operator::Includes,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::Not => "not",
            Operator::In => "in",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::IsNull => "isNull",
            Operator::Includes => "includes",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boolean expression over a model's fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Predicate {
    Compare {
        field: String,
        operator: Operator,
        value: Value,
    },
    And {
        children: Vec<Predicate>,
    },
    Or {
        children: Vec<Predicate>,
    },
    Not {
        child: Box<Predicate>,
    },
}

impl Predicate {
    pub fn compare(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn negate(self) -> Self {
        Predicate::Not {
            child: Box::new(self),
        }
    }

    /// Conjunction of `conditions`: none for an empty list, the condition
    /// itself for a single one.
    pub fn all(mut conditions: Vec<Predicate>) -> Option<Self> {
        match conditions.len() {
            0 => None,
            1 => conditions.pop(),
            _ => Some(Predicate::And {
                children: conditions,
            }),
        }
    }
}

/// Translate a filter expression against `model`'s fields.
///
/// An absent, null or empty filter yields no predicate at all.
pub fn translate(filter: Option<&Value>, model: &Model) -> Result<Option<Predicate>, FilterError> {
    match filter {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => translate_object(map, model),
        Some(other) => Err(FilterError::Malformed {
            reason: format!("expected an object, found {}", describe(other)),
        }),
    }
}

fn translate_object(map: &Map<String, Value>, model: &Model) -> Result<Option<Predicate>, FilterError> {
    let mut conditions = Vec::with_capacity(map.len());

    for (key, value) in sorted_entries(map) {
        let condition = match key {
            AND => translate_list(key, value, model)?.map(|children| Predicate::And { children }),
            OR => translate_list(key, value, model)?.map(|children| Predicate::Or { children }),
            NOT => translate(Some(value), model)?.map(Predicate::negate),
            field => translate_field(field, value, model)?,
        };
        conditions.extend(condition);
    }

    Ok(Predicate::all(conditions))
}

/// Operands of `and` / `or`. A lone object counts as a one-element list.
fn translate_list(
    key: &str,
    value: &Value,
    model: &Model,
) -> Result<Option<Vec<Predicate>>, FilterError> {
    let items = match value {
        Value::Null => return Ok(None),
        Value::Array(items) => items.as_slice(),
        Value::Object(_) => std::slice::from_ref(value),
        other => {
            return Err(FilterError::Malformed {
                reason: format!("{key} expects a list of filters, found {}", describe(other)),
            });
        }
    };

    let mut children = Vec::with_capacity(items.len());
    for item in items {
        children.extend(translate(Some(item), model)?);
    }

    Ok((!children.is_empty()).then_some(children))
}

fn translate_field(field: &str, value: &Value, model: &Model) -> Result<Option<Predicate>, FilterError> {
    if !model.has_field(field) {
        return Err(FilterError::UnknownField {
            model: model.name.clone(),
            field: field.to_owned(),
        });
    }

    let operations = match value {
        Value::Null => return Ok(None),
        Value::Object(operations) => operations,
        other => {
            return Err(FilterError::Malformed {
                reason: format!("{field} expects an operator object, found {}", describe(other)),
            });
        }
    };

    let mut leaves = Vec::with_capacity(operations.len());
    for (name, operand) in sorted_entries(operations) {
        let operator = Operator::parse(name).ok_or_else(|| FilterError::UnknownOperator {
            model: model.name.clone(),
            field: field.to_owned(),
            operator: name.to_owned(),
        })?;

        if operand.is_null() {
            debug!(model = %model.name, field, operator = %operator, "Skipping null filter operand");
            continue;
        }
        check_operand(field, operator, operand)?;

        leaves.push(Predicate::compare(field, operator, operand.clone()));
    }

    Ok(Predicate::all(leaves))
}

fn check_operand(field: &str, operator: Operator, operand: &Value) -> Result<(), FilterError> {
    let expected = match (operator, operand) {
        (Operator::In, Value::Array(items)) if items.iter().all(is_scalar) => return Ok(()),
        (Operator::In, Value::Array(_)) => "a list of scalars",
        (Operator::In, _) => "a list",
        (Operator::IsNull, Value::Bool(_)) => return Ok(()),
        (Operator::IsNull, _) => "a boolean",
        (Operator::Includes, Value::String(_)) => return Ok(()),
        (Operator::Includes, _) => "a string",
        (_, operand) if is_scalar(operand) => return Ok(()),
        _ => "a scalar",
    };

    Err(FilterError::InvalidOperand {
        field: field.to_owned(),
        operator: operator.as_str().to_owned(),
        reason: format!("expected {expected}, found {}", describe(operand)),
    })
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn sorted_entries(map: &Map<String, Value>) -> Vec<(&str, &Value)> {
    let mut entries: Vec<(&str, &Value)> = map.iter().map(|(k, v)| (k.as_str(), v)).collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
    entries
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
