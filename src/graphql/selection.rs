//! Conversion of async-graphql look-ahead selections into [`SelectionNode`]s

use async_graphql::context::SelectionField;
use serde_json::{Map, Value};

use super::error::PlanError;
use super::planner::{QueryArgs, SelectionNode};

const INPUT: &str = "input";
const LIMIT: &str = "limit";
const OFFSET: &str = "offset";
const FILTER: &str = "filter";

/// Build a selection tree from a resolver's look-ahead field.
///
/// Children are keyed by field name, so two aliases of the same field
/// collapse into one entry; the last one wins.
pub fn selection_from_lookahead(field: SelectionField<'_>) -> Result<SelectionNode, PlanError> {
    let arguments = field
        .arguments()
        .map_err(|err| PlanError::InvalidArgument {
            argument: field.name().to_owned(),
            reason: err.message,
        })?;

    let pairs = arguments
        .into_iter()
        .map(|(name, value)| {
            let json = value.into_json().map_err(|err| PlanError::InvalidArgument {
                argument: name.to_string(),
                reason: err.to_string(),
            })?;
            Ok((name.to_string(), json))
        })
        .collect::<Result<Vec<_>, PlanError>>()?;

    let mut node = SelectionNode::new().with_args(args_from_pairs(pairs)?);
    for child in field.selection_set() {
        let name = child.name().to_owned();
        node.children.insert(name, selection_from_lookahead(child)?);
    }
    Ok(node)
}

/// Read `limit`, `offset` and `filter` from field arguments.
///
/// Generated operations wrap them in a single `input` object; hand-written
/// resolvers may pass them at the top level. `input` takes precedence.
pub fn args_from_pairs(
    pairs: impl IntoIterator<Item = (String, Value)>,
) -> Result<QueryArgs, PlanError> {
    let mut top_level: Map<String, Value> = pairs.into_iter().collect();

    let source = match top_level.remove(INPUT) {
        Some(Value::Object(input)) => input,
        Some(Value::Null) | None => top_level,
        Some(other) => {
            return Err(PlanError::InvalidArgument {
                argument: INPUT.to_owned(),
                reason: format!("expected an object, got {other}"),
            });
        }
    };

    Ok(QueryArgs {
        limit: count(&source, LIMIT)?,
        offset: count(&source, OFFSET)?,
        filter: source.get(FILTER).filter(|v| !v.is_null()).cloned(),
    })
}

fn count(source: &Map<String, Value>, argument: &str) -> Result<Option<u64>, PlanError> {
    match source.get(argument) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_u64().map(Some).ok_or_else(|| PlanError::InvalidArgument {
            argument: argument.to_owned(),
            reason: format!("expected a non-negative integer, got {value}"),
        }),
    }
}
