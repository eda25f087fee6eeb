//! Selection-to-query planning
//!
//! The planner walks a [`SelectionNode`] tree alongside the model graph. Each
//! child naming a relation becomes an eager-load entry planned against the
//! relation's foreign model; scalar children are served by the parent fetch
//! and add nothing. A name that is neither a field nor a relation of the
//! model is rejected; `__`-prefixed introspection names are skipped.
//! Arguments on a node (`limit`, `offset`, `filter`) apply at that level only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::error::PlanError;
use super::filters::{Predicate, translate};
use crate::schema::{Model, ModelRegistry};

/// Arguments accepted on the root selection and on relation selections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
}

impl QueryArgs {
    pub fn is_empty(&self) -> bool {
        self.limit.is_none() && self.offset.is_none() && self.filter.is_none()
    }
}

/// One node of a requested selection, with its children keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionNode {
    #[serde(default, skip_serializing_if = "QueryArgs::is_empty")]
    pub args: QueryArgs,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, SelectionNode>,
}

impl SelectionNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_args(mut self, args: QueryArgs) -> Self {
        self.args = args;
        self
    }

    pub fn filter(mut self, filter: Value) -> Self {
        self.args.filter = Some(filter);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.args.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.args.offset = Some(offset);
        self
    }

    /// Select a scalar field or a relation without sub-selections.
    pub fn field(self, name: impl Into<String>) -> Self {
        self.child(name, SelectionNode::new())
    }

    pub fn child(mut self, name: impl Into<String>, node: SelectionNode) -> Self {
        self.children.insert(name.into(), node);
        self
    }
}

/// What to fetch for one level of a selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPlan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicate: Option<Predicate>,
    pub eager_load: BTreeMap<String, QueryPlan>,
}

/// Plans selections against a registry. Cheap to create per request.
#[derive(Debug, Clone, Copy)]
pub struct QueryPlanner<'r> {
    registry: &'r ModelRegistry,
}

impl<'r> QueryPlanner<'r> {
    pub fn new(registry: &'r ModelRegistry) -> Self {
        Self { registry }
    }

    /// Plan `selection` rooted at `model`.
    pub fn plan(&self, selection: &SelectionNode, model: &Model) -> Result<QueryPlan, PlanError> {
        let plan = self.plan_node(selection, model)?;
        debug!(
            model = %model.name,
            eager_loads = plan.eager_load.len(),
            filtered = plan.predicate.is_some(),
            "Planned selection"
        );
        Ok(plan)
    }

    /// Plan `selection` rooted at the model registered as `model_name`.
    pub fn plan_for(&self, selection: &SelectionNode, model_name: &str) -> Result<QueryPlan, PlanError> {
        let model = self
            .registry
            .get(model_name)
            .ok_or_else(|| PlanError::ModelNotFound {
                name: model_name.to_owned(),
            })?;
        self.plan(selection, model)
    }

    fn plan_node(&self, selection: &SelectionNode, model: &Model) -> Result<QueryPlan, PlanError> {
        let mut eager_load = BTreeMap::new();

        for (name, child) in &selection.children {
            match model.relation(name) {
                Some(relation) => {
                    let foreign = self.registry.foreign_model(relation);
                    eager_load.insert(name.clone(), self.plan_node(child, foreign)?);
                }
                // introspection fields such as __typename
                None if name.starts_with("__") => {}
                None if model.has_field(name) && child.children.is_empty() => {}
                None if model.has_field(name) => {
                    return Err(PlanError::UnknownRelation {
                        model: model.name.clone(),
                        field: name.clone(),
                    });
                }
                None => {
                    return Err(PlanError::UnknownField {
                        model: model.name.clone(),
                        field: name.clone(),
                    });
                }
            }
        }

        Ok(QueryPlan {
            limit: selection.args.limit,
            offset: selection.args.offset,
            predicate: translate(selection.args.filter.as_ref(), model)?,
            eager_load,
        })
    }
}
