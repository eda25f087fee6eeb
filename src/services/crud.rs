//! CRUD operation preparation
//!
//! [`CrudService`] turns read requests against a model into [`QueryPlan`]s.
//! Each operation kind can carry one [`Interceptor`] that sees the request
//! before planning and the result after it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::graphql::{
    OperationKind, Operator, PlanError, Predicate, QueryArgs, QueryPlan, QueryPlanner,
    SelectionNode,
};
use crate::schema::ModelRegistry;

/// A request for one generated operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRequest {
    pub kind: OperationKind,
    pub model: String,
    pub args: QueryArgs,
    pub selection: SelectionNode,
    /// Primary key value, for single-row operations
    pub key: Option<Value>,
}

/// A planned operation, ready to be rendered and executed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedOperation {
    pub name: String,
    pub kind: OperationKind,
    pub model: String,
    pub plan: QueryPlan,
}

/// Continuation handed to an [`Interceptor`]; runs the actual planning.
pub type Next<'a> = &'a dyn Fn(OperationRequest) -> Result<PreparedOperation, PlanError>;

/// Wraps the preparation of one operation kind.
///
/// An interceptor may rewrite the request before calling `next`, adjust the
/// prepared operation afterwards, or return [`PlanError::Rejected`] without
/// calling `next` at all.
pub trait Interceptor: Send + Sync {
    fn intercept(
        &self,
        request: OperationRequest,
        next: Next<'_>,
    ) -> Result<PreparedOperation, PlanError>;
}

/// Prepares read operations over a shared model graph.
#[derive(Clone)]
pub struct CrudService {
    registry: Arc<ModelRegistry>,
    interceptors: HashMap<OperationKind, Arc<dyn Interceptor>>,
    default_limit: Option<u64>,
}

impl fmt::Debug for CrudService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrudService")
            .field("models", &self.registry.len())
            .field("interceptors", &self.interceptors.keys().collect::<Vec<_>>())
            .field("default_limit", &self.default_limit)
            .finish()
    }
}

impl CrudService {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            interceptors: HashMap::new(),
            default_limit: None,
        }
    }

    /// Limit used by `get_many` when the request has none.
    pub fn with_default_limit(mut self, limit: Option<u64>) -> Self {
        self.default_limit = limit;
        self
    }

    /// Register the interceptor for `kind`, replacing any previous one.
    pub fn with_interceptor(mut self, kind: OperationKind, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.insert(kind, interceptor);
        self
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Plan fetching the single row of `model` whose primary key equals `key`.
    pub fn get_one(
        &self,
        model: &str,
        key: Value,
        selection: SelectionNode,
    ) -> Result<PreparedOperation, PlanError> {
        self.dispatch(OperationRequest {
            kind: OperationKind::GetOne,
            model: model.to_owned(),
            args: QueryArgs::default(),
            selection,
            key: Some(key),
        })
    }

    /// Plan a page of `model` rows. `nodes` is the selection under the
    /// result's `nodes` field; `args` apply to the root rows.
    pub fn get_many(
        &self,
        model: &str,
        args: QueryArgs,
        nodes: SelectionNode,
    ) -> Result<PreparedOperation, PlanError> {
        self.dispatch(OperationRequest {
            kind: OperationKind::GetMany,
            model: model.to_owned(),
            args,
            selection: nodes,
            key: None,
        })
    }

    /// Run `request` through its interceptor, if any, and plan it.
    pub fn dispatch(&self, request: OperationRequest) -> Result<PreparedOperation, PlanError> {
        let name = request.kind.operation_name(&request.model);
        let next = |request: OperationRequest| self.prepare(request);

        let result = match self.interceptors.get(&request.kind) {
            Some(interceptor) => interceptor.intercept(request, &next),
            None => next(request),
        };

        match &result {
            Ok(prepared) => debug!(operation = %prepared.name, "Prepared operation"),
            Err(err) => warn!(operation = %name, error = %err, "Operation failed"),
        }
        result
    }

    fn prepare(&self, request: OperationRequest) -> Result<PreparedOperation, PlanError> {
        let name = request.kind.operation_name(&request.model);
        let model = self
            .registry
            .get(&request.model)
            .ok_or_else(|| PlanError::ModelNotFound {
                name: request.model.clone(),
            })?;
        let planner = QueryPlanner::new(&self.registry);

        let plan = match request.kind {
            OperationKind::GetOne => {
                let key = request.key.ok_or_else(|| PlanError::InvalidArgument {
                    argument: "key".to_owned(),
                    reason: format!("{name} requires a primary key value"),
                })?;
                let mut plan = planner.plan(&request.selection, model)?;
                let by_key = Predicate::compare(&model.primary_key().name, Operator::Equals, key);
                plan.predicate = Predicate::all(plan.predicate.into_iter().chain([by_key]).collect());
                plan.limit = Some(1);
                plan.offset = None;
                plan
            }
            OperationKind::GetMany => {
                let mut args = request.args;
                if args.limit.is_none() {
                    args.limit = self.default_limit;
                }
                planner.plan(&request.selection.with_args(args), model)?
            }
            OperationKind::CreateOne | OperationKind::UpdateOne | OperationKind::DeleteOne => {
                return Err(PlanError::Unsupported { operation: name });
            }
        };

        Ok(PreparedOperation {
            name,
            kind: request.kind,
            model: model.name.clone(),
            plan,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::schema::{
        ColumnDescription, DataType, RelationEntry, SchemaDeclaration, TableDescription,
    };

    fn service() -> CrudService {
        let schema = SchemaDeclaration::new()
            .table(
                "users",
                TableDescription::new("users")
                    .column(ColumnDescription::new("userId", DataType::Serial).column_name("user_id").primary_key())
                    .column(ColumnDescription::new("name", DataType::Text)),
            )
            .table(
                "posts",
                TableDescription::new("posts")
                    .column(ColumnDescription::new("id", DataType::Serial).primary_key())
                    .column(ColumnDescription::new("authorId", DataType::Integer).column_name("author_id")),
            )
            .relation("posts", "author", RelationEntry::one("users").join("author_id", "user_id"))
            .relation("users", "posts", RelationEntry::many("posts"));
        CrudService::new(Arc::new(ModelRegistry::build(&schema).unwrap()))
    }

    #[test]
    fn test_get_one_filters_by_primary_key() {
        let prepared = service()
            .get_one("users", json!(7), SelectionNode::new().field("name").field("posts"))
            .unwrap();

        assert_eq!(prepared.name, "usersGetOne");
        assert_eq!(
            prepared.plan.predicate,
            Some(Predicate::compare("userId", Operator::Equals, 7))
        );
        assert_eq!(prepared.plan.limit, Some(1));
        assert!(prepared.plan.eager_load.contains_key("posts"));
    }

    #[test]
    fn test_get_many_applies_root_args() {
        let args = QueryArgs {
            limit: Some(10),
            offset: Some(20),
            filter: Some(json!({ "name": { "includes": "a" } })),
        };
        let prepared = service()
            .get_many("users", args, SelectionNode::new().child("posts", SelectionNode::new().limit(2)))
            .unwrap();

        assert_eq!(prepared.name, "usersGetMany");
        assert_eq!((prepared.plan.limit, prepared.plan.offset), (Some(10), Some(20)));
        assert_eq!(
            prepared.plan.predicate,
            Some(Predicate::compare("name", Operator::Includes, "a"))
        );
        assert_eq!(prepared.plan.eager_load["posts"].limit, Some(2));
    }

    #[test]
    fn test_default_limit_only_fills_missing_limit() {
        let service = service().with_default_limit(Some(25));

        let defaulted = service.get_many("users", QueryArgs::default(), SelectionNode::new()).unwrap();
        let explicit = service
            .get_many("users", QueryArgs { limit: Some(5), ..Default::default() }, SelectionNode::new())
            .unwrap();

        assert_eq!(defaulted.plan.limit, Some(25));
        assert_eq!(explicit.plan.limit, Some(5));
    }

    #[test]
    fn test_unknown_model_and_mutations() {
        let service = service();

        assert_matches!(
            service.get_many("tags", QueryArgs::default(), SelectionNode::new()),
            Err(PlanError::ModelNotFound { .. })
        );
        let request = OperationRequest {
            kind: OperationKind::DeleteOne,
            model: "users".to_owned(),
            args: QueryArgs::default(),
            selection: SelectionNode::new(),
            key: Some(json!(1)),
        };
        assert_matches!(
            service.dispatch(request),
            Err(PlanError::Unsupported { ref operation }) if operation == "usersDeleteOne"
        );
    }

    struct Counting(AtomicUsize);

    impl Interceptor for Counting {
        fn intercept(
            &self,
            request: OperationRequest,
            next: Next<'_>,
        ) -> Result<PreparedOperation, PlanError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            next(request)
        }
    }

    struct CapLimit(u64);

    impl Interceptor for CapLimit {
        fn intercept(
            &self,
            mut request: OperationRequest,
            next: Next<'_>,
        ) -> Result<PreparedOperation, PlanError> {
            request.args.limit = Some(request.args.limit.map_or(self.0, |l| l.min(self.0)));
            next(request)
        }
    }

    struct Deny;

    impl Interceptor for Deny {
        fn intercept(
            &self,
            request: OperationRequest,
            _next: Next<'_>,
        ) -> Result<PreparedOperation, PlanError> {
            Err(PlanError::Rejected {
                operation: request.kind.operation_name(&request.model),
                reason: "read access denied".to_owned(),
            })
        }
    }

    #[test]
    fn test_interceptor_wraps_its_kind_only() {
        let counter = Arc::new(Counting(AtomicUsize::new(0)));
        let service = service().with_interceptor(OperationKind::GetMany, counter.clone());

        service.get_many("users", QueryArgs::default(), SelectionNode::new()).unwrap();
        service.get_one("users", json!(1), SelectionNode::new()).unwrap();

        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_interceptor_can_rewrite_request() {
        let service = service().with_interceptor(OperationKind::GetMany, Arc::new(CapLimit(50)));

        let capped = service
            .get_many("users", QueryArgs { limit: Some(500), ..Default::default() }, SelectionNode::new())
            .unwrap();
        assert_eq!(capped.plan.limit, Some(50));
    }

    #[test]
    fn test_interceptor_can_reject() {
        let service = service().with_interceptor(OperationKind::GetOne, Arc::new(Deny));

        assert_matches!(
            service.get_one("users", json!(1), SelectionNode::new()),
            Err(PlanError::Rejected { ref operation, .. }) if operation == "usersGetOne"
        );
    }

    #[test]
    fn test_service_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CrudService>();
    }
}
