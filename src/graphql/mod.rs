//! Request-side translation: filters, selections and query plans
//!
//! Everything here is pure and per-request. Planning reads the shared
//! [`ModelRegistry`](crate::schema::ModelRegistry) and never mutates it.

mod error;
mod filters;
mod operations;
mod pagination;
mod planner;
mod selection;

pub use error::{FilterError, PlanError};
pub use filters::{Operator, Predicate, translate};
pub use operations::OperationKind;
pub use pagination::PageInfo;
pub use planner::{QueryArgs, QueryPlan, QueryPlanner, SelectionNode};
pub use selection::{args_from_pairs, selection_from_lookahead};
