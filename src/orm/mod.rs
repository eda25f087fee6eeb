//! SQL rendering layer
//!
//! Turns [`QueryPlan`](crate::graphql::QueryPlan)s into parameterized
//! statements an executor can run. Nothing here touches a connection:
//!
//! ```rust,ignore
//! let builder = StatementBuilder::new(&registry);
//! let rows = builder.select(users, &plan)?;
//! let total = builder.count(users, &plan)?;
//! let posts = builder.select_related(users.relation("posts").unwrap(), &plan.eager_load["posts"], &keys)?;
//! ```

mod builder;
mod traits;

pub use builder::*;
pub use traits::*;
