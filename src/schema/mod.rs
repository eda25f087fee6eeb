//! Schema extraction and relation resolution
//!
//! Turns a [`SchemaDeclaration`] into a [`ModelRegistry`]: one [`Model`] per
//! table, each with its fields, primary key and resolved [`Relation`]s.
//!
//! ```rust,ignore
//! let registry = ModelRegistry::build(&declaration)?;
//! let users = registry.get("users").expect("declared");
//! let posts = users.relation("posts").map(|r| registry.foreign_model(r));
//! ```

mod declaration;
mod error;
mod extract;
mod model;
mod registry;
mod relations;
mod types;

pub use declaration::*;
pub use error::SchemaError;
pub use extract::extract_models;
pub use model::{Field, Model, ModelId, Relation};
pub use registry::ModelRegistry;
pub use relations::resolve_relations;
pub use types::{DataType, GraphQlScalar, RelationKind};
