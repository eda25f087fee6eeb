//! Automatic CRUD derivation from a relational schema
//!
//! A schema declaration (tables plus relation declarations) is turned into a
//! [`ModelRegistry`](schema::ModelRegistry) once at startup. Requests then
//! translate filters and selections against it into
//! [`QueryPlan`](graphql::QueryPlan)s, which [`orm`] renders as SQL.

pub mod config;
pub mod graphql;
pub mod orm;
pub mod schema;
pub mod services;
