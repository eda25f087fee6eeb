//! Services built on the model graph

pub mod crud;
pub mod logging;

pub use crud::{CrudService, Interceptor, Next, OperationRequest, PreparedOperation};
pub use logging::init_tracing;
