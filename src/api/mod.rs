//! REST API layer for the workflow execution core.
//!
//! Exposes the execute, history, and assembly-resolve endpoints of the
//! core over HTTP, plus a `/health` check.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use response::{ErrorResponse, SuccessResponse};
pub use routes::{create_router, AppState};
