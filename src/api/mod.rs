//! # HTTP API
//!
//! Axum router, handlers and the mapping from service errors to HTTP responses.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use routes::{build_router, ApiState};
pub use server::start_api_server;
