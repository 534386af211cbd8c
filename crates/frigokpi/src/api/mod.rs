//! HTTP API module.
//!
//! Auth endpoints, identity administration, and the guard endpoint used by
//! the CRUD services in front of business records.

mod error;
pub mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::create_router;
pub use state::AppState;
