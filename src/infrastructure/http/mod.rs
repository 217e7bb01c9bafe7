pub mod controllers;
pub mod middleware;
pub mod router;

pub use middleware::{ApiError, ApiResult, AppState};
pub use router::build_router;
