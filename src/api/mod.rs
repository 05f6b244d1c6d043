//! HTTP API

pub mod handlers;
pub mod models;
pub mod routes;

pub use handlers::AppState;
pub use models::{
    ApiError, ClaimSearchRequest, ClaimsListResponse, FilteredClaimsRequest, FilteredClaimsResponse,
    HealthResponse, VerifyRequest, VerifyResponse,
};
pub use routes::build_router;
