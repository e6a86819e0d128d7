pub mod api;
mod middleware;

pub use api::{ApiState, build_api_router};
pub use middleware::{RequestContext, log_responses, set_request_context};

use axum::{Router, extract::DefaultBodyLimit, middleware as axum_middleware};

/// Full HTTP surface with request ids, response logging and the body limit applied.
pub fn build_router(state: ApiState, max_request_bytes: usize) -> Router {
    build_api_router(state)
        .layer(DefaultBodyLimit::max(max_request_bytes))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
