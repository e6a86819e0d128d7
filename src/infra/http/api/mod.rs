pub mod error;
pub mod handlers;
pub mod state;

pub use state::ApiState;

use axum::{
    Router,
    routing::{get, post},
};

pub fn build_api_router(state: ApiState) -> Router {
    Router::new()
        .route("/translate", post(handlers::translate))
        .route("/translate/text", post(handlers::translate_text))
        .route("/health", get(handlers::health))
        .with_state(state)
}
