use crate::interfaces::http::handlers;
use crate::interfaces::http::middleware::log_requests;
use crate::interfaces::http::state::AppState;
use axum::{Router, middleware, routing::get};

pub fn create_router(state: AppState, request_logs: bool) -> Router {
    let router = Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/score", get(handlers::score))
        .route("/demo/data", get(handlers::demo_data))
        .route("/metrics", get(handlers::metrics));

    let router = if request_logs {
        router.layer(middleware::from_fn(log_requests))
    } else {
        router
    };

    router.with_state(state)
}
