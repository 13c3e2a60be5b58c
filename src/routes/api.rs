//! Every method on every `/api` path goes to the front door; it does its own route matching.

use crate::handlers::api_front_door;
use crate::state::AppState;
use axum::{routing::any, Router};

pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/api", any(api_front_door))
        .route("/api/", any(api_front_door))
        .route("/api/*rest", any(api_front_door))
        .fallback(api_front_door)
        .with_state(state)
}
