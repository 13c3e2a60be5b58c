//! Events API: a REST backend for event records and auth tokens over an
//! ordered key-value store.

pub mod config;
pub mod controller;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod hashword;
pub mod model;
pub mod record;
pub mod registry;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod state;
pub mod store;

pub use config::ServerConfig;
pub use error::{AppError, ConfigError, ErrorKind, RegistryError};
pub use registry::ResponseRegistry;
pub use routes::{api_routes, common_routes_with_ready};
pub use state::AppState;
pub use store::{JsonFileStore, KvStore, MemoryStore};

use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Full router: common routes, then the `/api` front door for everything else.
pub fn app(state: AppState) -> Router {
    let limit = state.config.body_limit_bytes;
    Router::new()
        .merge(common_routes_with_ready(state.clone()))
        .merge(api_routes(state))
        .layer(RequestBodyLimitLayer::new(limit))
        .layer(TraceLayer::new_for_http())
}
