//! trasy: routes drawn over background images as ordered lists of points,
//! served as browser pages and as a token-authenticated REST API.

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod guard;
pub mod handlers;
pub mod model;
pub mod openapi;
pub mod ordering;
pub mod response;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;
pub mod templates;

pub use config::{Settings, StoreKind};
pub use error::{AppError, ConfigError};
pub use routes::{api_routes, common_routes, form_routes};
pub use state::AppState;
pub use store::{ensure_database_exists, MemoryStore, PgStore, Store};

use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Every surface merged, with the body limit and request tracing applied.
pub fn app(state: AppState, settings: &Settings) -> Router {
    Router::new()
        .merge(common_routes())
        .merge(form_routes())
        .merge(api_routes())
        .nest_service("/media", ServeDir::new(&settings.media_root))
        .layer(RequestBodyLimitLayer::new(settings.body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
