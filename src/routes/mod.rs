//! Routers per surface. The binary (and the integration tests) merge them via
//! [`crate::app`].

mod api;
mod common;
mod forms;

pub use api::api_routes;
pub use common::common_routes;
pub use forms::form_routes;

use axum::routing::MethodRouter;
use axum::Router;

/// Registers `path` (written with a trailing slash) both with and without it.
fn slashed<S>(router: Router<S>, path: &str, method_router: MethodRouter<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let bare = path.trim_end_matches('/');
    if bare.is_empty() || bare == path {
        return router.route(path, method_router);
    }
    router.route(path, method_router.clone()).route(bare, method_router)
}
