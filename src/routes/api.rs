//! REST surface under `/api/`.

use super::slashed;
use crate::handlers::api::{
    create_point, create_route, delete_point, delete_route, list_backgrounds, list_points, list_routes, move_point,
    obtain_token, patch_point, patch_route, read_background, read_point, read_route, replace_point, replace_route,
    route_point_details,
};
use crate::openapi::ApiDoc;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::{Json, Router};
use utoipa::OpenApi;

async fn schema() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn api_routes() -> Router<AppState> {
    let router = slashed(Router::new(), "/api/token-auth/", post(obtain_token));
    let router = slashed(router, "/api/schema/", get(schema));
    let router = slashed(router, "/api/obrazy-tla/", get(list_backgrounds));
    let router = slashed(router, "/api/obrazy-tla/:id/", get(read_background));
    let router = slashed(router, "/api/trasy/", get(list_routes).post(create_route));
    let router = slashed(
        router,
        "/api/trasy/:route_id/",
        get(read_route).put(replace_route).patch(patch_route).delete(delete_route),
    );
    let router = slashed(router, "/api/trasy/:route_id/punkty-details/", get(route_point_details));
    let router = slashed(router, "/api/trasy/:route_id/punkty/", get(list_points).post(create_point));
    let router = slashed(
        router,
        "/api/trasy/:route_id/punkty/:point_id/",
        get(read_point).put(replace_point).patch(patch_point).delete(delete_point),
    );
    slashed(
        router,
        "/api/trasy/:route_id/punkty/:point_id/move/:direction/",
        post(move_point),
    )
}
