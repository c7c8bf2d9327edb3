//! REST surface under `/api/`. Every resource except token exchange needs a
//! valid token; routes and points are visible to their owner only.

use crate::error::AppError;
use crate::extractors::ApiUser;
use crate::model::{BackgroundId, Direction, NewRoute, PointChanges, PointId, RouteChanges, RouteId};
use crate::response::{created, ok, page};
use crate::service::validation::{self, NAME_MAX_LENGTH};
use crate::service::{AccountService, PointService, RouteService};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{Map, Value};

/// Full (`PUT`/`POST`) or partial (`PATCH`) route fields.
fn route_changes(body: &Map<String, Value>, partial: bool) -> Result<RouteChanges, AppError> {
    let name = match validation::json_text("nazwa", body)? {
        Some(raw) => Some(validation::name("nazwa", Some(raw), NAME_MAX_LENGTH)?),
        None if partial => None,
        None => return Err(AppError::validation("nazwa", "This field is required.")),
    };
    let background_id = match validation::json_id("obraz_tla", body)? {
        Some(id) => Some(id),
        None if partial => None,
        None => return Err(AppError::validation("obraz_tla", "This field is required.")),
    };
    let description = validation::json_text("opis", body)?.map(|s| s.trim().to_string());
    Ok(RouteChanges {
        name,
        description,
        background_id,
    })
}

fn point_changes(body: &Map<String, Value>, partial: bool) -> Result<PointChanges, AppError> {
    if partial {
        Ok(PointChanges {
            x: validation::optional_json_coordinate("x", body.get("x"))?,
            y: validation::optional_json_coordinate("y", body.get("y"))?,
        })
    } else {
        Ok(PointChanges {
            x: Some(validation::json_coordinate("x", body.get("x"))?),
            y: Some(validation::json_coordinate("y", body.get("y"))?),
        })
    }
}

/// `kolejnosc` is always assigned by the server.
fn ignore_client_order(body: &Map<String, Value>, route_id: RouteId) {
    if let Some(order) = body.get("kolejnosc") {
        tracing::debug!(route = route_id, kolejnosc = %order, "ignoring client-supplied order");
    }
}

/// POST /api/token-auth/
pub async fn obtain_token(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let body = validation::json_object(body)?;
    let username = validation::json_text("username", &body)?
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation("username", "This field is required."))?;
    let password = validation::json_text("password", &body)?
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation("password", "This field is required."))?;
    let token = AccountService::obtain_token(state.store.accounts(), username, password).await?;
    Ok(ok(serde_json::json!({ "token": token })))
}

/// GET /api/obrazy-tla/
pub async fn list_backgrounds(
    ApiUser(_user): ApiUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    Ok(page(state.store.list_backgrounds().await?))
}

/// GET /api/obrazy-tla/:id/
pub async fn read_background(
    ApiUser(_user): ApiUser,
    State(state): State<AppState>,
    Path(id): Path<BackgroundId>,
) -> Result<impl IntoResponse, AppError> {
    let background = state
        .store
        .background(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("obraz tła {}", id)))?;
    Ok(ok(background))
}

/// GET /api/trasy/
pub async fn list_routes(
    ApiUser(user): ApiUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    Ok(page(RouteService::list_detailed(state.store.routes(), &user).await?))
}

/// POST /api/trasy/
pub async fn create_route(
    ApiUser(user): ApiUser,
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let body = validation::json_object(body)?;
    let changes = route_changes(&body, false)?;
    let new = NewRoute {
        name: changes.name.unwrap_or_default(),
        description: changes.description.unwrap_or_default(),
        background_id: changes.background_id.unwrap_or_default(),
    };
    let store = state.store.routes();
    let route = RouteService::create(store, &user, new).await?;
    Ok(created(RouteService::detail(store, &user, route.id).await?))
}

/// GET /api/trasy/:id/
pub async fn read_route(
    ApiUser(user): ApiUser,
    State(state): State<AppState>,
    Path(route_id): Path<RouteId>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(RouteService::detail(state.store.routes(), &user, route_id).await?))
}

/// PUT /api/trasy/:id/
pub async fn replace_route(
    ApiUser(user): ApiUser,
    State(state): State<AppState>,
    Path(route_id): Path<RouteId>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let store = state.store.routes();
    RouteService::get(store, &user, route_id).await?;
    let changes = route_changes(&validation::json_object(body)?, false)?;
    Ok(ok(RouteService::update(store, &user, route_id, changes).await?))
}

/// PATCH /api/trasy/:id/
pub async fn patch_route(
    ApiUser(user): ApiUser,
    State(state): State<AppState>,
    Path(route_id): Path<RouteId>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let store = state.store.routes();
    RouteService::get(store, &user, route_id).await?;
    let changes = route_changes(&validation::json_object(body)?, true)?;
    Ok(ok(RouteService::update(store, &user, route_id, changes).await?))
}

/// DELETE /api/trasy/:id/
pub async fn delete_route(
    ApiUser(user): ApiUser,
    State(state): State<AppState>,
    Path(route_id): Path<RouteId>,
) -> Result<impl IntoResponse, AppError> {
    RouteService::delete(state.store.routes(), &user, route_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/trasy/:id/punkty-details/: bare array of points.
pub async fn route_point_details(
    ApiUser(user): ApiUser,
    State(state): State<AppState>,
    Path(route_id): Path<RouteId>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(PointService::list(state.store.routes(), &user, route_id).await?))
}

/// GET /api/trasy/:route_id/punkty/
pub async fn list_points(
    ApiUser(user): ApiUser,
    State(state): State<AppState>,
    Path(route_id): Path<RouteId>,
) -> Result<impl IntoResponse, AppError> {
    Ok(page(PointService::list(state.store.routes(), &user, route_id).await?))
}

/// POST /api/trasy/:route_id/punkty/
pub async fn create_point(
    ApiUser(user): ApiUser,
    State(state): State<AppState>,
    Path(route_id): Path<RouteId>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let store = state.store.routes();
    RouteService::get(store, &user, route_id).await?;
    let body = validation::json_object(body)?;
    let x = validation::json_coordinate("x", body.get("x"))?;
    let y = validation::json_coordinate("y", body.get("y"))?;
    ignore_client_order(&body, route_id);
    let point = PointService::append(store, &user, route_id, x, y).await?;
    Ok(created(point))
}

/// GET /api/trasy/:route_id/punkty/:point_id/
pub async fn read_point(
    ApiUser(user): ApiUser,
    State(state): State<AppState>,
    Path((route_id, point_id)): Path<(RouteId, PointId)>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(PointService::get(state.store.routes(), &user, route_id, point_id).await?))
}

async fn update_point(
    user: &crate::model::User,
    state: &AppState,
    route_id: RouteId,
    point_id: PointId,
    body: Value,
    partial: bool,
) -> Result<impl IntoResponse, AppError> {
    let store = state.store.routes();
    PointService::get(store, user, route_id, point_id).await?;
    let body = validation::json_object(body)?;
    let changes = point_changes(&body, partial)?;
    ignore_client_order(&body, route_id);
    Ok(ok(PointService::update_coords(store, user, route_id, point_id, changes).await?))
}

/// PUT /api/trasy/:route_id/punkty/:point_id/
pub async fn replace_point(
    ApiUser(user): ApiUser,
    State(state): State<AppState>,
    Path((route_id, point_id)): Path<(RouteId, PointId)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    update_point(&user, &state, route_id, point_id, body, false).await
}

/// PATCH /api/trasy/:route_id/punkty/:point_id/
pub async fn patch_point(
    ApiUser(user): ApiUser,
    State(state): State<AppState>,
    Path((route_id, point_id)): Path<(RouteId, PointId)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    update_point(&user, &state, route_id, point_id, body, true).await
}

/// DELETE /api/trasy/:route_id/punkty/:point_id/: compacts the remaining points.
pub async fn delete_point(
    ApiUser(user): ApiUser,
    State(state): State<AppState>,
    Path((route_id, point_id)): Path<(RouteId, PointId)>,
) -> Result<impl IntoResponse, AppError> {
    PointService::delete_in_route(state.store.routes(), &user, route_id, point_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/trasy/:route_id/punkty/:point_id/move/:direction/
pub async fn move_point(
    ApiUser(user): ApiUser,
    State(state): State<AppState>,
    Path((route_id, point_id, direction)): Path<(RouteId, PointId, String)>,
) -> Result<impl IntoResponse, AppError> {
    let points = PointService::swap_in_route(
        state.store.routes(),
        &user,
        route_id,
        point_id,
        Direction::parse(&direction),
    )
    .await?;
    Ok(page(points))
}
