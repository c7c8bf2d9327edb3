//! Form surface: the route editor page and its point actions.
//!
//! Plain requests get a redirect back to the editor; requests flagged with
//! `X-Requested-With: XMLHttpRequest` get JSON instead.

use crate::error::AppError;
use crate::extractors::{AjaxRequest, SessionUser};
use crate::model::{BackgroundId, Direction, NewRoute, PointId, RouteId, RoutePoint, User};
use crate::response::{failure, point_created, points_envelope};
use crate::service::validation::{self, NAME_MAX_LENGTH};
use crate::service::{PointService, RouteService};
use crate::state::AppState;
use crate::templates::render;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use minijinja::{context, Value};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Default, Deserialize)]
pub struct PointForm {
    pub x: Option<String>,
    pub y: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RouteForm {
    pub nazwa: Option<String>,
    pub opis: Option<String>,
}

fn edit_url(route_id: RouteId) -> String {
    format!("/trasa/edit/{}/", route_id)
}

pub(crate) fn user_ctx(user: &User) -> Value {
    context! { username => user.username.clone() }
}

/// `{field: [message]}` for re-rendering a form; other errors pass through.
pub(crate) fn field_errors(err: AppError) -> Result<Value, AppError> {
    match err {
        AppError::Validation { field, message } => {
            Ok(Value::from_serialize(BTreeMap::from([(field, vec![message])])))
        }
        other => Err(other),
    }
}

fn parse_point(form: &PointForm) -> Result<(i32, i32), AppError> {
    let x = validation::coordinate("x", form.x.as_deref())?;
    let y = validation::coordinate("y", form.y.as_deref())?;
    Ok((x, y))
}

/// After a mutation: JSON list for AJAX callers, redirect otherwise.
fn after_mutation(ajax: bool, route_id: RouteId, points: &[RoutePoint]) -> Response {
    if ajax {
        points_envelope(points).into_response()
    } else {
        Redirect::to(&edit_url(route_id)).into_response()
    }
}

async fn render_edit(
    state: &AppState,
    user: &User,
    route_id: RouteId,
    errors: Option<Value>,
    form: &PointForm,
) -> Result<axum::response::Html<String>, AppError> {
    let store = state.store.routes();
    let route = RouteService::get(store, user, route_id).await?;
    let background = RouteService::background(store, &route).await?;
    let points = store.list_points(route.id).await?;
    render(
        &state.templates,
        "trasa_edit.html",
        context! {
            user => user_ctx(user),
            trasa => route,
            tlo => background,
            punkty => points,
            errors => errors,
            x => form.x.clone(),
            y => form.y.clone(),
        },
    )
}

/// GET /trasa/edit/:route_id
pub async fn edit_page(
    SessionUser(user): SessionUser,
    State(state): State<AppState>,
    Path(route_id): Path<RouteId>,
) -> Result<Response, AppError> {
    Ok(render_edit(&state, &user, route_id, None, &PointForm::default())
        .await?
        .into_response())
}

/// POST /trasa/edit/:route_id: append a point from the form.
pub async fn edit_submit(
    SessionUser(user): SessionUser,
    AjaxRequest(ajax): AjaxRequest,
    State(state): State<AppState>,
    Path(route_id): Path<RouteId>,
    Form(form): Form<PointForm>,
) -> Result<Response, AppError> {
    let store = state.store.routes();
    let route = RouteService::get(store, &user, route_id).await?;
    let (x, y) = match parse_point(&form) {
        Ok(xy) => xy,
        Err(err) if ajax => return Err(err),
        Err(err) => {
            let errors = field_errors(err)?;
            let page = render_edit(&state, &user, route.id, Some(errors), &form).await?;
            return Ok((StatusCode::BAD_REQUEST, page).into_response());
        }
    };
    PointService::append(store, &user, route.id, x, y).await?;
    let points = store.list_points(route.id).await?;
    Ok(after_mutation(ajax, route.id, &points))
}

/// POST /trasa/:route_id/add-point-click, AJAX only.
pub async fn add_point_click(
    SessionUser(user): SessionUser,
    AjaxRequest(ajax): AjaxRequest,
    State(state): State<AppState>,
    Path(route_id): Path<RouteId>,
    Form(form): Form<PointForm>,
) -> Result<Response, AppError> {
    if !ajax {
        return Ok(failure(StatusCode::BAD_REQUEST).into_response());
    }
    let store = state.store.routes();
    let route = RouteService::get(store, &user, route_id).await?;
    let (x, y) = parse_point(&form)?;
    let point = PointService::append(store, &user, route.id, x, y).await?;
    Ok(point_created(point.id).into_response())
}

/// GET /punkt/delete/:point_id
pub async fn delete_point(
    SessionUser(user): SessionUser,
    AjaxRequest(ajax): AjaxRequest,
    State(state): State<AppState>,
    Path(point_id): Path<PointId>,
) -> Result<Response, AppError> {
    let (route_id, remaining) = PointService::delete(state.store.routes(), &user, point_id).await?;
    Ok(after_mutation(ajax, route_id, &remaining))
}

/// GET|POST /punkt/move/:point_id/:direction
pub async fn move_point(
    SessionUser(user): SessionUser,
    AjaxRequest(ajax): AjaxRequest,
    State(state): State<AppState>,
    Path((point_id, direction)): Path<(PointId, String)>,
) -> Result<Response, AppError> {
    let (route_id, points) =
        PointService::swap(state.store.routes(), &user, point_id, Direction::parse(&direction)).await?;
    Ok(after_mutation(ajax, route_id, &points))
}

/// GET /trasa/:route_id/punkty
pub async fn list_points(
    SessionUser(user): SessionUser,
    State(state): State<AppState>,
    Path(route_id): Path<RouteId>,
) -> Result<Response, AppError> {
    let points = PointService::list(state.store.routes(), &user, route_id).await?;
    Ok(points_envelope(&points).into_response())
}

/// GET /tla
pub async fn background_list(
    SessionUser(user): SessionUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let backgrounds = state.store.list_backgrounds().await?;
    Ok(render(
        &state.templates,
        "tlo_list.html",
        context! { user => user_ctx(&user), tla => backgrounds },
    )?
    .into_response())
}

/// GET /moje-trasy
pub async fn user_routes(SessionUser(user): SessionUser, State(state): State<AppState>) -> Result<Response, AppError> {
    let routes = RouteService::list(state.store.routes(), &user).await?;
    Ok(render(
        &state.templates,
        "user_trasy.html",
        context! { user => user_ctx(&user), trasy => routes },
    )?
    .into_response())
}

async fn background_or_404(state: &AppState, id: BackgroundId) -> Result<crate::model::BackgroundImage, AppError> {
    state
        .store
        .background(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("obraz tła {}", id)))
}

/// GET /trasa/create/:background_id
pub async fn create_route_page(
    SessionUser(user): SessionUser,
    State(state): State<AppState>,
    Path(background_id): Path<BackgroundId>,
) -> Result<Response, AppError> {
    let background = background_or_404(&state, background_id).await?;
    Ok(render(
        &state.templates,
        "trasa_create.html",
        context! { user => user_ctx(&user), tlo => background },
    )?
    .into_response())
}

/// POST /trasa/create/:background_id
pub async fn create_route_submit(
    SessionUser(user): SessionUser,
    State(state): State<AppState>,
    Path(background_id): Path<BackgroundId>,
    Form(form): Form<RouteForm>,
) -> Result<Response, AppError> {
    let background = background_or_404(&state, background_id).await?;
    let name = match validation::name("nazwa", form.nazwa.as_deref(), NAME_MAX_LENGTH) {
        Ok(name) => name,
        Err(err) => {
            let errors = field_errors(err)?;
            let page = render(
                &state.templates,
                "trasa_create.html",
                context! {
                    user => user_ctx(&user),
                    tlo => background,
                    errors => errors,
                    nazwa => form.nazwa,
                    opis => form.opis,
                },
            )?;
            return Ok((StatusCode::BAD_REQUEST, page).into_response());
        }
    };
    let route = RouteService::create(
        state.store.routes(),
        &user,
        NewRoute {
            name,
            description: form.opis.unwrap_or_default().trim().to_string(),
            background_id: background.id,
        },
    )
    .await?;
    Ok(Redirect::to(&edit_url(route.id)).into_response())
}
