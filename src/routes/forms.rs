//! Browser surface: session-cookie pages and their AJAX actions.

use super::slashed;
use crate::handlers::accounts::{home, login_page, login_submit, logout, register_page, register_submit};
use crate::handlers::forms::{
    add_point_click, background_list, create_route_page, create_route_submit, delete_point, edit_page, edit_submit,
    list_points, move_point, user_routes,
};
use crate::state::AppState;
use axum::routing::get;
use axum::Router;

pub fn form_routes() -> Router<AppState> {
    let router = Router::new().route("/", get(home));
    let router = slashed(router, "/register/", get(register_page).post(register_submit));
    let router = slashed(router, "/login/", get(login_page).post(login_submit));
    let router = slashed(router, "/logout/", get(logout).post(logout));
    let router = slashed(router, "/tla/", get(background_list));
    let router = slashed(router, "/moje-trasy/", get(user_routes));
    let router = slashed(
        router,
        "/trasa/create/:background_id/",
        get(create_route_page).post(create_route_submit),
    );
    let router = slashed(router, "/trasa/edit/:route_id/", get(edit_page).post(edit_submit));
    let router = slashed(router, "/trasa/:route_id/add-point-click/", axum::routing::post(add_point_click));
    let router = slashed(router, "/trasa/:route_id/punkty/", get(list_points));
    let router = slashed(router, "/punkt/delete/:point_id/", get(delete_point));
    slashed(router, "/punkt/move/:point_id/:direction/", get(move_point).post(move_point))
}
