//! Response shapes shared by the handlers.

use crate::model::{PointId, PointSummary, RoutePoint};
use axum::{http::StatusCode, Json};
use serde::Serialize;

/// Paginated list envelope of the REST surface. Every list fits on one page,
/// so `next` and `previous` are always null.
#[derive(Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// `{success, punkty}` returned by the form surface to AJAX callers.
#[derive(Serialize)]
pub struct PointsEnvelope {
    pub success: bool,
    pub punkty: Vec<PointSummary>,
}

#[derive(Serialize)]
pub struct PointCreated {
    pub success: bool,
    pub punkt_id: PointId,
}

#[derive(Serialize)]
pub struct Failure {
    pub success: bool,
}

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(data))
}

pub fn ok<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::OK, Json(data))
}

pub fn page<T: Serialize>(results: Vec<T>) -> (StatusCode, Json<Page<T>>) {
    let count = results.len() as u64;
    (
        StatusCode::OK,
        Json(Page {
            count,
            next: None,
            previous: None,
            results,
        }),
    )
}

pub fn points_envelope(points: &[RoutePoint]) -> Json<PointsEnvelope> {
    Json(PointsEnvelope {
        success: true,
        punkty: points.iter().map(PointSummary::from).collect(),
    })
}

pub fn point_created(id: PointId) -> Json<PointCreated> {
    Json(PointCreated {
        success: true,
        punkt_id: id,
    })
}

pub fn failure(status: StatusCode) -> (StatusCode, Json<Failure>) {
    (status, Json(Failure { success: false }))
}
