//! Persisted entities and their wire shapes.
//!
//! Field names on the wire keep the original Polish vocabulary (`nazwa`,
//! `kolejnosc`, ...) so existing clients keep working.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

pub type UserId = i64;
pub type BackgroundId = i64;
pub type RouteId = i64;
pub type PointId = i64;

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub date_joined: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Background image a route is drawn over. Immutable once created.
#[derive(Clone, Debug, Serialize, ToSchema, sqlx::FromRow)]
pub struct BackgroundImage {
    pub id: BackgroundId,
    #[serde(rename = "nazwa")]
    #[sqlx(rename = "nazwa")]
    pub name: String,
    #[serde(rename = "opis")]
    #[sqlx(rename = "opis")]
    pub description: String,
    /// Stored image path relative to the media root.
    #[serde(rename = "obraz")]
    #[sqlx(rename = "obraz")]
    pub image: String,
    #[serde(rename = "szerokosc")]
    #[sqlx(rename = "szerokosc")]
    pub width: i32,
    #[serde(rename = "wysokosc")]
    #[sqlx(rename = "wysokosc")]
    pub height: i32,
    #[serde(rename = "data_dodania")]
    #[sqlx(rename = "data_dodania")]
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewBackground {
    pub name: String,
    pub description: String,
    pub image: String,
    pub width: i32,
    pub height: i32,
}

#[derive(Clone, Debug, Serialize, ToSchema, sqlx::FromRow)]
pub struct Route {
    pub id: RouteId,
    #[serde(rename = "nazwa")]
    #[sqlx(rename = "nazwa")]
    pub name: String,
    #[serde(rename = "opis")]
    #[sqlx(rename = "opis")]
    pub description: String,
    #[serde(rename = "uzytkownik")]
    #[sqlx(rename = "uzytkownik_id")]
    pub owner: UserId,
    #[serde(rename = "obraz_tla")]
    #[sqlx(rename = "obraz_tla_id")]
    pub background_id: BackgroundId,
    #[serde(rename = "data_utworzenia")]
    #[sqlx(rename = "data_utworzenia")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "data_modyfikacji")]
    #[sqlx(rename = "data_modyfikacji")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewRoute {
    pub name: String,
    pub description: String,
    pub background_id: BackgroundId,
}

/// Partial route update; `None` leaves the field as is.
#[derive(Clone, Debug, Default)]
pub struct RouteChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub background_id: Option<BackgroundId>,
}

/// One (x, y) point of a route with its 1-based rank among siblings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema, sqlx::FromRow)]
pub struct RoutePoint {
    pub id: PointId,
    #[serde(rename = "trasa")]
    #[sqlx(rename = "trasa_id")]
    pub route_id: RouteId,
    pub x: i32,
    pub y: i32,
    #[serde(rename = "kolejnosc")]
    #[sqlx(rename = "kolejnosc")]
    pub order: i32,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PointChanges {
    pub x: Option<i32>,
    pub y: Option<i32>,
}

/// Neighbour swap direction. `Up` moves a point towards order 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            _ => None,
        }
    }
}

/// Route as served by the REST API: background and points inlined.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct RouteDetail {
    #[serde(flatten)]
    pub route: Route,
    #[serde(rename = "obraz_tla_details")]
    pub background: BackgroundImage,
    #[serde(rename = "punkty")]
    pub points: Vec<RoutePoint>,
}

/// Point shape used by the form surface's AJAX responses.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PointSummary {
    pub id: PointId,
    pub x: i32,
    pub y: i32,
    pub kolejnosc: i32,
}

impl From<&RoutePoint> for PointSummary {
    fn from(p: &RoutePoint) -> Self {
        PointSummary {
            id: p.id,
            x: p.x,
            y: p.y,
            kolejnosc: p.order,
        }
    }
}
