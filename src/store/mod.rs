//! Persistence boundary.
//!
//! Two backends implement the same traits: [`PgStore`] for PostgreSQL and
//! [`MemoryStore`] for tests and local runs. Every point mutation reads the
//! route's current points, asks [`crate::ordering`] for a plan and applies it
//! inside one transaction scoped to the route, so concurrent mutations of the
//! same route cannot interleave.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, PgStore};

use crate::error::AppError;
use crate::model::{
    BackgroundId, BackgroundImage, Direction, NewBackground, NewRoute, NewUser, PointChanges, PointId, Route,
    RouteChanges, RouteId, RoutePoint, User, UserId,
};
use crate::ordering::OrderChange;
use async_trait::async_trait;

/// Users, API tokens and browser sessions.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fails with a `username` validation error when the name is taken.
    async fn create_user(&self, new: NewUser) -> Result<User, AppError>;
    async fn user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    /// The user's API token, created on first use.
    async fn token_for_user(&self, user_id: UserId) -> Result<String, AppError>;
    async fn user_by_token(&self, key: &str) -> Result<Option<User>, AppError>;
    async fn create_session(&self, user_id: UserId) -> Result<String, AppError>;
    async fn user_by_session(&self, key: &str) -> Result<Option<User>, AppError>;
    async fn delete_session(&self, key: &str) -> Result<(), AppError>;
}

/// Backgrounds, routes and route points.
#[async_trait]
pub trait RouteStore: Send + Sync {
    async fn create_background(&self, new: NewBackground) -> Result<BackgroundImage, AppError>;
    async fn list_backgrounds(&self) -> Result<Vec<BackgroundImage>, AppError>;
    async fn background(&self, id: BackgroundId) -> Result<Option<BackgroundImage>, AppError>;
    /// Removes the image together with every route drawn over it.
    async fn delete_background(&self, id: BackgroundId) -> Result<(), AppError>;

    /// Fails with an `obraz_tla` validation error when the background is unknown.
    async fn create_route(&self, owner: UserId, new: NewRoute) -> Result<Route, AppError>;
    async fn routes_of(&self, owner: UserId) -> Result<Vec<Route>, AppError>;
    /// The route, only when `owner` owns it.
    async fn owned_route(&self, route_id: RouteId, owner: UserId) -> Result<Option<Route>, AppError>;
    /// Applies the changes and refreshes the modification timestamp.
    async fn update_route(&self, route_id: RouteId, changes: RouteChanges) -> Result<Route, AppError>;
    async fn delete_route(&self, route_id: RouteId) -> Result<(), AppError>;

    /// Points of a route, ascending by order.
    async fn list_points(&self, route_id: RouteId) -> Result<Vec<RoutePoint>, AppError>;
    /// The point, only when its route is owned by `owner`.
    async fn owned_point(&self, point_id: PointId, owner: UserId) -> Result<Option<RoutePoint>, AppError>;
    async fn update_point_coords(&self, point_id: PointId, changes: PointChanges) -> Result<RoutePoint, AppError>;
    /// Applies a computed order plan to one route atomically. A plan naming
    /// foreign points or leaving a gap is rejected and nothing changes.
    async fn apply_order_changes(&self, route_id: RouteId, changes: &[OrderChange]) -> Result<(), AppError>;
    /// Inserts a point ranked after every existing one.
    async fn append_point(&self, route_id: RouteId, x: i32, y: i32) -> Result<RoutePoint, AppError>;
    /// Removes the point and compacts the rest. Returns the remaining points.
    async fn delete_point(&self, point: &RoutePoint) -> Result<Vec<RoutePoint>, AppError>;
    /// Swaps the point with its neighbour, if any. Returns the route's points.
    async fn swap_point(&self, point: &RoutePoint, direction: Direction) -> Result<Vec<RoutePoint>, AppError>;

    /// Reachability check behind `/ready`.
    async fn ping(&self) -> Result<(), AppError>;
}

/// Both halves behind one handle, as kept in `AppState`.
pub trait Store: AccountStore + RouteStore {
    fn accounts(&self) -> &dyn AccountStore;
    fn routes(&self) -> &dyn RouteStore;
}

impl<T: AccountStore + RouteStore> Store for T {
    fn accounts(&self) -> &dyn AccountStore {
        self
    }

    fn routes(&self) -> &dyn RouteStore {
        self
    }
}
