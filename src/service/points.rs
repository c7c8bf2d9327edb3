//! Route point operations. Form handlers and REST handlers both go through
//! here, so a given append, delete or swap produces the same state whichever
//! surface received it.

use crate::error::AppError;
use crate::guard;
use crate::model::{Direction, PointChanges, PointId, RouteId, RoutePoint, User};
use crate::store::RouteStore;

pub struct PointService;

impl PointService {
    /// Points of an owned route, ascending by order.
    pub async fn list(store: &dyn RouteStore, actor: &User, route_id: RouteId) -> Result<Vec<RoutePoint>, AppError> {
        let route = guard::owned_route(store, actor.id, route_id).await?;
        store.list_points(route.id).await
    }

    /// Append a point after the current last one.
    pub async fn append(
        store: &dyn RouteStore,
        actor: &User,
        route_id: RouteId,
        x: i32,
        y: i32,
    ) -> Result<RoutePoint, AppError> {
        let route = guard::owned_route(store, actor.id, route_id).await?;
        let point = store.append_point(route.id, x, y).await?;
        tracing::info!(
            user = actor.id,
            route = route.id,
            point = point.id,
            kolejnosc = point.order,
            "point appended"
        );
        Ok(point)
    }

    /// Delete an owned point and compact the rest. Returns the route id and
    /// the remaining points.
    pub async fn delete(
        store: &dyn RouteStore,
        actor: &User,
        point_id: PointId,
    ) -> Result<(RouteId, Vec<RoutePoint>), AppError> {
        let point = guard::owned_point(store, actor.id, point_id).await?;
        Self::delete_resolved(store, actor, point).await
    }

    /// Delete variant for nested paths, where the point must sit on `route_id`.
    pub async fn delete_in_route(
        store: &dyn RouteStore,
        actor: &User,
        route_id: RouteId,
        point_id: PointId,
    ) -> Result<Vec<RoutePoint>, AppError> {
        let point = guard::owned_point_of_route(store, actor.id, route_id, point_id).await?;
        Self::delete_resolved(store, actor, point).await.map(|(_, points)| points)
    }

    async fn delete_resolved(
        store: &dyn RouteStore,
        actor: &User,
        point: RoutePoint,
    ) -> Result<(RouteId, Vec<RoutePoint>), AppError> {
        let remaining = store.delete_point(&point).await?;
        tracing::info!(
            user = actor.id,
            route = point.route_id,
            point = point.id,
            kolejnosc = point.order,
            "point deleted"
        );
        Ok((point.route_id, remaining))
    }

    /// Swap an owned point with its neighbour. `None` (an unrecognised
    /// direction) and boundary moves leave the route unchanged.
    pub async fn swap(
        store: &dyn RouteStore,
        actor: &User,
        point_id: PointId,
        direction: Option<Direction>,
    ) -> Result<(RouteId, Vec<RoutePoint>), AppError> {
        let point = guard::owned_point(store, actor.id, point_id).await?;
        Self::swap_resolved(store, actor, point, direction).await
    }

    pub async fn swap_in_route(
        store: &dyn RouteStore,
        actor: &User,
        route_id: RouteId,
        point_id: PointId,
        direction: Option<Direction>,
    ) -> Result<Vec<RoutePoint>, AppError> {
        let point = guard::owned_point_of_route(store, actor.id, route_id, point_id).await?;
        Self::swap_resolved(store, actor, point, direction)
            .await
            .map(|(_, points)| points)
    }

    async fn swap_resolved(
        store: &dyn RouteStore,
        actor: &User,
        point: RoutePoint,
        direction: Option<Direction>,
    ) -> Result<(RouteId, Vec<RoutePoint>), AppError> {
        let Some(direction) = direction else {
            tracing::debug!(point = point.id, "unknown move direction, nothing to do");
            return Ok((point.route_id, store.list_points(point.route_id).await?));
        };
        let points = store.swap_point(&point, direction).await?;
        tracing::info!(
            user = actor.id,
            route = point.route_id,
            point = point.id,
            direction = ?direction,
            "point moved"
        );
        Ok((point.route_id, points))
    }

    pub async fn get(
        store: &dyn RouteStore,
        actor: &User,
        route_id: RouteId,
        point_id: PointId,
    ) -> Result<RoutePoint, AppError> {
        guard::owned_point_of_route(store, actor.id, route_id, point_id).await
    }

    /// Move a point on the canvas. Its order is never touched here.
    pub async fn update_coords(
        store: &dyn RouteStore,
        actor: &User,
        route_id: RouteId,
        point_id: PointId,
        changes: PointChanges,
    ) -> Result<RoutePoint, AppError> {
        let point = guard::owned_point_of_route(store, actor.id, route_id, point_id).await?;
        store.update_point_coords(point.id, changes).await
    }
}
