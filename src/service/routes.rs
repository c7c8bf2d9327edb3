//! Owner-scoped route CRUD.

use crate::error::AppError;
use crate::guard;
use crate::model::{BackgroundImage, NewRoute, Route, RouteChanges, RouteDetail, RouteId, User};
use crate::store::RouteStore;

pub struct RouteService;

impl RouteService {
    pub async fn list(store: &dyn RouteStore, actor: &User) -> Result<Vec<Route>, AppError> {
        store.routes_of(actor.id).await
    }

    pub async fn list_detailed(store: &dyn RouteStore, actor: &User) -> Result<Vec<RouteDetail>, AppError> {
        let mut out = Vec::new();
        for route in store.routes_of(actor.id).await? {
            out.push(Self::detail_of(store, route).await?);
        }
        Ok(out)
    }

    pub async fn create(store: &dyn RouteStore, actor: &User, new: NewRoute) -> Result<Route, AppError> {
        let route = store.create_route(actor.id, new).await?;
        tracing::info!(user = actor.id, route = route.id, "route created");
        Ok(route)
    }

    pub async fn get(store: &dyn RouteStore, actor: &User, route_id: RouteId) -> Result<Route, AppError> {
        guard::owned_route(store, actor.id, route_id).await
    }

    pub async fn detail(store: &dyn RouteStore, actor: &User, route_id: RouteId) -> Result<RouteDetail, AppError> {
        let route = guard::owned_route(store, actor.id, route_id).await?;
        Self::detail_of(store, route).await
    }

    pub async fn update(
        store: &dyn RouteStore,
        actor: &User,
        route_id: RouteId,
        changes: RouteChanges,
    ) -> Result<RouteDetail, AppError> {
        let route = guard::owned_route(store, actor.id, route_id).await?;
        let route = store.update_route(route.id, changes).await?;
        tracing::info!(user = actor.id, route = route.id, "route updated");
        Self::detail_of(store, route).await
    }

    pub async fn delete(store: &dyn RouteStore, actor: &User, route_id: RouteId) -> Result<(), AppError> {
        let route = guard::owned_route(store, actor.id, route_id).await?;
        store.delete_route(route.id).await?;
        tracing::info!(user = actor.id, route = route.id, "route deleted");
        Ok(())
    }

    pub async fn background(store: &dyn RouteStore, route: &Route) -> Result<BackgroundImage, AppError> {
        store
            .background(route.background_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("obraz tła {}", route.background_id)))
    }

    async fn detail_of(store: &dyn RouteStore, route: Route) -> Result<RouteDetail, AppError> {
        let background = Self::background(store, &route).await?;
        let points = store.list_points(route.id).await?;
        Ok(RouteDetail {
            route,
            background,
            points,
        })
    }
}
