//! Ownership guard: resolves a route or point only when the actor owns it.
//!
//! A missing entity and someone else's entity are indistinguishable to the
//! caller; both come back as [`AppError::NotFound`], never as 403.

use crate::error::AppError;
use crate::model::{PointId, Route, RouteId, RoutePoint, UserId};
use crate::store::RouteStore;

pub async fn owned_route(store: &dyn RouteStore, actor: UserId, route_id: RouteId) -> Result<Route, AppError> {
    store
        .owned_route(route_id, actor)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("trasa {}", route_id)))
}

/// A point is owned through its route's owner.
pub async fn owned_point(store: &dyn RouteStore, actor: UserId, point_id: PointId) -> Result<RoutePoint, AppError> {
    store
        .owned_point(point_id, actor)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("punkt {}", point_id)))
}

/// Owned point that must also sit on `route_id` (nested REST paths).
pub async fn owned_point_of_route(
    store: &dyn RouteStore,
    actor: UserId,
    route_id: RouteId,
    point_id: PointId,
) -> Result<RoutePoint, AppError> {
    store
        .owned_point(point_id, actor)
        .await?
        .filter(|p| p.route_id == route_id)
        .ok_or_else(|| AppError::NotFound(format!("punkt {}", point_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewBackground, NewRoute, NewUser};
    use crate::store::{AccountStore, MemoryStore};

    struct Fixture {
        store: MemoryStore,
        owner: UserId,
        stranger: UserId,
        route: Route,
        point: RoutePoint,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let mut ids = Vec::new();
        for name in ["owner", "stranger"] {
            let user = store
                .create_user(NewUser {
                    username: name.into(),
                    email: String::new(),
                    password_hash: "x".into(),
                })
                .await
                .unwrap();
            ids.push(user.id);
        }
        let background = store
            .create_background(NewBackground {
                name: "Tło".into(),
                description: String::new(),
                image: "tla/a.png".into(),
                width: 10,
                height: 10,
            })
            .await
            .unwrap();
        let route = store
            .create_route(
                ids[0],
                NewRoute {
                    name: "A".into(),
                    description: String::new(),
                    background_id: background.id,
                },
            )
            .await
            .unwrap();
        let point = store.append_point(route.id, 1, 2).await.unwrap();
        Fixture {
            store,
            owner: ids[0],
            stranger: ids[1],
            route,
            point,
        }
    }

    #[tokio::test]
    async fn owner_resolves_route_and_point() {
        let f = fixture().await;
        assert_eq!(owned_route(&f.store, f.owner, f.route.id).await.unwrap().id, f.route.id);
        assert_eq!(owned_point(&f.store, f.owner, f.point.id).await.unwrap(), f.point);
        assert!(owned_point_of_route(&f.store, f.owner, f.route.id, f.point.id).await.is_ok());
    }

    #[tokio::test]
    async fn stranger_and_missing_ids_look_the_same() {
        let f = fixture().await;
        let foreign = owned_route(&f.store, f.stranger, f.route.id).await.unwrap_err();
        let missing = owned_route(&f.store, f.stranger, 9_999).await.unwrap_err();
        assert!(matches!(foreign, AppError::NotFound(_)));
        assert!(matches!(missing, AppError::NotFound(_)));
        assert!(matches!(
            owned_point(&f.store, f.stranger, f.point.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn point_under_wrong_route_is_not_found() {
        let f = fixture().await;
        let err = owned_point_of_route(&f.store, f.owner, f.route.id + 500, f.point.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
