//! In-process store. One mutex guards all tables; holding it for a whole
//! mutation gives the same per-route atomicity as a database transaction.

use super::{AccountStore, RouteStore};
use crate::auth::generate_key;
use crate::error::AppError;
use crate::model::{
    BackgroundId, BackgroundImage, Direction, NewBackground, NewRoute, NewUser, PointChanges, PointId, Route,
    RouteChanges, RouteId, RoutePoint, User, UserId,
};
use crate::ordering::{self, OrderChange};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Tables {
    last_id: i64,
    users: BTreeMap<UserId, User>,
    tokens: HashMap<String, UserId>,
    sessions: HashMap<String, UserId>,
    backgrounds: BTreeMap<BackgroundId, BackgroundImage>,
    routes: BTreeMap<RouteId, Route>,
    points: BTreeMap<PointId, RoutePoint>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn points_of(&self, route_id: RouteId) -> Vec<RoutePoint> {
        let mut points: Vec<RoutePoint> = self.points.values().filter(|p| p.route_id == route_id).cloned().collect();
        points.sort_by_key(|p| p.order);
        points
    }

    fn apply(&mut self, route_id: RouteId, changes: &[OrderChange]) {
        for change in changes {
            if let Some(p) = self.points.get_mut(&change.point_id) {
                if p.route_id == route_id {
                    p.order = change.order;
                }
            }
        }
    }

    fn remove_route(&mut self, route_id: RouteId) {
        self.routes.remove(&route_id);
        self.points.retain(|_, p| p.route_id != route_id);
    }

    fn user_by_key(&self, map: &HashMap<String, UserId>, key: &str) -> Option<User> {
        map.get(key).and_then(|id| self.users.get(id)).cloned()
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|_| AppError::Internal("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create_user(&self, new: NewUser) -> Result<User, AppError> {
        let mut t = self.lock()?;
        if t.users.values().any(|u| u.username == new.username) {
            return Err(AppError::validation("username", "A user with that username already exists."));
        }
        let user = User {
            id: t.next_id(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            date_joined: Utc::now(),
        };
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let t = self.lock()?;
        Ok(t.users.values().find(|u| u.username == username).cloned())
    }

    async fn token_for_user(&self, user_id: UserId) -> Result<String, AppError> {
        let mut t = self.lock()?;
        if let Some((key, _)) = t.tokens.iter().find(|(_, owner)| **owner == user_id) {
            return Ok(key.clone());
        }
        let key = generate_key();
        t.tokens.insert(key.clone(), user_id);
        Ok(key)
    }

    async fn user_by_token(&self, key: &str) -> Result<Option<User>, AppError> {
        let t = self.lock()?;
        Ok(t.user_by_key(&t.tokens, key))
    }

    async fn create_session(&self, user_id: UserId) -> Result<String, AppError> {
        let key = generate_key();
        self.lock()?.sessions.insert(key.clone(), user_id);
        Ok(key)
    }

    async fn user_by_session(&self, key: &str) -> Result<Option<User>, AppError> {
        let t = self.lock()?;
        Ok(t.user_by_key(&t.sessions, key))
    }

    async fn delete_session(&self, key: &str) -> Result<(), AppError> {
        self.lock()?.sessions.remove(key);
        Ok(())
    }
}

#[async_trait]
impl RouteStore for MemoryStore {
    async fn create_background(&self, new: NewBackground) -> Result<BackgroundImage, AppError> {
        let mut t = self.lock()?;
        let background = BackgroundImage {
            id: t.next_id(),
            name: new.name,
            description: new.description,
            image: new.image,
            width: new.width,
            height: new.height,
            created_at: Utc::now(),
        };
        t.backgrounds.insert(background.id, background.clone());
        Ok(background)
    }

    async fn list_backgrounds(&self) -> Result<Vec<BackgroundImage>, AppError> {
        Ok(self.lock()?.backgrounds.values().cloned().collect())
    }

    async fn background(&self, id: BackgroundId) -> Result<Option<BackgroundImage>, AppError> {
        Ok(self.lock()?.backgrounds.get(&id).cloned())
    }

    async fn delete_background(&self, id: BackgroundId) -> Result<(), AppError> {
        let mut t = self.lock()?;
        t.backgrounds.remove(&id);
        let dependent: Vec<RouteId> = t.routes.values().filter(|r| r.background_id == id).map(|r| r.id).collect();
        for route_id in dependent {
            t.remove_route(route_id);
        }
        Ok(())
    }

    async fn create_route(&self, owner: UserId, new: NewRoute) -> Result<Route, AppError> {
        let mut t = self.lock()?;
        if !t.backgrounds.contains_key(&new.background_id) {
            return Err(AppError::validation("obraz_tla", "Unknown background image."));
        }
        let now = Utc::now();
        let route = Route {
            id: t.next_id(),
            name: new.name,
            description: new.description,
            owner,
            background_id: new.background_id,
            created_at: now,
            updated_at: now,
        };
        t.routes.insert(route.id, route.clone());
        Ok(route)
    }

    async fn routes_of(&self, owner: UserId) -> Result<Vec<Route>, AppError> {
        Ok(self.lock()?.routes.values().filter(|r| r.owner == owner).cloned().collect())
    }

    async fn owned_route(&self, route_id: RouteId, owner: UserId) -> Result<Option<Route>, AppError> {
        let t = self.lock()?;
        Ok(t.routes.get(&route_id).filter(|r| r.owner == owner).cloned())
    }

    async fn update_route(&self, route_id: RouteId, changes: RouteChanges) -> Result<Route, AppError> {
        let mut t = self.lock()?;
        if let Some(background_id) = changes.background_id {
            if !t.backgrounds.contains_key(&background_id) {
                return Err(AppError::validation("obraz_tla", "Unknown background image."));
            }
        }
        let route = t
            .routes
            .get_mut(&route_id)
            .ok_or_else(|| AppError::NotFound(format!("trasa {}", route_id)))?;
        if let Some(name) = changes.name {
            route.name = name;
        }
        if let Some(description) = changes.description {
            route.description = description;
        }
        if let Some(background_id) = changes.background_id {
            route.background_id = background_id;
        }
        route.updated_at = Utc::now();
        Ok(route.clone())
    }

    async fn delete_route(&self, route_id: RouteId) -> Result<(), AppError> {
        self.lock()?.remove_route(route_id);
        Ok(())
    }

    async fn list_points(&self, route_id: RouteId) -> Result<Vec<RoutePoint>, AppError> {
        Ok(self.lock()?.points_of(route_id))
    }

    async fn owned_point(&self, point_id: PointId, owner: UserId) -> Result<Option<RoutePoint>, AppError> {
        let t = self.lock()?;
        Ok(t.points
            .get(&point_id)
            .filter(|p| t.routes.get(&p.route_id).is_some_and(|r| r.owner == owner))
            .cloned())
    }

    async fn update_point_coords(&self, point_id: PointId, changes: PointChanges) -> Result<RoutePoint, AppError> {
        let mut t = self.lock()?;
        let point = t
            .points
            .get_mut(&point_id)
            .ok_or_else(|| AppError::NotFound(format!("punkt {}", point_id)))?;
        if let Some(x) = changes.x {
            point.x = x;
        }
        if let Some(y) = changes.y {
            point.y = y;
        }
        Ok(point.clone())
    }

    async fn apply_order_changes(&self, route_id: RouteId, changes: &[OrderChange]) -> Result<(), AppError> {
        let mut t = self.lock()?;
        if !t.routes.contains_key(&route_id) {
            return Err(AppError::NotFound(format!("trasa {}", route_id)));
        }
        if !ordering::plan_keeps_dense(&t.points_of(route_id), changes) {
            tracing::warn!(route = route_id, changes = ?changes, "rejected order plan");
            return Err(AppError::BadRequest(format!("order plan for trasa {} breaks 1..N", route_id)));
        }
        t.apply(route_id, changes);
        Ok(())
    }

    async fn append_point(&self, route_id: RouteId, x: i32, y: i32) -> Result<RoutePoint, AppError> {
        let mut t = self.lock()?;
        if !t.routes.contains_key(&route_id) {
            return Err(AppError::NotFound(format!("trasa {}", route_id)));
        }
        let new = ordering::append(route_id, &t.points_of(route_id), x, y);
        let point = RoutePoint {
            id: t.next_id(),
            route_id: new.route_id,
            x: new.x,
            y: new.y,
            order: new.order,
        };
        t.points.insert(point.id, point.clone());
        Ok(point)
    }

    async fn delete_point(&self, point: &RoutePoint) -> Result<Vec<RoutePoint>, AppError> {
        let mut t = self.lock()?;
        let current = t.points_of(point.route_id);
        if !current.iter().any(|p| p.id == point.id) {
            return Err(AppError::NotFound(format!("punkt {}", point.id)));
        }
        let plan = ordering::delete(&current, point.id);
        t.points.remove(&point.id);
        t.apply(point.route_id, &plan);
        Ok(t.points_of(point.route_id))
    }

    async fn swap_point(&self, point: &RoutePoint, direction: Direction) -> Result<Vec<RoutePoint>, AppError> {
        let mut t = self.lock()?;
        let current = t.points_of(point.route_id);
        let plan = ordering::swap_adjacent(&current, point.id, direction);
        t.apply(point.route_id, &plan);
        Ok(t.points_of(point.route_id))
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.lock().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn seeded() -> (MemoryStore, User, Route) {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                username: "anna".into(),
                email: "anna@example.com".into(),
                password_hash: "x".into(),
            })
            .await
            .unwrap();
        let background = store
            .create_background(NewBackground {
                name: "Plan".into(),
                description: String::new(),
                image: "tla/plan.png".into(),
                width: 800,
                height: 600,
            })
            .await
            .unwrap();
        let route = store
            .create_route(
                user.id,
                NewRoute {
                    name: "Poranna".into(),
                    description: String::new(),
                    background_id: background.id,
                },
            )
            .await
            .unwrap();
        (store, user, route)
    }

    fn orders(points: &[RoutePoint]) -> Vec<i32> {
        points.iter().map(|p| p.order).collect()
    }

    #[tokio::test]
    async fn append_delete_swap_keep_route_dense() {
        let (store, _, route) = seeded().await;
        let a = store.append_point(route.id, 1, 1).await.unwrap();
        let b = store.append_point(route.id, 2, 2).await.unwrap();
        let c = store.append_point(route.id, 3, 3).await.unwrap();
        assert_eq!((a.order, b.order, c.order), (1, 2, 3));

        let remaining = store.delete_point(&b).await.unwrap();
        assert_eq!(orders(&remaining), vec![1, 2]);
        assert_eq!(remaining[1].id, c.id);

        let a = store.owned_point(a.id, route.owner).await.unwrap().unwrap();
        let swapped = store.swap_point(&a, Direction::Down).await.unwrap();
        assert_eq!(swapped.iter().map(|p| p.id).collect::<Vec<_>>(), vec![c.id, a.id]);
    }

    #[tokio::test]
    async fn applies_a_plan_in_one_step() {
        let (store, _, route) = seeded().await;
        let a = store.append_point(route.id, 1, 1).await.unwrap();
        let b = store.append_point(route.id, 2, 2).await.unwrap();
        let plan = ordering::swap_adjacent(&store.list_points(route.id).await.unwrap(), b.id, Direction::Up);
        store.apply_order_changes(route.id, &plan).await.unwrap();
        let points = store.list_points(route.id).await.unwrap();
        assert_eq!(points.iter().map(|p| p.id).collect::<Vec<_>>(), vec![b.id, a.id]);
        assert_eq!(orders(&points), vec![1, 2]);
    }

    #[tokio::test]
    async fn plan_with_a_gap_is_rejected_and_changes_nothing() {
        let (store, _, route) = seeded().await;
        let a = store.append_point(route.id, 1, 1).await.unwrap();
        store.append_point(route.id, 2, 2).await.unwrap();
        let gap = [OrderChange { point_id: a.id, order: 5 }];
        assert!(matches!(
            store.apply_order_changes(route.id, &gap).await,
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(orders(&store.list_points(route.id).await.unwrap()), vec![1, 2]);

        let foreign = [OrderChange { point_id: a.id + 1_000, order: 1 }];
        assert!(store.apply_order_changes(route.id, &foreign).await.is_err());
        assert!(matches!(
            store.apply_order_changes(route.id + 1_000, &[]).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_deletes_and_moves_keep_route_dense() {
        let (store, _, route) = seeded().await;
        let store = Arc::new(store);
        let mut points = Vec::new();
        for i in 0..24 {
            points.push(store.append_point(route.id, i, i).await.unwrap());
        }

        let mut tasks = Vec::new();
        for (i, point) in points.into_iter().enumerate() {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                match i % 3 {
                    0 => store.delete_point(&point).await.map(|_| ()),
                    1 => store.swap_point(&point, Direction::Up).await.map(|_| ()),
                    _ => store.swap_point(&point, Direction::Down).await.map(|_| ()),
                }
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let remaining = store.list_points(route.id).await.unwrap();
        assert_eq!(remaining.len(), 16);
        assert!(ordering::is_dense(&remaining), "orders lost density: {:?}", orders(&remaining));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_deletes_of_one_point_succeed_once() {
        let (store, _, route) = seeded().await;
        let store = Arc::new(store);
        store.append_point(route.id, 0, 0).await.unwrap();
        let target = store.append_point(route.id, 1, 1).await.unwrap();
        store.append_point(route.id, 2, 2).await.unwrap();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let (store, target) = (Arc::clone(&store), target.clone());
                tokio::spawn(async move { store.delete_point(&target).await.is_ok() })
            })
            .collect();
        let mut deleted = 0;
        for task in tasks {
            if task.await.unwrap() {
                deleted += 1;
            }
        }
        assert_eq!(deleted, 1);
        assert_eq!(orders(&store.list_points(route.id).await.unwrap()), vec![1, 2]);
    }

    #[tokio::test]
    async fn deleting_a_point_twice_is_not_found() {
        let (store, _, route) = seeded().await;
        let a = store.append_point(route.id, 1, 1).await.unwrap();
        store.delete_point(&a).await.unwrap();
        assert!(matches!(store.delete_point(&a).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn ownership_lookups_hide_foreign_entities() {
        let (store, user, route) = seeded().await;
        let point = store.append_point(route.id, 5, 5).await.unwrap();
        let other = user.id + 1_000;
        assert!(store.owned_route(route.id, other).await.unwrap().is_none());
        assert!(store.owned_point(point.id, other).await.unwrap().is_none());
        assert!(store.owned_point(point.id, user.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn deleting_background_cascades_to_routes_and_points() {
        let (store, user, route) = seeded().await;
        store.append_point(route.id, 5, 5).await.unwrap();
        store.delete_background(route.background_id).await.unwrap();
        assert!(store.routes_of(user.id).await.unwrap().is_empty());
        assert!(store.list_points(route.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_username_is_a_field_error() {
        let (store, _, _) = seeded().await;
        let err = store
            .create_user(NewUser {
                username: "anna".into(),
                email: String::new(),
                password_hash: "y".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "username"));
    }

    #[tokio::test]
    async fn token_is_created_once_per_user() {
        let (store, user, _) = seeded().await;
        let first = store.token_for_user(user.id).await.unwrap();
        assert_eq!(store.token_for_user(user.id).await.unwrap(), first);
        assert_eq!(store.user_by_token(&first).await.unwrap().unwrap().id, user.id);
    }
}
