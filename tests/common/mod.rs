//! Shared harness: the full router over an in-memory store.

#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;
use trasy::model::{BackgroundId, NewBackground, RouteId, User};
use trasy::service::AccountService;
use trasy::store::{AccountStore, RouteStore};
use trasy::{app, AppState, MemoryStore, Settings};

pub struct Harness {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub background: BackgroundId,
}

pub struct Actor {
    pub user: User,
    pub token: String,
    pub session: String,
}

impl Harness {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let background = store
            .create_background(NewBackground {
                name: "Mapa".into(),
                description: String::new(),
                image: "tla/mapa.png".into(),
                width: 640,
                height: 480,
            })
            .await
            .unwrap();
        let env = HashMap::from([("TRASY_STORE".to_string(), "memory".to_string())]);
        let settings = Settings::from_lookup(|key| env.get(key).cloned()).unwrap();
        let state = AppState::new(store.clone()).unwrap();
        Harness {
            router: app(state, &settings),
            store,
            background: background.id,
        }
    }

    pub async fn actor(&self, username: &str) -> Actor {
        let accounts: &dyn AccountStore = &*self.store;
        let user = AccountService::register(accounts, username.into(), format!("{}@example.com", username), "sekret123")
            .await
            .unwrap();
        let token = accounts.token_for_user(user.id).await.unwrap();
        let session = AccountService::login(accounts, &user).await.unwrap();
        Actor { user, token, session }
    }

    /// Route owned by `actor`, with points appended at the given coordinates.
    pub async fn route_with_points(&self, actor: &Actor, coords: &[(i32, i32)]) -> RouteId {
        let routes: &dyn RouteStore = &*self.store;
        let route = routes
            .create_route(
                actor.user.id,
                trasy::model::NewRoute {
                    name: "Trasa".into(),
                    description: String::new(),
                    background_id: self.background,
                },
            )
            .await
            .unwrap();
        for (x, y) in coords {
            routes.append_point(route.id, *x, *y).await.unwrap();
        }
        route.id
    }

    /// `(id, x, y, order)` of the route's points, ascending by order.
    pub async fn points(&self, route_id: RouteId) -> Vec<(i64, i32, i32, i32)> {
        let routes: &dyn RouteStore = &*self.store;
        routes
            .list_points(route_id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| (p.id, p.x, p.y, p.order))
            .collect()
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn api(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Token {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.send(request).await;
        let status = response.status();
        (status, json_body(response).await)
    }

    /// Form-surface request carrying the actor's session cookie.
    pub async fn form(
        &self,
        method: &str,
        uri: &str,
        session: Option<&str>,
        ajax: bool,
        form: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(session) = session {
            builder = builder.header(header::COOKIE, format!("sessionid={}", session));
        }
        if ajax {
            builder = builder.header("X-Requested-With", "XMLHttpRequest");
        }
        let request = match form {
            Some(form) => builder
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}

pub async fn text_body(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap()
}

/// Orders of a `{count, results}` or bare list of points, in listed order.
pub fn orders(points: &Value) -> Vec<i64> {
    let list = points.get("results").or_else(|| points.get("punkty")).unwrap_or(points);
    list.as_array()
        .unwrap()
        .iter()
        .map(|p| p["kolejnosc"].as_i64().unwrap())
        .collect()
}
