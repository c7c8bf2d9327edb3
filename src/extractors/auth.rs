//! Caller identity.
//!
//! The REST surface authenticates with `Authorization: Token <key>` (or
//! `Bearer <key>`) and answers 401 without it. The form surface reads the
//! `sessionid` cookie and sends anonymous visitors to the login page with a
//! `next` parameter.

use crate::error::AppError;
use crate::model::User;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use url::form_urlencoded;

pub const SESSION_COOKIE: &str = "sessionid";
pub const LOGIN_PATH: &str = "/login/";

/// Token-authenticated API caller.
#[derive(Clone, Debug)]
pub struct ApiUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for ApiUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(token_from_header)
            .ok_or(AppError::Unauthenticated)?;
        let user = state.store.user_by_token(key).await?.ok_or_else(|| {
            tracing::warn!("api request with unknown token");
            AppError::Unauthenticated
        })?;
        Ok(ApiUser(user))
    }
}

/// Logged-in browser user; anonymous visitors are redirected to login.
#[derive(Clone, Debug)]
pub struct SessionUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = MaybeSession::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        match session.user {
            Some(user) => Ok(SessionUser(user)),
            None => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or_else(|| parts.uri.path());
                Err(Redirect::to(&login_url(next)).into_response())
            }
        }
    }
}

/// Session lookup that never rejects anonymous visitors.
#[derive(Clone, Debug, Default)]
pub struct MaybeSession {
    pub key: Option<String>,
    pub user: Option<User>,
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(key) = session_key(&CookieJar::from_headers(&parts.headers)) else {
            return Ok(MaybeSession::default());
        };
        let user = state.store.user_by_session(&key).await?;
        Ok(MaybeSession { key: Some(key), user })
    }
}

/// Key from `Token <key>` or `Bearer <key>`.
fn token_from_header(value: &str) -> Option<&str> {
    let (scheme, key) = value.trim().split_once(' ')?;
    let key = key.trim();
    let known = scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer");
    (known && !key.is_empty()).then_some(key)
}

fn session_key(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|c| c.value_trimmed().to_string())
        .filter(|v| !v.is_empty())
}

pub fn session_cookie(key: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, key))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Matches [`session_cookie`] by name and path so the jar can expire it.
pub fn session_removal() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// `/login/?next=<path>`, form-urlencoded.
pub fn login_url(next: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("next", next)
        .finish();
    format!("{}?{}", LOGIN_PATH, query)
}

/// Only local absolute paths are followed after login.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
}
