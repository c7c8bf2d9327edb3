//! Home page, login, logout and registration for the form surface.

use super::forms::{field_errors, user_ctx};
use crate::error::AppError;
use crate::extractors::auth::{safe_next, session_cookie, session_removal, LOGIN_PATH};
use crate::extractors::MaybeSession;
use crate::service::validation;
use crate::service::AccountService;
use crate::state::AppState;
use crate::templates::render;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use minijinja::context;
use serde::Deserialize;
use std::collections::BTreeMap;

const AFTER_LOGIN: &str = "/moje-trasy/";

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password1: Option<String>,
    pub password2: Option<String>,
}

pub async fn home(session: MaybeSession, State(state): State<AppState>) -> Result<Response, AppError> {
    let user = session.user.as_ref().map(user_ctx);
    Ok(render(&state.templates, "home.html", context! { user => user })?.into_response())
}

pub async fn login_page(
    session: MaybeSession,
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
) -> Result<Response, AppError> {
    if session.user.is_some() {
        return Ok(Redirect::to(safe_next(query.next.as_deref()).unwrap_or(AFTER_LOGIN)).into_response());
    }
    Ok(render(&state.templates, "login.html", context! { next => query.next })?.into_response())
}

pub async fn login_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let username = form.username.as_deref().unwrap_or("").trim();
    let password = form.password.as_deref().unwrap_or("");
    let store = state.store.accounts();
    match AccountService::authenticate(store, username, password).await? {
        Some(user) => {
            let key = AccountService::login(store, &user).await?;
            let target = safe_next(form.next.as_deref()).unwrap_or(AFTER_LOGIN);
            Ok((jar.add(session_cookie(key)), Redirect::to(target)).into_response())
        }
        None => {
            let errors = BTreeMap::from([(
                "__all__",
                vec!["Please enter a correct username and password."],
            )]);
            Ok(render(
                &state.templates,
                "login.html",
                context! { errors => errors, username => username, next => form.next },
            )?
            .into_response())
        }
    }
}

pub async fn logout(
    session: MaybeSession,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if let Some(key) = session.key.as_deref() {
        AccountService::logout(state.store.accounts(), key).await?;
    }
    Ok((jar.remove(session_removal()), Redirect::to("/")).into_response())
}

pub async fn register_page(State(state): State<AppState>) -> Result<Response, AppError> {
    Ok(render(&state.templates, "register.html", context! {})?.into_response())
}

pub async fn register_submit(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let outcome = async {
        let username = validation::username(form.username.as_deref())?;
        let email = validation::email(form.email.as_deref())?;
        let password = validation::new_password(form.password1.as_deref(), form.password2.as_deref())?;
        AccountService::register(state.store.accounts(), username, email, password).await
    }
    .await;
    match outcome {
        Ok(_) => Ok(Redirect::to(LOGIN_PATH).into_response()),
        Err(err) => {
            let errors = field_errors(err)?;
            let page = render(
                &state.templates,
                "register.html",
                context! { errors => errors, username => form.username, email => form.email },
            )?;
            Ok((StatusCode::BAD_REQUEST, page).into_response())
        }
    }
}
