//! Server-rendered pages.
//!
//! Templates are minijinja files kept next to this module and compiled into
//! the binary. `.html` names turn on HTML auto-escaping.

use crate::error::{AppError, ConfigError};
use axum::response::Html;
use minijinja::Environment;
use serde::Serialize;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("templates/base.html")),
    ("errors.html", include_str!("templates/errors.html")),
    ("home.html", include_str!("templates/home.html")),
    ("login.html", include_str!("templates/login.html")),
    ("register.html", include_str!("templates/register.html")),
    ("tlo_list.html", include_str!("templates/tlo_list.html")),
    ("trasa_create.html", include_str!("templates/trasa_create.html")),
    ("trasa_edit.html", include_str!("templates/trasa_edit.html")),
    ("user_trasy.html", include_str!("templates/user_trasy.html")),
];

pub fn environment() -> Result<Environment<'static>, ConfigError> {
    let mut env = Environment::new();
    for (name, source) in TEMPLATES {
        env.add_template(name, source)
            .map_err(|e| ConfigError::Template(format!("{}: {}", name, e)))?;
    }
    Ok(env)
}

pub fn render<S: Serialize>(env: &Environment<'static>, name: &str, ctx: S) -> Result<Html<String>, AppError> {
    let template = env
        .get_template(name)
        .map_err(|e| AppError::Internal(format!("template {}: {}", name, e)))?;
    template
        .render(ctx)
        .map(Html)
        .map_err(|e| AppError::Internal(format!("render {}: {}", name, e)))
}
