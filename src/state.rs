//! Shared application state for all routes.

use crate::error::AppError;
use crate::store::Store;
use crate::templates;
use minijinja::Environment;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Page templates, compiled once at startup.
    pub templates: Arc<Environment<'static>>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Result<Self, AppError> {
        Ok(AppState {
            store,
            templates: Arc::new(templates::environment()?),
        })
    }
}
