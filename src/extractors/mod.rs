//! Request extractors: caller identity and the AJAX flag.

pub mod ajax;
pub mod auth;

pub use ajax::AjaxRequest;
pub use auth::{ApiUser, MaybeSession, SessionUser, SESSION_COOKIE};
