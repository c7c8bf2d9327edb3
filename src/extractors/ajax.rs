//! Detect AJAX requests (e.g. `X-Requested-With: XMLHttpRequest`).

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Header set by the page script on background requests.
pub const REQUESTED_WITH_HEADER: &str = "X-Requested-With";

/// `true` when the request carries `X-Requested-With: XMLHttpRequest`.
#[derive(Clone, Copy, Debug)]
pub struct AjaxRequest(pub bool);

#[async_trait]
impl<S> FromRequestParts<S> for AjaxRequest
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let is_ajax = parts
            .headers
            .get(REQUESTED_WITH_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim() == "XMLHttpRequest");
        Ok(AjaxRequest(is_ajax))
    }
}
