//! OpenAPI document for the REST surface, served at `/api/schema/`.

use crate::model::{BackgroundImage, PointSummary, Route, RouteDetail, RoutePoint};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

struct TokenAuth;

impl Modify for TokenAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);
        components.add_security_scheme(
            "Token",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "Authorization",
                "`Token <key>` as issued by POST /api/token-auth/.",
            ))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&TokenAuth),
    info(
        title = "trasy API",
        description = "Routes drawn over background images, as ordered lists of points."
    ),
    security(("Token" = [])),
    components(schemas(BackgroundImage, Route, RouteDetail, RoutePoint, PointSummary))
)]
pub struct ApiDoc;
