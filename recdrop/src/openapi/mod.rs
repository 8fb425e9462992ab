//! OpenAPI document served at `/openapi.json`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api;
use crate::errors::ErrorResponse;

/// Bearer scheme for deployments that configure an upload token.
struct UploadTokenAddon;

impl Modify for UploadTokenAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "Required only when the server runs with `UPLOAD_TOKEN` set:\n\n\
                            ```\nAuthorization: Bearer YOUR_UPLOAD_TOKEN\n```",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "recdrop",
        description = "Upload endpoint for browser audio recordings."
    ),
    paths(
        api::handlers::health::health,
        api::handlers::upload::upload_recording,
    ),
    components(schemas(
        api::models::health::HealthResponse,
        api::models::upload::UploadResponse,
        api::models::upload::StoredFileResponse,
        ErrorResponse,
    )),
    modifiers(&UploadTokenAddon),
    security((), ("BearerAuth" = [])),
    tags(
        (name = "health", description = "Liveness"),
        (name = "upload", description = "Recording uploads"),
    )
)]
pub struct ApiDoc;
