//! OpenAPI document and Swagger UI mounted under `/api`.

use actix_web::web;
use shared::dto::{CreateMessageRequest, CreateMessageResponse, ErrorResponse, HealthResponse};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handler;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Producer Service API",
        version = "1.0",
        description = "Publishes messages to the notifications topic"
    ),
    paths(handler::send_message, handler::health),
    components(schemas(CreateMessageRequest, CreateMessageResponse, ErrorResponse, HealthResponse)),
    tags(
        (name = "Producer", description = "Message publishing"),
        (name = "Health", description = "Liveness")
    )
)]
pub struct ApiDoc;

pub const OPENAPI_URL: &str = "/api-docs/openapi.json";

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::redirect("/api", "/api/").permanent())
        .service(SwaggerUi::new("/api/{_:.*}").url(OPENAPI_URL, ApiDoc::openapi()));
}
