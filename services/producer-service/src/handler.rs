use actix_web::{web, HttpResponse};
use shared::dto::{CreateMessageRequest, CreateMessageResponse, ErrorResponse, HealthResponse};
use shared::error::Result;
use tracing::error;

use crate::service::MessagePublisher;

fn parse_request(body: &[u8]) -> Result<CreateMessageRequest> {
    let request: CreateMessageRequest = serde_json::from_slice(body)?;
    request.validate()?;
    Ok(request)
}

/// Send a message to the notifications topic.
#[utoipa::path(
    post,
    path = "/messages",
    tag = "Producer",
    request_body = CreateMessageRequest,
    responses(
        (status = 201, description = "Message accepted", body = CreateMessageResponse),
        (status = 400, description = "Malformed message", body = ErrorResponse),
        (status = 500, description = "Broker rejected the message", body = ErrorResponse)
    )
)]
pub async fn send_message(
    publisher: web::Data<dyn MessagePublisher>,
    body: web::Bytes,
) -> HttpResponse {
    let request = match parse_request(&body) {
        Ok(r) => r,
        Err(e) => {
            error!(%e, "invalid request body");
            return HttpResponse::BadRequest().json(ErrorResponse::new("Invalid message format"));
        }
    };

    match publisher.send_message(&request).await {
        Ok(response) => HttpResponse::Created().json(response),
        Err(e) => {
            error!(%e, "failed to send message");
            HttpResponse::InternalServerError().json(ErrorResponse::new("Failed to send message"))
        }
    }
}

/// Health check.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse::ok())
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/messages", web::post().to(send_message))
        .route("/health", web::get().to(health));
}
