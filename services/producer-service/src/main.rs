use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use shared::config::bootstrap;
use shared::kafka::ensure_topics;
use std::sync::Arc;
use tracing::{info, warn};

mod docs;
mod handler;
mod service;

use service::{KafkaService, MessagePublisher};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let (app_config, kafka_config) = bootstrap("producer-service", "")?;

    if let Err(e) = ensure_topics(
        &kafka_config.bootstrap_servers(),
        &[
            kafka_config.notifications_topic.as_str(),
            kafka_config.dead_letter_topic.as_str(),
        ],
    )
    .await
    {
        warn!(%e, "failed to ensure kafka topics (continuing)");
    }

    let service = Arc::new(KafkaService::new(kafka_config.clone())?);
    let publisher: Arc<dyn MessagePublisher> = service.clone();
    let publisher = web::Data::from(publisher);

    let port = app_config.port;
    info!(port, kafka_brokers = ?kafka_config.brokers, "starting producer service");
    info!("swagger running at http://localhost:{port}/api/");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(publisher.clone())
            .configure(handler::routes)
            .configure(docs::routes)
    })
    .shutdown_timeout(30)
    .bind(("0.0.0.0", port))?
    .run()
    .await?;

    info!("shutting down producer service");
    service.close();
    info!("producer service stopped");
    Ok(())
}
