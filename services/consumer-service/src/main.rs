use actix_web::middleware::Logger;
use actix_web::{web, App, HttpResponse, HttpServer};
use shared::config::bootstrap;
use shared::consumer::run_consumer;
use shared::dto::HealthResponse;
use shared::kafka::{create_consumer, DeadLetterWriter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

mod processor;

use processor::NotificationLogger;

const DEFAULT_PORT: u16 = 3001;

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse::ok())
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let (app_config, kafka_config) = bootstrap("consumer-service", "notification-group")?;
    let port = app_config.port_or(DEFAULT_PORT);

    let consumer = create_consumer(&kafka_config)?;
    let dead_letters = Arc::new(DeadLetterWriter::from_config(&kafka_config)?);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    info!(
        topic = %kafka_config.notifications_topic,
        group_id = %kafka_config.group_id,
        "starting kafka consumer"
    );
    let worker = {
        let dead_letters = dead_letters.clone();
        tokio::spawn(async move {
            run_consumer(consumer, &NotificationLogger, dead_letters.as_ref(), shutdown_rx).await;
        })
    };

    info!(port, kafka_brokers = ?kafka_config.brokers, "starting consumer service");
    HttpServer::new(|| {
        App::new()
            .wrap(Logger::default())
            .route("/health", web::get().to(health))
    })
    .shutdown_timeout(30)
    .bind(("0.0.0.0", port))?
    .run()
    .await?;

    info!("shutting down consumer service");
    let _ = shutdown_tx.send(true);
    if let Err(e) = worker.await {
        error!(%e, "kafka consumer task failed");
    }
    dead_letters.flush(Duration::from_secs(10));
    info!("consumer service stopped");
    Ok(())
}
