use anyhow::{Context, Result};
use autoload::{
    config::ServiceConfig,
    event::S3Event,
    notify::WebhookNotifier,
    pipeline::Pipeline,
    storage::S3Storage,
};
use reqwest::Client;
use serde::Serialize;
use std::{sync::Arc, time::Instant};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};
use warp::{reject::Rejection, reply::Reply, Filter};

#[derive(Serialize)]
struct ProcessResponse {
    success: bool,
    message: String,
    processing_time_seconds: f64,
    report: autoload::pipeline::InvocationReport,
}

async fn health_check() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&serde_json::json!({
        "status": "healthy",
        "service": "autoload"
    })))
}

async fn process_event(event: S3Event, pipeline: Arc<Pipeline>) -> Result<impl Reply, Rejection> {
    let start = Instant::now();
    info!(records = event.records.len(), "received event");

    let report = pipeline.handle_event(&event).await;
    let elapsed = start.elapsed().as_secs_f64();

    let failures: usize = report.objects.iter().map(|o| o.notifications.len()).sum();
    let message = if report.halted {
        warn!(elapsed, "invocation halted by fetch failure");
        "halted: object fetch failed".to_string()
    } else if failures > 0 {
        warn!(elapsed, failures, "processed with failures");
        format!("processed with {} notification(s)", failures)
    } else {
        info!(elapsed, objects = report.objects.len(), "processed");
        "processed".to_string()
    };

    Ok(warp::reply::json(&ProcessResponse {
        success: !report.halted,
        message,
        processing_time_seconds: elapsed,
        report,
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::from_env();
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(config.log_level.parse().unwrap_or(Level::INFO.into())),
        )
        .init();

    info!("starting autoload service");

    let notifier = WebhookNotifier::from_env(Client::new())
        .context("webhook notifier configuration")?;
    let storage = S3Storage::from_env().await;
    let pipeline = Arc::new(Pipeline::new(Arc::new(storage), Arc::new(notifier)));

    let health = warp::path("health").and(warp::get()).and_then(health_check);

    let process = warp::path("process")
        .and(warp::post())
        .and(warp::body::json())
        .and(warp::any().map(move || pipeline.clone()))
        .and_then(process_event);

    let routes = health.or(process);

    info!("listening on port {}", config.port);
    info!("process endpoint: POST http://localhost:{}/process", config.port);

    warp::serve(routes).run(([0, 0, 0, 0], config.port)).await;

    Ok(())
}
