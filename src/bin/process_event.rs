// src/bin/process_event.rs
// Run one bucket notification through the transform without the HTTP service.

use anyhow::{Context, Result};
use autoload::{
    event::{ObjectRef, S3Event},
    notify::{LogNotifier, Notifier, WebhookNotifier},
    pipeline::{InvocationReport, Pipeline, Stage},
    storage::{LocalStorage, ObjectStorage, S3Storage},
};
use clap::Parser;
use reqwest::Client;
use std::{io::Read, path::PathBuf, sync::Arc};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Process a notification payload, or a single object, and print the report as JSON.
#[derive(Parser, Debug)]
struct Args {
    /// Notification JSON file; `-` reads stdin
    #[arg(long, conflicts_with = "key")]
    event: Option<PathBuf>,

    /// Bucket of a single object to process (with --key)
    #[arg(long, requires = "key")]
    bucket: Option<String>,

    /// Key of a single object to process (with --bucket)
    #[arg(long, requires = "bucket")]
    key: Option<String>,

    /// Serve buckets from `<local_root>/<bucket>/` instead of S3
    #[arg(long)]
    local_root: Option<PathBuf>,

    /// Log notifications instead of posting them to the webhook
    #[arg(long)]
    log_notifications: bool,
}

fn read_event(path: &PathBuf) -> Result<S3Event> {
    let body = if path.as_os_str() == "-" {
        let mut s = String::new();
        std::io::stdin()
            .read_to_string(&mut s)
            .context("reading event from stdin")?;
        s
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
    };
    serde_json::from_str(&body).context("parsing notification payload")
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();

    let notifier: Arc<dyn Notifier> = if args.log_notifications {
        Arc::new(LogNotifier)
    } else {
        Arc::new(WebhookNotifier::from_env(Client::new()).context("webhook notifier configuration")?)
    };
    let storage: Arc<dyn ObjectStorage> = match &args.local_root {
        Some(root) => {
            info!(root = %root.display(), "using local storage");
            Arc::new(LocalStorage::new(root))
        }
        None => Arc::new(S3Storage::from_env().await),
    };
    let pipeline = Pipeline::new(storage, notifier);

    let report = match (&args.event, &args.bucket, &args.key) {
        (Some(path), _, _) => {
            let event = read_event(path)?;
            pipeline.handle_event(&event).await
        }
        (None, Some(bucket), Some(key)) => {
            let outcome = pipeline.process_object(&ObjectRef::new(bucket, key)).await;
            let mut report = InvocationReport::new();
            report.halted = outcome.aborted_at == Some(Stage::Fetch);
            report.objects.push(outcome);
            report
        }
        _ => anyhow::bail!("pass --event, or --bucket with --key"),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.halted {
        std::process::exit(1);
    }
    Ok(())
}
