// src/config.rs

use anyhow::{Context, Result};
use std::env;

/// Sender label shown on every webhook message.
pub const SENDER_LABEL: &str = "autoload";

/// Objects at or above this many bytes trigger an advisory notification.
pub const SIZE_WARNING_BYTES: u64 = 100_000_000;

/// Webhook target for failure notifications.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub webhook_url: String,
    pub channel: String,
}

impl NotifyConfig {
    /// Reads `WEBHOOK_URL` and `SLACK_CHANNEL`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            webhook_url: env::var("WEBHOOK_URL").context("WEBHOOK_URL is not set")?,
            channel: env::var("SLACK_CHANNEL").context("SLACK_CHANNEL is not set")?,
        })
    }
}

/// Settings for the HTTP entry point.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub log_level: String,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        Self { port, log_level }
    }
}
