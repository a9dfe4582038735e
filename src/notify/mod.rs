// src/notify/mod.rs

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{NotifyConfig, SENDER_LABEL};

#[cfg(test)]
pub mod recording;

/// Fire-and-forget channel for failures and warnings.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    channel: &'a str,
    username: &'a str,
    text: &'a str,
}

/// Posts messages to an incoming-webhook endpoint (Slack payload shape).
pub struct WebhookNotifier {
    client: Client,
    config: NotifyConfig,
}

impl WebhookNotifier {
    pub fn new(client: Client, config: NotifyConfig) -> Self {
        Self { client, config }
    }

    pub fn from_env(client: Client) -> Result<Self> {
        Ok(Self::new(client, NotifyConfig::from_env()?))
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        let payload = WebhookPayload {
            channel: &self.config.channel,
            username: SENDER_LABEL,
            text: message,
        };
        let resp = self
            .client
            .post(&self.config.webhook_url)
            .json(&payload)
            .send()
            .await
            .context("posting webhook notification")?;

        // delivery is not acknowledged; a bad status only gets logged
        if !resp.status().is_success() {
            warn!(status = %resp.status(), "webhook returned non-success status");
        } else {
            debug!("webhook notification delivered");
        }
        Ok(())
    }
}

/// Writes notifications to the log only. Used for offline runs.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        warn!(notification = %message, "notify");
        Ok(())
    }
}
