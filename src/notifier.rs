use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::alerts::{Alert, AlertCondition};

#[async_trait]
pub trait AlertNotifier: Send + Sync {
    async fn send_email(&self, to: &str, alert: &Alert) -> Result<()>;
    async fn send_webhook(&self, url: &str, alert: &Alert) -> Result<()>;
}

/// Optional HTTP email relay (any provider accepting a JSON send request).
#[derive(Debug, Clone)]
pub struct EmailRelay {
    pub url: String,
    pub api_key: Option<String>,
    pub from: String,
}

#[derive(Clone)]
pub struct HttpNotifier {
    email: Option<EmailRelay>,
    http: Client,
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    event: &'static str,
    message: String,
    alert: &'a Alert,
}

#[derive(Serialize)]
struct EmailPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: String,
    text: String,
}

pub fn alert_message(alert: &Alert) -> String {
    let dir = match alert.condition {
        AlertCondition::Above => "risen above",
        AlertCondition::Below => "fallen below",
    };
    match alert.current_price {
        Some(p) => format!("{} has {dir} ${} (current price ${p})", alert.symbol, alert.target_price),
        None => format!("{} has {dir} ${}", alert.symbol, alert.target_price),
    }
}

impl HttpNotifier {
    pub fn new(email: Option<EmailRelay>, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { email, http })
    }
}

#[async_trait]
impl AlertNotifier for HttpNotifier {
    async fn send_email(&self, to: &str, alert: &Alert) -> Result<()> {
        let Some(relay) = self.email.as_ref() else {
            // Email is optional outside production.
            debug!(id = %alert.id, "notifier.email.unconfigured");
            return Ok(());
        };

        let mut req = self.http.post(&relay.url).json(&EmailPayload {
            from: &relay.from,
            to,
            subject: format!("Price alert: {} {} ${}", alert.symbol, alert.condition, alert.target_price),
            text: alert_message(alert),
        });
        if let Some(key) = relay.api_key.as_deref() {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("email relay failed: {}", resp.status()));
        }
        Ok(())
    }

    async fn send_webhook(&self, url: &str, alert: &Alert) -> Result<()> {
        let resp = self
            .http
            .post(url)
            .json(&WebhookPayload {
                event: "price_alert.triggered",
                message: alert_message(alert),
                alert,
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(anyhow!("webhook failed: {}", resp.status()));
        }
        Ok(())
    }
}
