use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use warden_domain::ChannelId;

#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    /// The target channel is gone or the delivery endpoint was revoked.
    /// Never retried.
    #[error("Delivery target unusable: {0}")]
    PermissionDenied(String),
    /// Throttled by the provider; retry after the supplied hint when there
    /// is one.
    #[error("Rate limited by the messaging provider")]
    RateLimited { retry_after_millis: Option<u64> },
    /// Network error or provider 5xx; retried with backoff.
    #[error("Transient delivery failure: {0}")]
    Transient(String),
}

#[async_trait::async_trait]
pub trait IMessenger: Send + Sync {
    async fn deliver(&self, channel_id: &ChannelId, content: &str) -> Result<(), DeliveryError>;
}

/// Delivers rendered messages through the messaging collaborator's webhook
/// endpoint.
pub struct WebhookMessenger {
    client: Client,
    base_url: String,
    webhook_key: Option<String>,
}

impl WebhookMessenger {
    pub fn new(base_url: String, webhook_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            webhook_key,
        }
    }
}

#[derive(Debug, Serialize)]
struct DeliveryBody<'a> {
    content: &'a str,
}

fn retry_after_millis(res: &reqwest::Response) -> Option<u64> {
    res.headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(|secs| secs * 1000)
}

#[async_trait::async_trait]
impl IMessenger for WebhookMessenger {
    async fn deliver(&self, channel_id: &ChannelId, content: &str) -> Result<(), DeliveryError> {
        let url = format!("{}/channels/{}/messages", self.base_url, channel_id);
        let mut req = self.client.post(&url).json(&DeliveryBody { content });
        if let Some(key) = &self.webhook_key {
            req = req.header("warden-webhook-key", key);
        }

        let res = req
            .send()
            .await
            .map_err(|e| DeliveryError::Transient(e.to_string()))?;

        match res.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                Err(DeliveryError::PermissionDenied(format!(
                    "Channel {} rejected delivery with status {}",
                    channel_id,
                    res.status()
                )))
            }
            StatusCode::TOO_MANY_REQUESTS => Err(DeliveryError::RateLimited {
                retry_after_millis: retry_after_millis(&res),
            }),
            status => Err(DeliveryError::Transient(format!(
                "Unexpected status code: {}",
                status
            ))),
        }
    }
}

/// Recording stand-in for tests; failures can be scripted per call.
pub struct InMemoryMessenger {
    deliveries: Mutex<Vec<(ChannelId, String)>>,
    scripted_failures: Mutex<VecDeque<DeliveryError>>,
    latency: Mutex<Option<Duration>>,
}

impl InMemoryMessenger {
    pub fn new() -> Self {
        Self {
            deliveries: Mutex::new(Vec::new()),
            scripted_failures: Mutex::new(VecDeque::new()),
            latency: Mutex::new(None),
        }
    }

    /// The next `deliver` call fails with `error` instead of delivering.
    pub fn push_failure(&self, error: DeliveryError) {
        self.scripted_failures.lock().unwrap().push_back(error);
    }

    /// Make every delivery take this long, so tests can overlap in-flight
    /// dispatches with concurrent evaluators.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    pub fn deliveries(&self) -> Vec<(ChannelId, String)> {
        self.deliveries.lock().unwrap().clone()
    }

    pub fn delivery_count(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl IMessenger for InMemoryMessenger {
    async fn deliver(&self, channel_id: &ChannelId, content: &str) -> Result<(), DeliveryError> {
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(error) = self.scripted_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        self.deliveries
            .lock()
            .unwrap()
            .push((channel_id.clone(), content.to_string()));
        Ok(())
    }
}
