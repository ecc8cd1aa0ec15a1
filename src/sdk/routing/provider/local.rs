use super::{directions_url, send_directions};
use crate::sdk::routing::error::RoutingError;
use crate::sdk::routing::service::{RawResponse, ResponseFormat, RouteTransport};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Self-hosted ORS: no key, no quota.
pub struct LocalOrsProvider {
    client: Client,
    endpoint: String,
}

impl LocalOrsProvider {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, RoutingError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint,
        })
    }
}

#[async_trait]
impl RouteTransport for LocalOrsProvider {
    async fn post_directions(
        &self,
        format: ResponseFormat,
        body: &Value,
    ) -> Result<RawResponse, RoutingError> {
        let url = directions_url(&self.endpoint, format);
        log::debug!("[PROVIDER] Calling local directions at {}", url);
        send_directions(self.client.post(&url), &url, format, body).await
    }
}
