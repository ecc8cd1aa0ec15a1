use super::{directions_url, send_directions};
use crate::sdk::routing::error::RoutingError;
use crate::sdk::routing::service::{RawResponse, ResponseFormat, RouteTransport};
use crate::sdk::util::rate_limit::Limiter;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.openrouteservice.org/v2/directions/driving-car";

/// Hosted ORS: keyed and rate limited.
pub struct RemoteOrsProvider {
    client: Client,
    api_key: String,
    endpoint: String,
    limiter: Limiter,
}

impl RemoteOrsProvider {
    pub fn new(
        api_key: String,
        endpoint: String,
        limiter: Limiter,
        timeout: Duration,
    ) -> Result<Self, RoutingError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            endpoint,
            limiter,
        })
    }
}

#[async_trait]
impl RouteTransport for RemoteOrsProvider {
    async fn post_directions(
        &self,
        format: ResponseFormat,
        body: &Value,
    ) -> Result<RawResponse, RoutingError> {
        log::debug!("Waiting for directions limiter before calling remote provider...");
        self.limiter.until_ready().await;

        let url = directions_url(&self.endpoint, format);
        log::debug!("[PROVIDER] Calling remote directions at {}", url);

        let request = self
            .client
            .post(&url)
            .header("Authorization", &self.api_key);
        send_directions(request, &url, format, body).await
    }
}
