use super::error::RoutingError;
use super::provider::types::{LineGeometry, ProviderResponse};
use super::provider::{LocalOrsProvider, RemoteOrsProvider};
use super::route::{normalize, FeatureCollection, RouteFeature, RouteResult, RouteSummary};
use super::service::{ResponseFormat, RouteTransport};
use crate::sdk::config::{DispatchConfig, OrsConfig};
use crate::sdk::util::rate_limit::routing_limiter;
use crate::sdk::waypoints::LngLat;
use serde_json::{json, Value};
use std::sync::Arc;

/// Asks the provider for line geometry first and falls back once to the plain
/// format. Nothing is retried beyond that single fallback.
#[derive(Clone)]
pub struct RoutingClient {
    transport: Arc<dyn RouteTransport>,
}

impl RoutingClient {
    pub fn new<T: RouteTransport + 'static>(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    pub fn from_config(config: &DispatchConfig) -> Result<Self, RoutingError> {
        Ok(match &config.routing {
            OrsConfig::Remote { api_key, endpoint } => Self::new(RemoteOrsProvider::new(
                api_key.clone(),
                endpoint.clone(),
                routing_limiter(config.routes_per_minute),
                config.http_timeout,
            )?),
            OrsConfig::Local { endpoint } => {
                Self::new(LocalOrsProvider::new(endpoint.clone(), config.http_timeout)?)
            }
        })
    }

    /// Multi-stop route through `coordinates` in the given order.
    pub async fn route(&self, coordinates: &[LngLat]) -> Result<RouteResult, RoutingError> {
        if coordinates.len() < 2 {
            return Err(RoutingError::TooFewCoordinates(coordinates.len()));
        }
        let body = request_body(coordinates);

        let primary = match self.attempt(ResponseFormat::GeoJson, &body).await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };
        log::warn!(
            "[ROUTING] GeoJSON request for {} stops failed: {}. Retrying with plain JSON",
            coordinates.len(),
            primary
        );

        match self.attempt(ResponseFormat::Json, &body).await {
            Ok(result) => Ok(result),
            Err(fallback) => {
                log::error!("[ROUTING] Fallback request failed as well: {}", fallback);
                Err(RoutingError::Exhausted {
                    reason: format!("primary: {}; fallback: {}", primary, fallback),
                })
            }
        }
    }

    /// Point-to-point lookup, same two-attempt protocol as [`route`](Self::route).
    pub async fn route_leg(
        &self,
        origin: LngLat,
        destination: LngLat,
    ) -> Result<RouteResult, RoutingError> {
        if origin == destination {
            log::debug!("[ROUTING] Start and end coordinates are identical. Returning zero route.");
            return Ok(zero_leg(origin, destination));
        }
        self.route(&[origin, destination]).await
    }

    async fn attempt(
        &self,
        format: ResponseFormat,
        body: &Value,
    ) -> Result<RouteResult, RoutingError> {
        let raw = self.transport.post_directions(format, body).await?;
        if !raw.is_success() {
            return Err(RoutingError::from_status(raw.status, &raw.body));
        }
        let parsed: ProviderResponse = serde_json::from_str(&raw.body).map_err(|e| {
            log::error!(
                "Failed to parse {:?} directions response. Error: {}. Body: {}",
                format,
                e,
                raw.body
            );
            e
        })?;
        normalize(parsed)
    }
}

fn request_body(coordinates: &[LngLat]) -> Value {
    json!({
        "coordinates": coordinates,
        "preference": "fastest",
        "units": "m",
        "instructions": false,
    })
}

fn zero_leg(origin: LngLat, destination: LngLat) -> RouteResult {
    let geometry = LineGeometry::LineString {
        coordinates: vec![origin.to_vec(), destination.to_vec()],
    };
    RouteResult {
        geometry: FeatureCollection::new(vec![RouteFeature::new(geometry, json!({}))]),
        summary: Some(RouteSummary {
            distance_meters: 0.0,
            duration_seconds: 0.0,
        }),
    }
}
