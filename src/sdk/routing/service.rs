use super::error::RoutingError;
use async_trait::async_trait;
use serde_json::Value;

/// Directions response formats; both are served under the same endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Line geometry as a GeoJSON FeatureCollection.
    GeoJson,
    /// Plain `{ routes: [...] }` body.
    Json,
}

impl ResponseFormat {
    pub fn path_segment(&self) -> &'static str {
        match self {
            ResponseFormat::GeoJson => "geojson",
            ResponseFormat::Json => "json",
        }
    }

    pub fn accept(&self) -> &'static str {
        match self {
            ResponseFormat::GeoJson => "application/geo+json, application/json",
            ResponseFormat::Json => "application/json",
        }
    }
}

/// Status and body of one provider call, before any interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait RouteTransport: Send + Sync {
    /// Posts one directions request in the given format.
    async fn post_directions(
        &self,
        format: ResponseFormat,
        body: &Value,
    ) -> Result<RawResponse, RoutingError>;
}
