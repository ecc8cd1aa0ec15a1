use serde::{Deserialize, Serialize};
use serde_json::Value;

// --- Data Structures for parsing ORS directions responses ---

/// A GeoJSON position; a third element (elevation) is carried through untouched.
pub type Position = Vec<f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LineGeometry {
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
}

/// Body of the `/geojson` format.
#[derive(Debug, Deserialize)]
pub struct GeoJsonDirections {
    pub features: Vec<GeoJsonFeature>,
}

#[derive(Debug, Deserialize)]
pub struct GeoJsonFeature {
    pub geometry: LineGeometry,
    #[serde(default)]
    pub properties: Value,
}

/// Body of the plain `/json` format.
#[derive(Debug, Deserialize)]
pub struct DirectionsResponse {
    pub routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
pub struct Route {
    pub geometry: PlainGeometry,
    #[serde(flatten)]
    pub totals: RouteTotals,
}

/// ORS encodes plain-format geometry as a polyline string unless asked otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PlainGeometry {
    Encoded(String),
    GeoJson(LineGeometry),
}

/// The summary/segments pair both formats carry, per route.
#[derive(Debug, Default, Deserialize)]
pub struct RouteTotals {
    #[serde(default)]
    pub summary: Option<DirectionsSummary>,
    #[serde(default)]
    pub segments: Vec<DirectionsSummary>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct DirectionsSummary {
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub duration: f64,
}

/// The two shapes a provider may answer with.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProviderResponse {
    FeatureCollection(GeoJsonDirections),
    Routes(DirectionsResponse),
}
