use super::error::RoutingError;
use super::provider::types::{
    DirectionsSummary, LineGeometry, PlainGeometry, Position, ProviderResponse, RouteTotals,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

impl RouteSummary {
    pub fn distance_km(&self) -> f64 {
        self.distance_meters / 1000.0
    }

    pub fn duration_hours(&self) -> f64 {
        self.duration_seconds / 3600.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteFeature {
    #[serde(rename = "type")]
    kind: &'static str,
    pub geometry: LineGeometry,
    pub properties: Value,
}

impl RouteFeature {
    pub fn new(geometry: LineGeometry, properties: Value) -> Self {
        Self {
            kind: "Feature",
            geometry,
            properties,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    pub features: Vec<RouteFeature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<RouteFeature>) -> Self {
        Self {
            kind: "FeatureCollection",
            features,
        }
    }
}

/// What the map draws: line geometry plus an optional distance/duration summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteResult {
    pub geometry: FeatureCollection,
    pub summary: Option<RouteSummary>,
}

/// Folds either provider shape into a [`RouteResult`].
pub fn normalize(response: ProviderResponse) -> Result<RouteResult, RoutingError> {
    match response {
        ProviderResponse::FeatureCollection(collection) => {
            let first = collection.features.first().ok_or(RoutingError::EmptyRoute)?;
            // properties that don't look like ORS totals just mean no summary
            let totals: RouteTotals =
                serde_json::from_value(first.properties.clone()).unwrap_or_default();
            let summary = summarize(&totals);
            let features = collection
                .features
                .into_iter()
                .map(|f| RouteFeature::new(f.geometry, f.properties))
                .collect();
            Ok(RouteResult {
                geometry: FeatureCollection::new(features),
                summary,
            })
        }
        ProviderResponse::Routes(directions) => {
            let route = directions
                .routes
                .into_iter()
                .next()
                .ok_or(RoutingError::EmptyRoute)?;
            let geometry = match route.geometry {
                PlainGeometry::GeoJson(geometry) => geometry,
                PlainGeometry::Encoded(encoded) => LineGeometry::LineString {
                    coordinates: decode_polyline(&encoded)?,
                },
            };
            let summary = summarize(&route.totals);
            let properties = match summary {
                Some(s) => json!({ "summary": { "distance": s.distance_meters, "duration": s.duration_seconds } }),
                None => json!({}),
            };
            Ok(RouteResult {
                geometry: FeatureCollection::new(vec![RouteFeature::new(geometry, properties)]),
                summary,
            })
        }
    }
}

/// Top-level summary wins; otherwise per-segment totals are summed.
fn summarize(totals: &RouteTotals) -> Option<RouteSummary> {
    if let Some(DirectionsSummary { distance, duration }) = totals.summary {
        return Some(RouteSummary {
            distance_meters: distance,
            duration_seconds: duration,
        });
    }
    if totals.segments.is_empty() {
        return None;
    }
    let (distance, duration) = totals
        .segments
        .iter()
        .fold((0.0, 0.0), |(d, t), s| (d + s.distance, t + s.duration));
    Some(RouteSummary {
        distance_meters: distance,
        duration_seconds: duration,
    })
}

/// Decodes a precision-5 encoded polyline into `[lng, lat]` positions.
pub fn decode_polyline(encoded: &str) -> Result<Vec<Position>, RoutingError> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let (mut lat, mut lng) = (0i64, 0i64);
    let mut positions = Vec::new();

    while index < bytes.len() {
        let start = index;
        lat = lat
            .checked_add(next_delta(bytes, &mut index)?)
            .ok_or(RoutingError::Polyline(start))?;
        lng = lng
            .checked_add(next_delta(bytes, &mut index)?)
            .ok_or(RoutingError::Polyline(start))?;
        positions.push(vec![lng as f64 / 1e5, lat as f64 / 1e5]);
    }
    Ok(positions)
}

fn next_delta(bytes: &[u8], index: &mut usize) -> Result<i64, RoutingError> {
    let mut result = 0i64;
    let mut shift = 0u32;
    loop {
        let byte = *bytes.get(*index).ok_or(RoutingError::Polyline(*index))?;
        let chunk = i64::from(byte) - 63;
        if !(0..64).contains(&chunk) || shift > 60 {
            return Err(RoutingError::Polyline(*index));
        }
        *index += 1;
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }
    Ok(if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> RouteResult {
        normalize(serde_json::from_str(body).unwrap()).unwrap()
    }

    #[test]
    fn plain_routes_are_wrapped_into_one_feature() {
        let result = parse(
            r#"{"routes":[{"summary":{"distance":5000,"duration":600},
                "geometry":{"type":"LineString","coordinates":[[-1.6,48.1],[-1.5,48.2]]}}]}"#,
        );
        assert_eq!(result.geometry.features.len(), 1);
        assert_eq!(
            result.summary,
            Some(RouteSummary {
                distance_meters: 5000.0,
                duration_seconds: 600.0
            })
        );
        let json = serde_json::to_value(&result.geometry).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"][0]["type"], "Feature");
        assert_eq!(json["features"][0]["geometry"]["type"], "LineString");
    }

    #[test]
    fn geojson_collection_is_used_as_is() {
        let result = parse(
            r#"{"type":"FeatureCollection","bbox":[0,0,1,1],"features":[
                {"type":"Feature","properties":{"summary":{"distance":1200.5,"duration":90},"way_points":[0,1]},
                 "geometry":{"type":"MultiLineString","coordinates":[[[0,0],[1,1]],[[1,1],[2,2]]]}}]}"#,
        );
        let feature = &result.geometry.features[0];
        assert!(matches!(feature.geometry, LineGeometry::MultiLineString { .. }));
        assert_eq!(feature.properties["way_points"][1], 1);
        assert_eq!(result.summary.unwrap().distance_meters, 1200.5);
    }

    #[test]
    fn summary_is_summed_from_segments() {
        let result = parse(
            r#"{"routes":[{"segments":[{"distance":100,"duration":10},{"distance":250.5,"duration":20}],
                "geometry":{"type":"LineString","coordinates":[[0,0],[1,1]]}}]}"#,
        );
        let summary = result.summary.unwrap();
        assert_eq!(summary.distance_meters, 350.5);
        assert_eq!(summary.duration_seconds, 30.0);
    }

    #[test]
    fn missing_totals_leave_summary_empty() {
        let result = parse(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","geometry":{"type":"LineString","coordinates":[[0,0],[1,1]]}}]}"#,
        );
        assert!(result.summary.is_none());
        assert_eq!(result.geometry.features.len(), 1);
    }

    #[test]
    fn empty_route_lists_are_errors() {
        let empty: ProviderResponse = serde_json::from_str(r#"{"routes":[]}"#).unwrap();
        assert!(matches!(normalize(empty), Err(RoutingError::EmptyRoute)));
    }

    #[test]
    fn encoded_geometry_is_decoded() {
        let result = parse(r#"{"routes":[{"geometry":"_p~iF~ps|U_ulLnnqC_mqNvxq`@"}]}"#);
        let LineGeometry::LineString { coordinates } = &result.geometry.features[0].geometry else {
            panic!("expected a LineString");
        };
        let expected = [[-120.2, 38.5], [-120.95, 40.7], [-126.453, 43.252]];
        assert_eq!(coordinates.len(), expected.len());
        for (got, want) in coordinates.iter().zip(expected) {
            assert!((got[0] - want[0]).abs() < 1e-9 && (got[1] - want[1]).abs() < 1e-9);
        }
    }

    #[test]
    fn truncated_polyline_is_rejected() {
        assert!(matches!(decode_polyline("_p~iF~ps|"), Err(RoutingError::Polyline(_))));
    }

    #[test]
    fn overflowing_polyline_is_rejected() {
        let encoded = "~~~~~~~~~~~~F".repeat(6);
        assert!(matches!(decode_polyline(&encoded), Err(RoutingError::Polyline(_))));

        let body = serde_json::json!({ "routes": [{ "geometry": encoded }] });
        let response = serde_json::from_value(body).unwrap();
        assert!(matches!(normalize(response), Err(RoutingError::Polyline(_))));
    }
}
