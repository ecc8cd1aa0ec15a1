use super::catalog::{parse_lat_lng, Catalog, TaskId};
use super::ledger::{Ledger, Owner};
use serde::Serialize;

/// `[lng, lat]`, the order the routing provider expects.
pub type LngLat = [f64; 2];

/// Where every route starts and ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HomeBase {
    pub lat: f64,
    pub lng: f64,
}

impl HomeBase {
    /// Depot used when no `HOME_BASE` is configured.
    pub const FALLBACK: HomeBase = HomeBase {
        lat: 48.1173,
        lng: -1.6778,
    };

    pub fn parse(raw: &str) -> Option<Self> {
        parse_lat_lng(raw).map(|(lat, lng)| HomeBase { lat, lng })
    }

    pub fn resolve(configured: Option<HomeBase>) -> Self {
        configured.unwrap_or(Self::FALLBACK)
    }

    pub fn lng_lat(&self) -> LngLat {
        [self.lng, self.lat]
    }
}

impl Default for HomeBase {
    fn default() -> Self {
        Self::FALLBACK
    }
}

/// Ordered coordinates for one driver's route, home base at both ends.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoints {
    coordinates: Vec<LngLat>,
    stops: Vec<TaskId>,
}

impl Waypoints {
    pub fn coordinates(&self) -> &[LngLat] {
        &self.coordinates
    }

    /// Task ids that made it into the route, in visit order.
    pub fn stops(&self) -> &[TaskId] {
        &self.stops
    }

    /// Origin alone means there is nothing to send to the provider.
    pub fn is_routable(&self) -> bool {
        self.coordinates.len() >= 2
    }
}

/// Home base, then the driver's tasks in ledger order, then home base again.
/// Tasks without a finite position are skipped.
pub fn build_coordinates(
    ledger: &Ledger,
    catalog: &Catalog,
    driver_id: &str,
    origin: HomeBase,
) -> Waypoints {
    let home = origin.lng_lat();
    let mut coordinates = vec![home];
    let mut stops = Vec::new();

    for id in ledger.sequence(&Owner::driver(driver_id)) {
        match catalog.by_id(id) {
            Some(task) if task.has_finite_position() => {
                coordinates.push([task.lng, task.lat]);
                stops.push(id.clone());
            }
            _ => log::debug!("Skipping task {} without a usable position", id),
        }
    }

    if !stops.is_empty() {
        coordinates.push(home);
    }
    Waypoints { coordinates, stops }
}
