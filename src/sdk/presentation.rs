use super::catalog::{Catalog, Task, TaskId, TaskKind};
use super::roster::{Driver, Roster};
use super::routing::{RouteResult, RouteSummary};
use serde::Serialize;

/// Marker color for tasks nobody owns.
pub const UNASSIGNED_COLOR: &str = "#9e9e9e";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerRequest {
    pub task_id: TaskId,
    /// `[lat, lng]`, the map surface's order.
    pub position: [f64; 2],
    pub color: String,
    pub glyph: &'static str,
    pub popup_text: String,
}

/// Whatever actually draws. The board pushes to it, never reads from it.
pub trait MapSurface {
    fn place_marker(&mut self, marker: MarkerRequest);
    fn clear_markers(&mut self);
    fn draw_route(&mut self, driver_id: &str, route: &RouteResult, color: &str);
    fn clear_route(&mut self);
    fn show_banner(&mut self, text: &str);
}

pub fn glyph(kind: Option<TaskKind>) -> &'static str {
    match kind {
        Some(TaskKind::Pick) => "P",
        Some(TaskKind::Drop) => "D",
        _ => "•",
    }
}

pub fn popup_text(task: &Task, owner: Option<&Driver>) -> String {
    let mut lines = vec![task.name.clone()];
    if let Some(slot) = &task.time_slot {
        lines.push(format!("Slot: {}", slot));
    }
    if let Some(kind) = task.kind {
        lines.push(format!("Type: {}", kind.label()));
    }
    lines.push(match owner {
        Some(driver) => format!("Driver: {}", driver.name),
        None => "Unassigned".to_string(),
    });
    lines.join("\n")
}

pub fn marker_for(task: &Task, owner: Option<&Driver>) -> MarkerRequest {
    MarkerRequest {
        task_id: task.id.clone(),
        position: [task.lat, task.lng],
        color: owner
            .map(|d| d.display_color.clone())
            .unwrap_or_else(|| UNASSIGNED_COLOR.to_string()),
        glyph: glyph(task.kind),
        popup_text: popup_text(task, owner),
    }
}

/// Redraws every marker from the catalog's owner projection.
pub fn render_markers(catalog: &Catalog, roster: &Roster, surface: &mut dyn MapSurface) {
    surface.clear_markers();
    for task in catalog.tasks().iter().filter(|t| t.has_finite_position()) {
        let owner = task
            .assigned_driver_name()
            .and_then(|name| roster.find_by_name(name));
        surface.place_marker(marker_for(task, owner));
    }
}

/// One-line summary for the route panel, e.g. `12.3 km · 25 min`.
pub fn describe_summary(summary: Option<&RouteSummary>) -> String {
    match summary {
        Some(s) => {
            let minutes = (s.duration_seconds / 60.0).round() as u64;
            let duration = if minutes >= 60 {
                format!("{} h {:02} min", minutes / 60, minutes % 60)
            } else {
                format!("{} min", minutes)
            };
            format!("{:.1} km · {}", s.distance_km(), duration)
        }
        None => "Distance and duration unavailable".to_string(),
    }
}

/// A surface that just remembers what it was asked to draw; the CLI prints it.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceSnapshot {
    pub markers: Vec<MarkerRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<DrawnPolyline>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawnPolyline {
    pub driver_id: String,
    pub color: String,
    pub label: String,
    pub route: RouteResult,
}

impl MapSurface for SurfaceSnapshot {
    fn place_marker(&mut self, marker: MarkerRequest) {
        self.markers.push(marker);
    }

    fn clear_markers(&mut self) {
        self.markers.clear();
    }

    fn draw_route(&mut self, driver_id: &str, route: &RouteResult, color: &str) {
        self.route = Some(DrawnPolyline {
            driver_id: driver_id.to_string(),
            color: color.to_string(),
            label: describe_summary(route.summary.as_ref()),
            route: route.clone(),
        });
    }

    fn clear_route(&mut self) {
        self.route = None;
    }

    fn show_banner(&mut self, text: &str) {
        self.banner = Some(text.to_string());
    }
}
