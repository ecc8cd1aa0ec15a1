use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

pub type TaskId = String;

const ID_KEYS: &[&str] = &["id", "ID", "Id"];
const NAME_KEYS: &[&str] = &["name", "Name", "title"];
const LAT_KEYS: &[&str] = &["lat", "latitude", "Lat"];
const LNG_KEYS: &[&str] = &["lng", "lon", "longitude", "Lng", "Lon"];
const COMBINED_KEYS: &[&str] = &["latlng", "location", "coords", "position"];
const SLOT_KEYS: &[&str] = &["timeSlot", "time_slot", "slot"];
const KIND_KEYS: &[&str] = &["type", "kind"];
const DRIVER_KEYS: &[&str] = &["assignedDriver", "assignedDriverName", "driver"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Pick,
    Drop,
    Other,
}

impl TaskKind {
    /// Lenient mapping of the store's free-form `type` column.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().to_ascii_lowercase();
        if raw.starts_with("pick") {
            TaskKind::Pick
        } else if raw.starts_with("drop") || raw.starts_with("deliver") {
            TaskKind::Drop
        } else {
            TaskKind::Other
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::Pick => "Pickup",
            TaskKind::Drop => "Drop-off",
            TaskKind::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_slot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<TaskKind>,
    // Projection of ledger ownership; written only through the board.
    assigned_driver_name: Option<String>,
}

impl Task {
    pub fn new(id: impl Into<String>, name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            lat,
            lng,
            time_slot: None,
            kind: None,
            assigned_driver_name: None,
        }
    }

    pub fn with_kind(mut self, kind: TaskKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_time_slot(mut self, slot: impl Into<String>) -> Self {
        self.time_slot = Some(slot.into());
        self
    }

    /// Driver name as reported by the store, used only to seed the ledger.
    pub fn with_assigned_driver(mut self, name: impl Into<String>) -> Self {
        self.assigned_driver_name = Some(name.into());
        self
    }

    pub fn assigned_driver_name(&self) -> Option<&str> {
        self.assigned_driver_name.as_deref()
    }

    pub fn has_finite_position(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// The full set of tasks from the last successful store fetch, in load order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tasks: Vec<Task>,
    index: HashMap<TaskId, usize>,
}

impl Catalog {
    /// Normalizes raw store rows. Rows that can't be placed on a map are dropped,
    /// the rest of the batch still loads.
    pub fn load(rows: &[Value]) -> Self {
        let tasks: Vec<Task> = rows.iter().filter_map(normalize_row).collect();
        let dropped = rows.len() - tasks.len();
        if dropped > 0 {
            log::warn!(
                "[CATALOG] Dropped {} of {} rows without a usable id or position",
                dropped,
                rows.len()
            );
        }
        Self::from_tasks(tasks)
    }

    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let mut catalog = Self::default();
        for task in tasks {
            if catalog.index.contains_key(&task.id) {
                log::warn!("[CATALOG] Duplicate task id {}, keeping the first row", task.id);
                continue;
            }
            catalog.index.insert(task.id.clone(), catalog.tasks.len());
            catalog.tasks.push(task);
        }
        log::debug!("[CATALOG] Indexed {} tasks", catalog.tasks.len());
        catalog
    }

    pub fn by_id(&self, id: &str) -> Option<&Task> {
        self.index.get(id).map(|&i| &self.tasks[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Returns false when the id is unknown.
    pub(crate) fn set_assigned_driver(&mut self, id: &str, name: Option<&str>) -> bool {
        match self.index.get(id) {
            Some(&i) => {
                self.tasks[i].assigned_driver_name = name.map(str::to_string);
                true
            }
            None => false,
        }
    }
}

/// Maps one heterogeneous store row onto a [`Task`].
pub fn normalize_row(row: &Value) -> Option<Task> {
    let obj = row.as_object()?;
    let id = field(obj, ID_KEYS).and_then(as_text)?;
    let (lat, lng) = position(obj)?;

    let name = field(obj, NAME_KEYS)
        .and_then(as_text)
        .unwrap_or_else(|| id.clone());

    Some(Task {
        name,
        lat,
        lng,
        time_slot: field(obj, SLOT_KEYS).and_then(as_text),
        kind: field(obj, KIND_KEYS).and_then(as_text).map(|k| TaskKind::parse(&k)),
        assigned_driver_name: field(obj, DRIVER_KEYS).and_then(as_text),
        id,
    })
}

/// Parses a `"lat,lng"` pair, as used by combined position columns and `HOME_BASE`.
pub fn parse_lat_lng(raw: &str) -> Option<(f64, f64)> {
    let (lat, lng) = raw.split_once(',')?;
    let lat = lat.trim().parse::<f64>().ok()?;
    let lng = lng.trim().parse::<f64>().ok()?;
    in_range(lat, lng).then_some((lat, lng))
}

fn position(obj: &Map<String, Value>) -> Option<(f64, f64)> {
    let lat = field(obj, LAT_KEYS).and_then(as_coordinate);
    let lng = field(obj, LNG_KEYS).and_then(as_coordinate);
    if let (Some(lat), Some(lng)) = (lat, lng) {
        return in_range(lat, lng).then_some((lat, lng));
    }
    COMBINED_KEYS
        .iter()
        .filter_map(|k| obj.get(*k))
        .filter_map(Value::as_str)
        .find_map(parse_lat_lng)
}

fn in_range(lat: f64, lng: f64) -> bool {
    lat.is_finite() && lng.is_finite() && lat.abs() <= 90.0 && lng.abs() <= 180.0
}

fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

fn as_coordinate(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
