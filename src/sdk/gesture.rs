use super::catalog::TaskId;
use super::ledger::Reassignment;
use serde::{Deserialize, Serialize};

/// A completed drag as reported by the drag-and-drop surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragEvent {
    pub source_list_id: String,
    pub source_index: usize,
    #[serde(default)]
    pub destination_list_id: Option<String>,
    #[serde(default)]
    pub destination_index: Option<usize>,
    pub item_id: TaskId,
}

impl DragEvent {
    pub fn new(item_id: &str, source: &str, source_index: usize) -> Self {
        Self {
            source_list_id: source.to_string(),
            source_index,
            destination_list_id: None,
            destination_index: None,
            item_id: item_id.to_string(),
        }
    }

    pub fn dropped_on(mut self, destination: &str, index: usize) -> Self {
        self.destination_list_id = Some(destination.to_string());
        self.destination_index = Some(index);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GestureOutcome {
    /// Dropped outside any list.
    Cancelled,
    Reordered,
    Moved(Reassignment),
    /// Dropped back where it started.
    Unchanged,
    /// The item isn't in the source list any more.
    Stale,
    UnknownList { list_id: String },
}
