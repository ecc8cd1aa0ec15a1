pub mod sdk;

pub use sdk::board::{Board, DrawnRoute, RouteOutcome, RoutePlan, RouteTicket};
pub use sdk::catalog::{Catalog, Task, TaskKind};
pub use sdk::config::{DispatchConfig, OrsConfig};
pub use sdk::gesture::{DragEvent, GestureOutcome};
pub use sdk::ledger::{Ledger, Owner, Reassignment};
pub use sdk::relay::{AssignmentSink, Relay};
pub use sdk::roster::{Driver, Roster};
pub use sdk::routing::{RouteResult, RouteSummary, RoutingClient, RoutingError};
pub use sdk::store::{HttpTaskStore, TaskStore};
pub use sdk::waypoints::{build_coordinates, HomeBase, Waypoints};
