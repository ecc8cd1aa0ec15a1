//! End-to-end board sessions against in-memory collaborators.

use async_trait::async_trait;
use dispatch_board::sdk::board::{Board, RoutePlan, RouteOutcome};
use dispatch_board::sdk::catalog::{Catalog, Task, TaskKind};
use dispatch_board::sdk::gesture::{DragEvent, GestureOutcome};
use dispatch_board::sdk::ledger::Owner;
use dispatch_board::sdk::presentation::{SurfaceSnapshot, UNASSIGNED_COLOR};
use dispatch_board::sdk::relay::{AssignmentSink, Relay};
use dispatch_board::sdk::roster::Roster;
use dispatch_board::sdk::routing::route::normalize;
use dispatch_board::sdk::routing::{
    RawResponse, ResponseFormat, RouteTransport, RoutingClient, RoutingError,
};
use dispatch_board::sdk::store::{CatalogLoadError, SaveRequest, StoreError, TaskStore};
use dispatch_board::sdk::waypoints::HomeBase;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const ALICE: &str = "driver-a";
const BRUNO: &str = "driver-b";

#[derive(Default)]
struct RecordingSink {
    saves: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    fn saves(&self) -> Vec<(String, String)> {
        self.saves.lock().unwrap().clone()
    }
}

impl AssignmentSink for RecordingSink {
    fn save(&self, task_id: &str, driver_name: &str) {
        self.saves
            .lock()
            .unwrap()
            .push((task_id.to_string(), driver_name.to_string()));
    }
}

/// Always fails its writes; rows come from a fixed list.
struct MemoryStore {
    rows: Option<Vec<Value>>,
    writes: Mutex<Vec<SaveRequest>>,
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn fetch_rows(&self) -> Result<Vec<Value>, CatalogLoadError> {
        self.rows.clone().ok_or(CatalogLoadError::Status(503))
    }

    async fn save_assignment(&self, request: &SaveRequest) -> Result<(), StoreError> {
        self.writes.lock().unwrap().push(request.clone());
        Err(StoreError::Status(500))
    }
}

struct ScriptedTransport {
    replies: Mutex<Vec<RawResponse>>,
    formats: Mutex<Vec<ResponseFormat>>,
}

impl ScriptedTransport {
    fn new(mut replies: Vec<(u16, &str)>) -> Arc<Self> {
        replies.reverse();
        Arc::new(Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|(status, body)| RawResponse {
                        status,
                        body: body.to_string(),
                    })
                    .collect(),
            ),
            formats: Mutex::new(Vec::new()),
        })
    }
}

struct Shared(Arc<ScriptedTransport>);

#[async_trait]
impl RouteTransport for Shared {
    async fn post_directions(
        &self,
        format: ResponseFormat,
        _body: &Value,
    ) -> Result<RawResponse, RoutingError> {
        self.0.formats.lock().unwrap().push(format);
        self.0
            .replies
            .lock()
            .unwrap()
            .pop()
            .ok_or(RoutingError::EmptyRoute)
    }
}

const PLAIN_5000: &str = r#"{"routes":[{"summary":{"distance":5000,"duration":600},
    "geometry":{"type":"LineString","coordinates":[[-1.6,48.1],[-1.5,48.2],[-1.6,48.1]]}}]}"#;

fn pick_and_drop() -> Catalog {
    Catalog::from_tasks(vec![
        Task::new("t1", "Bakery", 48.11, -1.68).with_kind(TaskKind::Pick),
        Task::new("t2", "Flat 4B", 48.12, -1.66).with_kind(TaskKind::Drop),
    ])
}

fn board_with(catalog: Catalog) -> (Board, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let board = Board::new(catalog, Roster::builtin(), HomeBase::FALLBACK, sink.clone());
    (board, sink)
}

fn list(board: &Board, owner: &Owner) -> Vec<String> {
    board.ledger().sequence(owner).to_vec()
}

#[test]
fn drag_scenario_orders_driver_stops() {
    let (mut board, sink) = board_with(pick_and_drop());
    let a = Owner::driver(ALICE);

    board.move_between("t1", &Owner::Unassigned, &a, 0).unwrap();
    board.move_between("t2", &Owner::Unassigned, &a, 1).unwrap();
    assert!(board.reorder_within(&a, 1, 0));

    assert_eq!(list(&board, &a), vec!["t2", "t1"]);
    assert!(board.ledger().unassigned().is_empty());
    assert_eq!(
        board.catalog().by_id("t1").unwrap().assigned_driver_name(),
        Some("Alice")
    );
    // reorders are not written back, ownership changes are
    assert_eq!(
        sink.saves(),
        vec![
            ("t1".to_string(), "Alice".to_string()),
            ("t2".to_string(), "Alice".to_string())
        ]
    );
}

#[test]
fn drag_events_map_onto_ledger_operations() {
    let (mut board, sink) = board_with(pick_and_drop());

    let cancelled = DragEvent::new("t1", "unassigned", 0);
    assert_eq!(board.handle_drag(&cancelled), GestureOutcome::Cancelled);

    let moved = board.handle_drag(&DragEvent::new("t1", "unassigned", 0).dropped_on(ALICE, 0));
    assert!(matches!(moved, GestureOutcome::Moved(ref c) if c.to == Owner::driver(ALICE)));

    // replaying the same gesture is stale: t1 already left the pool
    let replay = DragEvent::new("t1", "unassigned", 0).dropped_on(BRUNO, 0);
    assert_eq!(board.handle_drag(&replay), GestureOutcome::Stale);

    let unknown = DragEvent::new("t2", "unassigned", 0).dropped_on("driver-z", 0);
    assert!(matches!(board.handle_drag(&unknown), GestureOutcome::UnknownList { .. }));

    let back = DragEvent::new("t1", ALICE, 0).dropped_on("unassigned", 5);
    assert!(matches!(board.handle_drag(&back), GestureOutcome::Moved(_)));
    assert_eq!(list(&board, &Owner::Unassigned), vec!["t2", "t1"]);
    assert_eq!(board.catalog().by_id("t1").unwrap().assigned_driver_name(), None);

    let same_spot = DragEvent::new("t2", "unassigned", 0).dropped_on("unassigned", 0);
    assert_eq!(board.handle_drag(&same_spot), GestureOutcome::Unchanged);

    assert_eq!(sink.saves().len(), 2);
    assert_eq!(sink.saves()[1], ("t1".to_string(), String::new()));
}

#[test]
fn clear_driver_issues_one_write_per_task() {
    let catalog = Catalog::from_tasks(vec![
        Task::new("t1", "one", 48.1, -1.6).with_assigned_driver("alice"),
        Task::new("t2", "two", 48.2, -1.6).with_assigned_driver("Alice"),
        Task::new("t3", "three", 48.3, -1.6).with_assigned_driver("ALICE"),
        Task::new("t4", "four", 48.4, -1.6).with_assigned_driver("Bruno"),
    ]);
    let (mut board, sink) = board_with(catalog);
    assert_eq!(list(&board, &Owner::driver(ALICE)).len(), 3);

    let changes = board.clear_driver(ALICE);
    assert_eq!(changes.len(), 3);
    assert_eq!(list(&board, &Owner::Unassigned), vec!["t1", "t2", "t3"]);
    assert_eq!(sink.saves().len(), 3);
    assert!(sink.saves().iter().all(|(_, name)| name.is_empty()));
    assert_eq!(list(&board, &Owner::driver(BRUNO)), vec!["t4"]);
}

#[tokio::test]
async fn relay_failures_never_touch_local_state() {
    let store = Arc::new(MemoryStore {
        rows: Some(vec![
            json!({"id": "t1", "name": "one", "lat": 48.1, "lng": -1.6, "assignedDriver": "Alice"}),
            json!({"id": "t2", "name": "two", "lat": 48.2, "lng": -1.6, "assignedDriver": "Alice"}),
            json!({"id": "t3", "name": "three", "lat": 48.3, "lng": -1.6, "assignedDriver": "Alice"}),
            json!({"id": "bad", "name": "no position"}),
        ]),
        writes: Mutex::new(Vec::new()),
    });
    let relay = Arc::new(Relay::spawn(store.clone()));
    let mut board = Board::load(store.as_ref(), Roster::builtin(), HomeBase::FALLBACK, relay.clone()).await;
    assert_eq!(board.catalog().len(), 3);

    board.clear_driver(ALICE);
    assert_eq!(relay.issued(), 3);

    relay.settle(Duration::from_secs(2)).await;
    assert_eq!(store.writes.lock().unwrap().len(), 3);
    assert_eq!(board.ledger().unassigned().len(), 3);
    assert!(board
        .catalog()
        .tasks()
        .iter()
        .all(|t| t.assigned_driver_name().is_none()));
}

#[tokio::test]
async fn failed_catalog_load_shows_banner_and_empty_board() {
    let store = MemoryStore {
        rows: None,
        writes: Mutex::new(Vec::new()),
    };
    let board = Board::load(&store, Roster::builtin(), HomeBase::FALLBACK, Arc::new(RecordingSink::default())).await;
    assert!(board.catalog().is_empty());
    assert!(board.banner().unwrap().contains("503"));

    let mut surface = SurfaceSnapshot::default();
    board.render(&mut surface);
    assert!(surface.markers.is_empty());
    assert!(surface.banner.is_some());
}

#[tokio::test]
async fn route_build_falls_back_and_draws() {
    let (mut board, _) = board_with(pick_and_drop());
    board.assign("t1", ALICE, 0).unwrap();
    board.assign("t2", ALICE, 1).unwrap();

    let transport = ScriptedTransport::new(vec![(500, "upstream down"), (200, PLAIN_5000)]);
    let client = RoutingClient::new(Shared(transport.clone()));

    match board.build_route(&client, ALICE).await {
        RouteOutcome::Drawn {
            summary,
            assignment_changed,
        } => {
            let summary = summary.unwrap();
            assert_eq!(summary.distance_meters, 5000.0);
            assert_eq!(summary.duration_seconds, 600.0);
            assert!(!assignment_changed);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(
        *transport.formats.lock().unwrap(),
        vec![ResponseFormat::GeoJson, ResponseFormat::Json]
    );

    let drawn = board.route().unwrap();
    assert_eq!(drawn.result.geometry.features.len(), 1);
    assert!(!drawn.stale);

    let mut surface = SurfaceSnapshot::default();
    board.render(&mut surface);
    let polyline = surface.route.unwrap();
    assert_eq!(polyline.color, "#e6194b");
    assert_eq!(polyline.label, "5.0 km · 10 min");

    // any ledger mutation marks the drawn route stale
    board.unassign("t2").unwrap();
    assert!(board.route().unwrap().stale);
}

#[tokio::test]
async fn failed_route_is_reported_and_leaves_ledger_alone() {
    let (mut board, _) = board_with(pick_and_drop());
    board.assign("t1", ALICE, 0).unwrap();
    let revision = board.ledger().revision();

    let transport = ScriptedTransport::new(vec![(500, "a"), (502, "b")]);
    let client = RoutingClient::new(Shared(transport.clone()));

    let outcome = board.build_route(&client, ALICE).await;
    assert!(matches!(
        outcome,
        RouteOutcome::Failed(RoutingError::Exhausted { .. })
    ));
    assert_eq!(transport.formats.lock().unwrap().len(), 2);
    assert_eq!(board.ledger().revision(), revision);
    assert!(board.route().is_none());
}

#[tokio::test]
async fn empty_driver_is_not_an_error_and_skips_provider() {
    let (mut board, _) = board_with(pick_and_drop());
    let transport = ScriptedTransport::new(vec![]);
    let client = RoutingClient::new(Shared(transport.clone()));

    assert!(matches!(
        board.build_route(&client, BRUNO).await,
        RouteOutcome::NothingToRoute
    ));
    assert!(matches!(
        board.build_route(&client, "driver-z").await,
        RouteOutcome::UnknownDriver(_)
    ));
    assert!(transport.formats.lock().unwrap().is_empty());
}

#[test]
fn in_flight_route_applies_even_after_ledger_changes() {
    let (mut board, _) = board_with(pick_and_drop());
    board.assign("t1", ALICE, 0).unwrap();

    let RoutePlan::Ready(first) = board.prepare_route(ALICE) else {
        panic!("expected a routable plan");
    };
    board.assign("t2", ALICE, 1).unwrap();
    let RoutePlan::Ready(second) = board.prepare_route(ALICE) else {
        panic!("expected a routable plan");
    };
    assert_eq!(second.waypoints.stops().len(), 2);

    let ok = |body: &str| normalize(serde_json::from_str(body).unwrap());

    // second response lands first, the stale first response lands last and wins
    let outcome = board.apply_route(second, ok(PLAIN_5000));
    assert!(matches!(outcome, RouteOutcome::Drawn { assignment_changed: false, .. }));
    let outcome = board.apply_route(first, ok(PLAIN_5000));
    assert!(matches!(outcome, RouteOutcome::Drawn { assignment_changed: true, .. }));
    assert!(board.route().unwrap().stale);
}

#[test]
fn refresh_keeps_session_edits_and_drops_vanished_tasks() {
    let (mut board, _) = board_with(pick_and_drop());
    board.assign("t2", BRUNO, 0).unwrap();

    board.refresh_catalog(Catalog::from_tasks(vec![
        Task::new("t2", "Flat 4B", 48.12, -1.66),
        Task::new("t5", "New", 48.2, -1.7).with_assigned_driver("Chloe"),
    ]));

    assert!(board.owner_of("t1").is_none());
    assert_eq!(board.owner_of("t2"), Some(&Owner::driver(BRUNO)));
    assert_eq!(
        board.catalog().by_id("t2").unwrap().assigned_driver_name(),
        Some("Bruno")
    );
    assert_eq!(board.owner_of("t5"), Some(&Owner::driver("driver-c")));

    let mut surface = SurfaceSnapshot::default();
    board.render(&mut surface);
    assert!(surface.markers.iter().all(|m| m.color != UNASSIGNED_COLOR));
}

mod invariants {
    use super::*;
    use proptest::prelude::*;
    use proptest::test_runner::Config as ProptestConfig;

    #[derive(Debug, Clone)]
    enum Op {
        Move { task: usize, from: usize, to: usize, index: usize },
        Reorder { owner: usize, from: usize, to: usize },
        Unassign { task: usize },
        Clear { owner: usize },
    }

    const TASKS: usize = 6;
    // 0 = pool, 1..=3 = drivers, 4 = unknown driver
    const OWNERS: usize = 5;

    fn owner(i: usize) -> Owner {
        match i {
            0 => Owner::Unassigned,
            1 => Owner::driver("driver-a"),
            2 => Owner::driver("driver-b"),
            3 => Owner::driver("driver-c"),
            _ => Owner::driver("driver-z"),
        }
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..TASKS, 0..OWNERS, 0..OWNERS, 0..10usize)
                .prop_map(|(task, from, to, index)| Op::Move { task, from, to, index }),
            (0..OWNERS, 0..10usize, 0..10usize)
                .prop_map(|(owner, from, to)| Op::Reorder { owner, from, to }),
            (0..TASKS).prop_map(|task| Op::Unassign { task }),
            (0..OWNERS).prop_map(|owner| Op::Clear { owner }),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            failure_persistence: None,
            .. ProptestConfig::default()
        })]
        #[test]
        fn every_task_has_exactly_one_owner(ops in prop::collection::vec(arb_op(), 0..40)) {
            let tasks = (0..TASKS)
                .map(|i| Task::new(format!("t{}", i), "task", 48.0, -1.0))
                .collect();
            let (mut board, _) = board_with(Catalog::from_tasks(tasks));

            for op in ops {
                match op {
                    Op::Move { task, from, to, index } => {
                        board.move_between(&format!("t{}", task), &owner(from), &owner(to), index);
                    }
                    Op::Reorder { owner: o, from, to } => {
                        board.reorder_within(&owner(o), from, to);
                    }
                    Op::Unassign { task } => {
                        board.unassign(&format!("t{}", task));
                    }
                    Op::Clear { owner: o } => {
                        if let Some(id) = owner(o).driver_id() {
                            board.clear_driver(id);
                        }
                    }
                }

                prop_assert!(board.ledger().check_invariants().is_ok());
                let total: usize = (0..OWNERS).map(|i| board.ledger().sequence(&owner(i)).len()).sum();
                prop_assert_eq!(total, TASKS);
                for task in board.catalog().tasks() {
                    let projected = task.assigned_driver_name();
                    let owned = board
                        .owner_of(&task.id)
                        .and_then(Owner::driver_id)
                        .and_then(|d| board.roster().get(d))
                        .map(|d| d.name.as_str());
                    prop_assert_eq!(projected, owned);
                }
            }
        }
    }
}
