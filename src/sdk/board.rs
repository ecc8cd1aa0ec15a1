//! One operator session: catalog, roster, ledger and the currently drawn route.
//!
//! Every ownership change flows through [`Board::apply_changes`], which keeps
//! the catalog's `assigned_driver_name` projection in step with the ledger,
//! hands the change to the write-back sink and marks the drawn route stale.

use super::catalog::{Catalog, TaskId};
use super::gesture::{DragEvent, GestureOutcome};
use super::ledger::{Ledger, Owner, Reassignment};
use super::presentation::{render_markers, MapSurface};
use super::relay::AssignmentSink;
use super::roster::Roster;
use super::routing::{RouteResult, RouteSummary, RoutingClient, RoutingError};
use super::store::{CatalogLoadError, TaskStore};
use super::waypoints::{build_coordinates, HomeBase, Waypoints};
use serde::Serialize;

/// The route currently on the map.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawnRoute {
    pub driver_id: String,
    pub result: RouteResult,
    /// The ledger has changed since this route was drawn.
    pub stale: bool,
    /// The ledger changed while the request was in flight.
    pub assignment_changed: bool,
}

/// A route request captured against the ledger at one revision.
#[derive(Debug, Clone)]
pub struct RouteTicket {
    pub driver_id: String,
    pub waypoints: Waypoints,
    pub revision: u64,
}

#[derive(Debug)]
pub enum RoutePlan {
    Ready(RouteTicket),
    NothingToRoute,
    UnknownDriver(String),
}

#[derive(Debug)]
pub enum RouteOutcome {
    Drawn {
        summary: Option<RouteSummary>,
        assignment_changed: bool,
    },
    /// The driver has no routable stops; an empty state, not an error.
    NothingToRoute,
    UnknownDriver(String),
    Failed(RoutingError),
}

pub struct Board {
    catalog: Catalog,
    roster: Roster,
    ledger: Ledger,
    home_base: HomeBase,
    sink: Box<dyn AssignmentSink + Send + Sync>,
    route: Option<DrawnRoute>,
    banner: Option<String>,
}

impl Board {
    pub fn new<S>(catalog: Catalog, roster: Roster, home_base: HomeBase, sink: S) -> Self
    where
        S: AssignmentSink + Send + Sync + 'static,
    {
        let ledger = Ledger::seed(&catalog, &roster);
        let mut board = Self {
            catalog,
            roster,
            ledger,
            home_base,
            sink: Box::new(sink),
            route: None,
            banner: None,
        };
        board.project_all();
        board
    }

    /// Fetches the catalog from the store. A failed fetch leaves an empty
    /// board with a banner rather than an error.
    pub async fn load<S>(store: &dyn TaskStore, roster: Roster, home_base: HomeBase, sink: S) -> Self
    where
        S: AssignmentSink + Send + Sync + 'static,
    {
        match store.fetch_rows().await {
            Ok(rows) => {
                let catalog = Catalog::load(&rows);
                log::info!("[CATALOG] Loaded {} of {} task rows", catalog.len(), rows.len());
                Self::new(catalog, roster, home_base, sink)
            }
            Err(e) => {
                let mut board = Self::new(Catalog::default(), roster, home_base, sink);
                board.catalog_failed(&e);
                board
            }
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn home_base(&self) -> HomeBase {
        self.home_base
    }

    pub fn route(&self) -> Option<&DrawnRoute> {
        self.route.as_ref()
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Replaces the whole catalog and re-aligns the ledger with it.
    pub fn refresh_catalog(&mut self, catalog: Catalog) {
        self.catalog = catalog;
        let removed = self.ledger.reconcile(&self.catalog, &self.roster);
        if !removed.is_empty() {
            log::info!("[CATALOG] Refresh removed {} tasks", removed.len());
        }
        self.banner = None;
        self.project_all();
        self.invalidate_route();
    }

    /// A failed fetch empties the catalog and raises the banner.
    pub fn catalog_failed(&mut self, error: &CatalogLoadError) {
        log::error!("[CATALOG] Failed to load tasks: {}", error);
        self.refresh_catalog(Catalog::default());
        self.banner = Some(format!("Could not load tasks: {}", error));
    }

    pub fn owner_of(&self, task_id: &str) -> Option<&Owner> {
        self.ledger.owner_of(task_id)
    }

    pub fn handle_drag(&mut self, event: &DragEvent) -> GestureOutcome {
        let Some(destination_id) = &event.destination_list_id else {
            return GestureOutcome::Cancelled;
        };
        let source = Owner::from_list_id(&event.source_list_id);
        let destination = Owner::from_list_id(destination_id);
        for owner in [&source, &destination] {
            if !self.ledger.has_owner(owner) {
                log::warn!("[LEDGER] Drag references unknown list {}", owner);
                return GestureOutcome::UnknownList {
                    list_id: owner.list_id().to_string(),
                };
            }
        }

        // the item id is authoritative; the index may have drifted
        let Some(from) = self.ledger.position(&source, &event.item_id) else {
            log::debug!(
                "[LEDGER] Stale drag of {} from {}, ignoring",
                event.item_id,
                source
            );
            return GestureOutcome::Stale;
        };
        let to_index = event.destination_index.unwrap_or(usize::MAX);

        if source == destination {
            if self.reorder_within(&source, from, to_index) {
                GestureOutcome::Reordered
            } else {
                GestureOutcome::Unchanged
            }
        } else {
            match self.move_between(&event.item_id, &source, &destination, to_index) {
                Some(change) => GestureOutcome::Moved(change),
                None => GestureOutcome::Stale,
            }
        }
    }

    pub fn reorder_within(&mut self, owner: &Owner, from: usize, to: usize) -> bool {
        let changed = self.ledger.reorder_within(owner, from, to);
        if changed {
            self.invalidate_route();
        }
        changed
    }

    pub fn move_between(
        &mut self,
        task_id: &str,
        from: &Owner,
        to: &Owner,
        to_index: usize,
    ) -> Option<Reassignment> {
        let revision = self.ledger.revision();
        let change = self.ledger.move_between(task_id, from, to, to_index);
        match &change {
            Some(change) => self.apply_changes(std::slice::from_ref(change)),
            // same-owner moves reorder without an ownership change
            None if self.ledger.revision() != revision => self.invalidate_route(),
            None => {}
        }
        change
    }

    /// Moves a task to `driver_id` from wherever it currently is.
    pub fn assign(&mut self, task_id: &str, driver_id: &str, index: usize) -> Option<Reassignment> {
        let from = self.ledger.owner_of(task_id)?.clone();
        self.move_between(task_id, &from, &Owner::driver(driver_id), index)
    }

    pub fn unassign(&mut self, task_id: &str) -> Option<Reassignment> {
        let change = self.ledger.unassign(task_id)?;
        self.apply_changes(std::slice::from_ref(&change));
        Some(change)
    }

    /// Unassigns everything a driver holds; one write-back per task.
    pub fn clear_driver(&mut self, driver_id: &str) -> Vec<Reassignment> {
        let changes = self.ledger.clear(driver_id);
        self.apply_changes(&changes);
        changes
    }

    fn apply_changes(&mut self, changes: &[Reassignment]) {
        if changes.is_empty() {
            return;
        }
        for change in changes {
            let name = change
                .to
                .driver_id()
                .and_then(|id| self.roster.get(id))
                .map(|d| d.name.as_str());
            self.catalog.set_assigned_driver(&change.task_id, name);
            self.sink.save(&change.task_id, name.unwrap_or(""));
            log::debug!(
                "[LEDGER] {} moved {} -> {}",
                change.task_id,
                change.from,
                change.to
            );
        }
        self.invalidate_route();
    }

    /// Rewrites the owner projection for every task from the ledger.
    fn project_all(&mut self) {
        let ids: Vec<TaskId> = self.catalog.tasks().iter().map(|t| t.id.clone()).collect();
        for id in ids {
            let name = self
                .ledger
                .owner_of(&id)
                .and_then(Owner::driver_id)
                .and_then(|d| self.roster.get(d))
                .map(|d| d.name.clone());
            self.catalog.set_assigned_driver(&id, name.as_deref());
        }
    }

    fn invalidate_route(&mut self) {
        if let Some(route) = self.route.as_mut() {
            route.stale = true;
        }
    }

    pub fn waypoints(&self, driver_id: &str) -> Waypoints {
        build_coordinates(&self.ledger, &self.catalog, driver_id, self.home_base)
    }

    /// Captures what to request for `driver_id` without holding the board.
    pub fn prepare_route(&self, driver_id: &str) -> RoutePlan {
        if !self.roster.contains(driver_id) {
            return RoutePlan::UnknownDriver(driver_id.to_string());
        }
        let waypoints = self.waypoints(driver_id);
        if !waypoints.is_routable() {
            return RoutePlan::NothingToRoute;
        }
        RoutePlan::Ready(RouteTicket {
            driver_id: driver_id.to_string(),
            waypoints,
            revision: self.ledger.revision(),
        })
    }

    /// Applies whichever response arrives; the last one applied wins.
    pub fn apply_route(
        &mut self,
        ticket: RouteTicket,
        result: Result<RouteResult, RoutingError>,
    ) -> RouteOutcome {
        match result {
            Ok(result) => {
                let assignment_changed = ticket.revision != self.ledger.revision();
                let summary = result.summary;
                self.route = Some(DrawnRoute {
                    driver_id: ticket.driver_id,
                    result,
                    stale: assignment_changed,
                    assignment_changed,
                });
                RouteOutcome::Drawn {
                    summary,
                    assignment_changed,
                }
            }
            Err(e) => {
                log::warn!("[ROUTING] Route for {} failed: {}", ticket.driver_id, e);
                RouteOutcome::Failed(e)
            }
        }
    }

    pub async fn build_route(&mut self, client: &RoutingClient, driver_id: &str) -> RouteOutcome {
        match self.prepare_route(driver_id) {
            RoutePlan::Ready(ticket) => {
                let result = client.route(ticket.waypoints.coordinates()).await;
                self.apply_route(ticket, result)
            }
            RoutePlan::NothingToRoute => {
                self.clear_route();
                RouteOutcome::NothingToRoute
            }
            RoutePlan::UnknownDriver(id) => RouteOutcome::UnknownDriver(id),
        }
    }

    /// Quick home-base-to-task lookup; leaves the drawn route alone.
    pub async fn lookup_leg(
        &self,
        client: &RoutingClient,
        task_id: &str,
    ) -> Option<Result<RouteResult, RoutingError>> {
        let task = self.catalog.by_id(task_id)?;
        if !task.has_finite_position() {
            return None;
        }
        Some(
            client
                .route_leg(self.home_base.lng_lat(), [task.lng, task.lat])
                .await,
        )
    }

    pub fn clear_route(&mut self) {
        self.route = None;
    }

    /// Pushes markers, the current route and any banner to the surface.
    pub fn render(&self, surface: &mut dyn MapSurface) {
        render_markers(&self.catalog, &self.roster, surface);
        match &self.route {
            Some(route) => {
                let color = self
                    .roster
                    .get(&route.driver_id)
                    .map(|d| d.display_color.as_str())
                    .unwrap_or(super::presentation::UNASSIGNED_COLOR);
                surface.draw_route(&route.driver_id, &route.result, color);
            }
            None => surface.clear_route(),
        }
        if let Some(banner) = &self.banner {
            surface.show_banner(banner);
        }
    }
}
