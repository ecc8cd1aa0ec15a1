use super::catalog::{Catalog, TaskId};
use super::roster::{DriverId, Roster};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Who holds a task. `Unassigned` is a pseudo-owner with its own ordered list,
/// so moves into and out of the pool go through the same remove/insert path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub enum Owner {
    Unassigned,
    Driver(DriverId),
}

impl Owner {
    pub const UNASSIGNED_LIST_ID: &'static str = "unassigned";

    pub fn driver(id: &str) -> Self {
        Owner::Driver(id.to_string())
    }

    /// Maps a drag-and-drop list id onto an owner.
    pub fn from_list_id(list_id: &str) -> Self {
        if list_id == Self::UNASSIGNED_LIST_ID {
            Owner::Unassigned
        } else {
            Owner::Driver(list_id.to_string())
        }
    }

    pub fn list_id(&self) -> &str {
        match self {
            Owner::Unassigned => Self::UNASSIGNED_LIST_ID,
            Owner::Driver(id) => id,
        }
    }

    pub fn driver_id(&self) -> Option<&str> {
        match self {
            Owner::Unassigned => None,
            Owner::Driver(id) => Some(id),
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.list_id())
    }
}

impl From<Owner> for String {
    fn from(owner: Owner) -> Self {
        owner.list_id().to_string()
    }
}

/// One ownership change caused by a ledger mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reassignment {
    pub task_id: TaskId,
    pub from: Owner,
    pub to: Owner,
}

/// Ordered task lists per owner. Every known task id lives in exactly one list.
#[derive(Debug, Clone)]
pub struct Ledger {
    sequences: HashMap<Owner, Vec<TaskId>>,
    owners: HashMap<TaskId, Owner>,
    revision: u64,
}

impl Ledger {
    pub fn new<I, S>(driver_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<DriverId>,
    {
        let mut sequences = HashMap::new();
        sequences.insert(Owner::Unassigned, Vec::new());
        for id in driver_ids {
            sequences.insert(Owner::Driver(id.into()), Vec::new());
        }
        Self {
            sequences,
            owners: HashMap::new(),
            revision: 0,
        }
    }

    /// Builds the initial ledger from the store's `assignedDriver` names.
    pub fn seed(catalog: &Catalog, roster: &Roster) -> Self {
        let mut ledger = Self::new(roster.drivers().iter().map(|d| d.id.clone()));
        for task in catalog.tasks() {
            let owner = seed_owner(task.assigned_driver_name(), roster, &task.id);
            ledger.push(owner, task.id.clone());
        }
        log::debug!(
            "[LEDGER] Seeded {} tasks, {} unassigned",
            catalog.len(),
            ledger.unassigned().len()
        );
        ledger
    }

    /// Re-aligns the ledger with a refreshed catalog. Surviving ids keep their
    /// owner and position; vanished ids are dropped; new ids are seeded from
    /// their store field.
    pub fn reconcile(&mut self, catalog: &Catalog, roster: &Roster) -> Vec<TaskId> {
        let mut removed = Vec::new();
        for seq in self.sequences.values_mut() {
            seq.retain(|id| {
                let keep = catalog.contains(id);
                if !keep {
                    removed.push(id.clone());
                }
                keep
            });
        }
        for id in &removed {
            self.owners.remove(id);
        }
        for task in catalog.tasks() {
            if !self.owners.contains_key(&task.id) {
                let owner = seed_owner(task.assigned_driver_name(), roster, &task.id);
                self.push(owner, task.id.clone());
            }
        }
        self.revision += 1;
        removed
    }

    fn push(&mut self, owner: Owner, task_id: TaskId) {
        let owner = if self.sequences.contains_key(&owner) {
            owner
        } else {
            Owner::Unassigned
        };
        self.owners.insert(task_id.clone(), owner.clone());
        self.sequences.entry(owner).or_default().push(task_id);
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn has_owner(&self, owner: &Owner) -> bool {
        self.sequences.contains_key(owner)
    }

    pub fn owner_of(&self, task_id: &str) -> Option<&Owner> {
        self.owners.get(task_id)
    }

    pub fn sequence(&self, owner: &Owner) -> &[TaskId] {
        self.sequences.get(owner).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn unassigned(&self) -> &[TaskId] {
        self.sequence(&Owner::Unassigned)
    }

    pub fn position(&self, owner: &Owner, task_id: &str) -> Option<usize> {
        self.sequences.get(owner)?.iter().position(|id| id == task_id)
    }

    /// Moves one element within its own list. Out-of-range `from` is a no-op,
    /// `to` is clamped to the end.
    pub fn reorder_within(&mut self, owner: &Owner, from: usize, to: usize) -> bool {
        let Some(seq) = self.sequences.get_mut(owner) else {
            return false;
        };
        if from >= seq.len() {
            return false;
        }
        let to = to.min(seq.len() - 1);
        if from == to {
            return false;
        }
        let id = seq.remove(from);
        seq.insert(to, id);
        self.revision += 1;
        true
    }

    /// Removes `task_id` from `from` and inserts it into `to` at a clamped index.
    /// Returns `None` when the task isn't in `from` (stale gesture), when `to`
    /// isn't a known owner, or when `from == to` (treated as a reorder).
    pub fn move_between(
        &mut self,
        task_id: &str,
        from: &Owner,
        to: &Owner,
        to_index: usize,
    ) -> Option<Reassignment> {
        let pos = self.position(from, task_id)?;
        if from == to {
            self.reorder_within(from, pos, to_index);
            return None;
        }
        if !self.sequences.contains_key(to) {
            log::debug!("[LEDGER] Ignoring move of {} to unknown owner {}", task_id, to);
            return None;
        }

        let id = self.sequences.get_mut(from)?.remove(pos);
        let dest = self.sequences.entry(to.clone()).or_default();
        let index = to_index.min(dest.len());
        dest.insert(index, id.clone());
        self.owners.insert(id.clone(), to.clone());
        self.revision += 1;

        Some(Reassignment {
            task_id: id,
            from: from.clone(),
            to: to.clone(),
        })
    }

    pub fn unassign(&mut self, task_id: &str) -> Option<Reassignment> {
        let owner = self.owner_of(task_id)?.clone();
        if owner == Owner::Unassigned {
            return None;
        }
        self.move_between(task_id, &owner, &Owner::Unassigned, usize::MAX)
    }

    /// Empties one driver's list; every removed id is appended to the pool.
    pub fn clear(&mut self, driver_id: &str) -> Vec<Reassignment> {
        let owner = Owner::driver(driver_id);
        let Some(seq) = self.sequences.get_mut(&owner) else {
            return Vec::new();
        };
        let taken = std::mem::take(seq);
        if taken.is_empty() {
            return Vec::new();
        }

        let mut changes = Vec::with_capacity(taken.len());
        for id in taken {
            self.owners.insert(id.clone(), Owner::Unassigned);
            self.sequences
                .entry(Owner::Unassigned)
                .or_default()
                .push(id.clone());
            changes.push(Reassignment {
                task_id: id,
                from: owner.clone(),
                to: Owner::Unassigned,
            });
        }
        self.revision += 1;
        changes
    }

    /// Verifies the single-owner invariant and the owner index.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for (owner, seq) in &self.sequences {
            for id in seq {
                if !seen.insert(id) {
                    return Err(format!("task {} appears more than once", id));
                }
                if self.owners.get(id) != Some(owner) {
                    return Err(format!("owner index for {} disagrees with {}", id, owner));
                }
            }
        }
        if seen.len() != self.owners.len() {
            return Err(format!(
                "owner index has {} ids but lists hold {}",
                self.owners.len(),
                seen.len()
            ));
        }
        Ok(())
    }
}

fn seed_owner(name: Option<&str>, roster: &Roster, task_id: &str) -> Owner {
    let Some(name) = name else {
        return Owner::Unassigned;
    };
    match roster.find_by_name(name) {
        Some(driver) => Owner::Driver(driver.id.clone()),
        None => {
            log::warn!(
                "[LEDGER] Task {} names unknown driver \"{}\", leaving it unassigned",
                task_id,
                name
            );
            Owner::Unassigned
        }
    }
}
