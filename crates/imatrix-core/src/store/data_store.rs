// ── Central reactive data store ──
//
// Thread-safe storage for the discovered things and their entities.
// Poll tasks mutate only their own entity entry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::collection::EntityCollection;
use crate::model::{Entity, Thing};

/// Central reactive store for one account.
///
/// Reads never block writers; writes take a per-shard lock inside
/// `DashMap`. Mutations are broadcast to subscribers via `watch` channels.
pub struct DataStore {
    pub(crate) things: EntityCollection<Thing>,
    pub(crate) entities: EntityCollection<Entity>,
    pub(crate) last_discovery: watch::Sender<Option<DateTime<Utc>>>,
}

impl DataStore {
    pub fn new() -> Self {
        let (last_discovery, _) = watch::channel(None);

        Self {
            things: EntityCollection::new(),
            entities: EntityCollection::new(),
            last_discovery,
        }
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn things_snapshot(&self) -> Arc<Vec<Arc<Thing>>> {
        self.things.snapshot()
    }

    pub fn entities_snapshot(&self) -> Arc<Vec<Arc<Entity>>> {
        self.entities.snapshot()
    }

    // ── Single-entity lookups ────────────────────────────────────────

    pub fn entity(&self, unique_id: &str) -> Option<Arc<Entity>> {
        self.entities.get(unique_id)
    }

    pub fn thing(&self, sn: &str) -> Option<Arc<Thing>> {
        self.things.get(sn)
    }

    /// Unique ids of every entity belonging to one thing.
    pub fn entity_ids_for_thing(&self, sn: &str) -> Vec<String> {
        self.entities
            .snapshot()
            .iter()
            .filter(|e| e.thing_sn == sn)
            .map(|e| e.unique_id.clone())
            .collect()
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Mutate one entity in place. `None` when it no longer exists.
    pub(crate) fn update_entity<R>(
        &self,
        unique_id: &str,
        f: impl FnOnce(&mut Entity) -> R,
    ) -> Option<R> {
        self.entities.modify(unique_id, f)
    }

    /// Drop everything. Used on unload.
    pub(crate) fn clear(&self) {
        self.entities.clear();
        self.things.clear();
        self.last_discovery.send_replace(None);
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_entities(&self) -> watch::Receiver<Arc<Vec<Arc<Entity>>>> {
        self.entities.subscribe()
    }

    // ── Metadata ─────────────────────────────────────────────────────

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn last_discovery(&self) -> Option<DateTime<Utc>> {
        *self.last_discovery.borrow()
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}
