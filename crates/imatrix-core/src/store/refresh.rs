// ── Discovery application logic ──
//
// Applies a discovery result to the DataStore. Repeated discovery with
// unchanged upstream data yields the same unique ids and no duplicates.

use std::collections::HashSet;

use chrono::Utc;

use super::DataStore;
use super::collection::EntityCollection;
use crate::discovery::{DiscoveredThing, build_entities};

/// Upsert all incoming items, then prune any existing keys not in the
/// incoming set. Avoids the brief empty state that `clear()` causes.
fn upsert_and_prune<T: Clone + Send + Sync + 'static>(
    collection: &EntityCollection<T>,
    items: Vec<(String, T)>,
) {
    let incoming_keys: HashSet<String> = items.iter().map(|(k, _)| k.clone()).collect();
    for (key, item) in items {
        collection.upsert(key, item);
    }
    for existing_key in collection.keys() {
        if !incoming_keys.contains(&existing_key) {
            collection.remove(&existing_key);
        }
    }
}

impl DataStore {
    /// Replace the store contents with a fresh discovery result.
    ///
    /// Returns the number of entities now held.
    pub fn apply_discovery(&self, discovered: &[DiscoveredThing]) -> usize {
        upsert_and_prune(
            &self.things,
            discovered
                .iter()
                .map(|d| (d.thing.sn.clone(), d.thing.clone()))
                .collect(),
        );
        upsert_and_prune(
            &self.entities,
            build_entities(discovered)
                .into_iter()
                .map(|e| (e.unique_id.clone(), e))
                .collect(),
        );
        self.last_discovery.send_replace(Some(Utc::now()));
        self.entities.len()
    }
}
