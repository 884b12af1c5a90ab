// ── Reactive keyed collection ──
//
// Concurrent storage with O(1) lookups and push-based change
// notification via `watch` channels.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

/// A concurrent, reactive collection keyed by string.
///
/// Every mutation rebuilds the snapshot that subscribers receive.
/// Snapshots are sorted by key so consumers see a stable order.
pub(crate) struct EntityCollection<T: Clone + Send + Sync + 'static> {
    by_key: DashMap<String, Arc<T>>,
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<T: Clone + Send + Sync + 'static> EntityCollection<T> {
    pub(crate) fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            by_key: DashMap::new(),
            snapshot,
        }
    }

    /// Insert or replace. Returns `true` if the key was new.
    pub(crate) fn upsert(&self, key: String, entity: T) -> bool {
        let is_new = self.by_key.insert(key, Arc::new(entity)).is_none();
        self.publish();
        is_new
    }

    /// Apply `f` to a copy of the entry and store the result.
    ///
    /// Returns `None` when the key is absent. The map guard is released
    /// before the snapshot is rebuilt.
    pub(crate) fn modify<R>(&self, key: &str, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let result = {
            let mut entry = self.by_key.get_mut(key)?;
            let mut updated = T::clone(entry.value());
            let result = f(&mut updated);
            *entry.value_mut() = Arc::new(updated);
            result
        };
        self.publish();
        Some(result)
    }

    pub(crate) fn remove(&self, key: &str) -> Option<Arc<T>> {
        let removed = self.by_key.remove(key).map(|(_, v)| v);
        if removed.is_some() {
            self.publish();
        }
        removed
    }

    pub(crate) fn get(&self, key: &str) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    /// Current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn clear(&self) {
        self.by_key.clear();
        self.publish();
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key.len()
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.by_key.iter().map(|r| r.key().clone()).collect()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Rebuild the snapshot under the watch write lock, so the last
    /// publisher always observes every map write that preceded it.
    fn publish(&self) {
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| {
            let mut values: Vec<(String, Arc<T>)> = self
                .by_key
                .iter()
                .map(|r| (r.key().clone(), Arc::clone(r.value())))
                .collect();
            values.sort_by(|a, b| a.0.cmp(&b.0));
            *snap = Arc::new(values.into_iter().map(|(_, v)| v).collect());
        });
    }
}
