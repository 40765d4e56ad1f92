// ── Generic reactive entity collection ──
//
// Concurrent keyed storage with O(1) lookups and push-based change
// notification via `watch` channels.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

/// A concurrent, reactive collection of one entity type.
///
/// Entities are stored as `Arc<T>` and replaced wholesale on update, so a
/// reader holding an `Arc` never observes a half-applied change. Every
/// mutation bumps a version counter and rebuilds the snapshot that
/// subscribers receive.
pub(crate) struct EntityCollection<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    by_key: DashMap<K, Arc<T>>,

    /// Version counter, bumped on every mutation.
    version: watch::Sender<u64>,

    /// Full snapshot, rebuilt on mutation for efficient subscription.
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<K, T> EntityCollection<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            by_key: DashMap::new(),
            version,
            snapshot,
        }
    }

    /// Insert or replace an entity. Returns `true` if the key was new.
    pub(crate) fn upsert(&self, key: K, entity: T) -> bool {
        let is_new = self.by_key.insert(key, Arc::new(entity)).is_none();

        self.rebuild_snapshot();
        self.bump_version();

        is_new
    }

    /// Remove an entity by key. Returns the removed entity if it existed.
    pub(crate) fn remove(&self, key: &K) -> Option<Arc<T>> {
        let removed = self.by_key.remove(key).map(|(_, v)| v);
        if removed.is_some() {
            self.rebuild_snapshot();
            self.bump_version();
        }
        removed
    }

    pub(crate) fn get(&self, key: &K) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.by_key.contains_key(key)
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// All current keys.
    pub(crate) fn keys(&self) -> Vec<K> {
        self.by_key.iter().map(|r| r.key().clone()).collect()
    }

    /// Number of mutations applied so far.
    pub(crate) fn version(&self) -> u64 {
        *self.version.borrow()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Collect all values into a snapshot vec and broadcast to subscribers.
    fn rebuild_snapshot(&self) {
        let values: Vec<Arc<T>> = self.by_key.iter().map(|r| Arc::clone(r.value())).collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn upsert_reports_new_keys() {
        let col: EntityCollection<u32, String> = EntityCollection::new();
        assert!(col.upsert(1, "hello".into()));
        assert!(!col.upsert(1, "world".into()));
        assert_eq!(*col.get(&1).unwrap(), "world");
        assert_eq!(col.len(), 1);
    }

    #[test]
    fn remove_only_bumps_on_hit() {
        let col: EntityCollection<u32, String> = EntityCollection::new();
        col.upsert(1, "a".into());
        let before = col.version();

        assert!(col.remove(&2).is_none());
        assert_eq!(col.version(), before);

        assert_eq!(*col.remove(&1).unwrap(), "a");
        assert_eq!(col.version(), before + 1);
        assert!(col.is_empty());
        assert!(!col.contains(&1));
    }

    #[test]
    fn held_arc_survives_replacement() {
        let col: EntityCollection<u32, String> = EntityCollection::new();
        col.upsert(1, "old".into());
        let held = col.get(&1).unwrap();

        col.upsert(1, "new".into());
        assert_eq!(*held, "old");
        assert_eq!(*col.get(&1).unwrap(), "new");
    }

    #[test]
    fn snapshot_and_subscribers_track_mutations() {
        let col: EntityCollection<u32, String> = EntityCollection::new();
        let rx = col.subscribe();
        assert!(col.snapshot().is_empty());

        col.upsert(1, "x".into());
        col.upsert(2, "y".into());

        assert_eq!(col.snapshot().len(), 2);
        assert_eq!(rx.borrow().len(), 2);
        let mut keys = col.keys();
        keys.sort_unstable();
        assert_eq!(keys, vec![1, 2]);
    }
}
