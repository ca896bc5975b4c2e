//! At most one in-flight computation per key.
//!
//! Callers racing on the same key share one computation: the first caller
//! computes while the rest block on the slot's mutex and then read the stored
//! result.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

#[derive(Debug)]
pub struct SingleFlight<K, V>
where
    K: Eq + Hash,
{
    slots: DashMap<K, Arc<Mutex<Option<V>>>>,
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `compute` for `key` unless another caller is already doing so, in
    /// which case wait for and return its result.
    pub fn run(&self, key: K, compute: impl FnOnce() -> V) -> V {
        // Clone the slot out so the shard lock is released before blocking.
        let slot = self.slots.entry(key.clone()).or_default().clone();

        let mut guard = slot.lock();
        if let Some(done) = guard.as_ref() {
            return done.clone();
        }
        let value = compute();
        *guard = Some(value.clone());
        drop(guard);

        // Later callers recompute against the cache rather than a stale slot.
        self.slots.remove_if(&key, |_, current| Arc::ptr_eq(current, &slot));
        value
    }

    pub fn in_flight(&self) -> usize {
        self.slots.len()
    }
}
