//! Collections shared between lowering workers.
//!
//! Struct-copy helpers are requested from every worker thread, so the
//! registry backing them is a `dashmap::DashMap`.

use dashmap::DashMap;
use std::hash::Hash;

pub struct ConcurrentMap<K, V> {
    inner: DashMap<K, V>,
}

impl<K, V> Default for ConcurrentMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ConcurrentMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Find the value for `key`, creating it with `make` exactly once even when
    /// several threads ask at the same time.
    pub fn get_or_insert_with<F>(&self, key: K, make: F) -> V
    where
        V: Clone,
        F: FnOnce(&K) -> V,
    {
        let entry = self.inner.entry(key);
        match entry {
            dashmap::mapref::entry::Entry::Occupied(occupied) => occupied.get().clone(),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let value = make(vacant.key());
                vacant.insert(value.clone());
                value
            }
        }
    }

    /// Clone every value out, ordered by `key_fn`.
    pub fn values_sorted_by_key<O, F>(&self, mut key_fn: F) -> Vec<V>
    where
        V: Clone,
        O: Ord,
        F: FnMut(&V) -> O,
    {
        let mut values: Vec<V> = self.inner.iter().map(|entry| entry.value().clone()).collect();
        values.sort_by_key(|v| key_fn(v));
        values
    }
}
