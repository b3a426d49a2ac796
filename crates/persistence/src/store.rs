//! Shared optimistic-concurrency helper used by every repository in this
//! crate. A write supplies the version it last read; the store only applies
//! the write if that matches the currently stored version, then bumps the
//! stored version by exactly one.

use dashmap::DashMap;
use lexiscribe_core::{Error, Result};
use std::hash::Hash;

pub struct VersionedStore<K, V> {
    rows: DashMap<K, V>,
}

impl<K, V> VersionedStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self { rows: DashMap::new() }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.rows.get(key).map(|r| r.clone())
    }

    pub fn insert(&self, key: K, value: V) {
        self.rows.insert(key, value);
    }

    pub fn remove(&self, key: &K) {
        self.rows.remove(key);
    }

    pub fn values(&self) -> Vec<V> {
        self.rows.iter().map(|r| r.value().clone()).collect()
    }

    /// Applies `mutate` to the row at `key` iff `current_version(&row) ==
    /// expected_version`, then calls `bump_version` to persist the
    /// incremented value. Returns the updated row, or
    /// `Err(VersionConflict)` if the version check failed, or
    /// `Err(NotFound)` if the key is absent.
    pub fn compare_and_update<F, G>(
        &self,
        key: &K,
        expected_version: u64,
        current_version: G,
        mutate: F,
    ) -> Result<V>
    where
        F: FnOnce(&mut V),
        G: Fn(&V) -> u64,
    {
        let mut entry = self.rows.get_mut(key).ok_or(Error::NotFound)?;
        let actual = current_version(&entry);
        if actual != expected_version {
            return Err(Error::VersionConflict { expected: expected_version, actual });
        }
        mutate(&mut entry);
        Ok(entry.clone())
    }
}

impl<K, V> Default for VersionedStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
