//! Read-through entity cache keyed by row id
//!
//! Populated on read, invalidated by every write that touches the row.

use dashmap::DashMap;
use std::sync::Arc;

#[derive(Debug)]
pub struct EntityCache<V> {
    entries: Arc<DashMap<i64, V>>,
}

impl<V> Clone for EntityCache<V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<V> Default for EntityCache<V> {
    fn default() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }
}

impl<V: Clone> EntityCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: i64) -> Option<V> {
        self.entries.get(&id).map(|entry| entry.value().clone())
    }

    pub fn put(&self, id: i64, value: V) {
        self.entries.insert(id, value);
    }

    pub fn invalidate(&self, id: i64) {
        self.entries.remove(&id);
    }

    /// Drop every entry matching `pred`
    pub fn invalidate_where(&self, pred: impl Fn(&V) -> bool) {
        self.entries.retain(|_, value| !pred(value));
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_invalidate() {
        let cache: EntityCache<String> = EntityCache::new();
        cache.put(1, "one".to_string());
        cache.put(2, "two".to_string());

        assert_eq!(cache.get(1).as_deref(), Some("one"));
        cache.invalidate(1);
        assert!(cache.get(1).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clones_share_entries() {
        let cache: EntityCache<u32> = EntityCache::new();
        let other = cache.clone();
        other.put(7, 42);
        assert_eq!(cache.get(7), Some(42));

        cache.invalidate_where(|v| *v == 42);
        assert!(other.is_empty());
    }
}
