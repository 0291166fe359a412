//! Process-local cache backend.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::domain::error::CacheError;
use crate::domain::ports::CacheBackend;

/// In-memory cache backend.
///
/// `set_many` holds the write lock for the whole batch, so readers observe
/// either none or all of its entries.
#[derive(Debug, Default)]
pub struct InMemoryCacheBackend {
    entries: RwLock<HashMap<String, serde_json::Value>>,
}

impl InMemoryCacheBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Removes one entry, returning whether it existed.
    pub fn remove(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Stored keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl CacheBackend for InMemoryCacheBackend {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), CacheError> {
        self.entries.write().insert(key.to_owned(), value);
        Ok(())
    }

    fn set_many(&self, entries: Vec<(String, serde_json::Value)>) -> Result<(), CacheError> {
        let mut guard = self.entries.write();
        guard.extend(entries);
        Ok(())
    }

    fn has(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.read().contains_key(key))
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.entries.write().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_get_clear() {
        let cache = InMemoryCacheBackend::new();
        assert!(cache.is_empty());
        assert_eq!(cache.get("manifest").unwrap(), None);

        cache.set("manifest", json!({"modules": {}})).unwrap();
        assert!(cache.has("manifest").unwrap());

        cache
            .set_many(vec![
                ("entity.A".to_owned(), json!(1)),
                ("entity.B".to_owned(), json!(2)),
            ])
            .unwrap();
        assert_eq!(cache.keys(), vec!["entity.A", "entity.B", "manifest"]);
        assert!(cache.remove("entity.A"));
        assert!(!cache.remove("entity.A"));

        cache.clear().unwrap();
        assert_eq!(cache.len(), 0);
        assert!(!cache.has("manifest").unwrap());
    }
}
