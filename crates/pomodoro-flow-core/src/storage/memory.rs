use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::KeyValueStore;
use crate::error::StorageError;

/// In-memory store. Clones share the same map, so a test can keep one
/// handle for inspection while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner
            .lock()
            .map(|map| map.contains_key(key))
            .unwrap_or(false)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.inner.lock().map_err(|_| StorageError::Locked)
    }
}

impl KeyValueStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_raw(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_key(&mut self, key: &str) -> Result<(), StorageError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessors() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get_int("n").unwrap(), None);
        store.set_int("n", 42).unwrap();
        assert_eq!(store.get_int("n").unwrap(), Some(42));

        store.set_object("o", &serde_json::json!({"a": 1})).unwrap();
        assert_eq!(store.get_object("o").unwrap().unwrap()["a"], 1);

        store.remove_key("n").unwrap();
        assert!(!store.contains("n"));
    }

    #[test]
    fn garbage_reads_as_absent() {
        let mut store = MemoryStore::new();
        store.set_raw("n", "not a number").unwrap();
        assert_eq!(store.get_int("n").unwrap(), None);
        assert_eq!(store.get_object("n").unwrap(), None);
    }

    #[test]
    fn clones_share_state() {
        let mut a = MemoryStore::new();
        let b = a.clone();
        a.set_int("k", 1).unwrap();
        assert!(b.contains("k"));
    }
}
