use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::KeyValueStore;
use crate::error::{ClientError, Result};

/// An in-process store. Nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> Result<MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| ClientError::Storage("memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{get_json, set_json};

    #[test]
    fn test_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("user").unwrap(), None);

        store.set("user", "alice").unwrap();
        assert_eq!(store.get("user").unwrap().as_deref(), Some("alice"));

        store.remove("user").unwrap();
        store.remove("user").unwrap();
        assert_eq!(store.get("user").unwrap(), None);
    }

    #[test]
    fn test_json_helpers() {
        let store = MemoryStore::new();
        set_json(&store, "numbers", &vec![1, 2, 3]).unwrap();

        let numbers: Option<Vec<u32>> = get_json(&store, "numbers").unwrap();
        assert_eq!(numbers, Some(vec![1, 2, 3]));

        store.set("numbers", "{not json").unwrap();
        assert!(get_json::<Vec<u32>>(&store, "numbers").is_err());
    }
}
