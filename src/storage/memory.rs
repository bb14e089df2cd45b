//! In-memory storage backend for tests and local development.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Storage, StorageResult};

#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> StorageResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("users").await.unwrap(), None);

        storage.set("users", "[]".to_string()).await.unwrap();
        assert_eq!(storage.get("users").await.unwrap().as_deref(), Some("[]"));

        storage.set("users", "[1]".to_string()).await.unwrap();
        assert_eq!(storage.get("users").await.unwrap().as_deref(), Some("[1]"));

        storage.remove("users").await.unwrap();
        assert_eq!(storage.get("users").await.unwrap(), None);

        // Removing twice is fine
        storage.remove("users").await.unwrap();
    }
}
