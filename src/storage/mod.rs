//! Key-value storage for whole-collection JSON blobs.
//!
//! Every persisted collection (users, quizzes, results, ...) lives under one
//! string key as a serialized JSON document. Backends only move those blobs
//! around; typed access lives in [`crate::store`].

mod memory;
mod postgres;

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored blob could not be (de)serialized.
    #[error("Serialization error for '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Get/set/remove of raw collection blobs by name.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Returns the blob stored under `key`, if any.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, replacing what was there.
    async fn set(&self, key: &str, value: String) -> StorageResult<()>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> StorageResult<()>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };

    use super::*;

    /// In-memory storage whose writes to keys with a given prefix fail while armed.
    #[derive(Clone)]
    pub(crate) struct FlakyStorage {
        inner: Arc<MemoryStorage>,
        prefix: &'static str,
        failing: Arc<AtomicBool>,
    }

    impl FlakyStorage {
        pub(crate) fn new(prefix: &'static str) -> Self {
            Self {
                inner: Arc::new(MemoryStorage::new()),
                prefix,
                failing: Arc::new(AtomicBool::new(true)),
            }
        }

        pub(crate) fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Storage for FlakyStorage {
        async fn get(&self, key: &str) -> StorageResult<Option<String>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: String) -> StorageResult<()> {
            if key.starts_with(self.prefix) && self.failing.load(Ordering::SeqCst) {
                return Err(StorageError::Database(sqlx::Error::PoolTimedOut));
            }
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> StorageResult<()> {
            self.inner.remove(key).await
        }
    }
}
