// src/store.rs

//! Typed, whole-collection access on top of a [`Storage`] backend.
//!
//! Collections are read in full, modified in memory and written back in full.
//! Mutations from this process are serialized by one async lock so two
//! requests cannot interleave their read-modify-write cycles.

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;

use crate::{
    models::{
        quiz::Quiz,
        result::QuizResult,
        user::{Session, Theme, User},
    },
    storage::{Storage, StorageError, StorageResult},
};

/// Fixed collection names.
pub mod keys {
    pub const USERS: &str = "users";
    pub const QUIZZES: &str = "quizzes";
    pub const RESULTS: &str = "results";
    pub const SESSIONS: &str = "sessions";

    /// Password sidecar entry of one user.
    pub fn password(user_id: &str) -> String {
        format!("password-{}", user_id)
    }

    /// Theme preference of one user.
    pub fn theme(user_id: &str) -> String {
        format!("theme-{}", user_id)
    }
}

#[derive(Clone)]
pub struct Stores {
    storage: Arc<dyn Storage>,
    write_lock: Arc<Mutex<()>>,
}

impl Stores {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Reads a single JSON value stored under `key`.
    pub async fn get_value<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.storage.get(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| StorageError::Serialization {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    /// Writes a single JSON value under `key`.
    pub async fn set_value<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        let raw = serde_json::to_string(value).map_err(|source| StorageError::Serialization {
            key: key.to_string(),
            source,
        })?;
        self.storage.set(key, raw).await
    }

    /// Reads a whole collection. A missing key is an empty collection.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Vec<T>> {
        Ok(self.get_value(key).await?.unwrap_or_default())
    }

    /// Read-modify-write of a whole collection.
    ///
    /// The collection is only written back when `f` returns `Ok`, so a
    /// rejected mutation never leaves a partial save behind.
    pub async fn update<T, R, E, F>(&self, key: &str, f: F) -> Result<R, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<StorageError>,
        F: FnOnce(&mut Vec<T>) -> Result<R, E>,
    {
        let _guard = self.write_lock.lock().await;
        let mut items: Vec<T> = self.load(key).await?;
        let out = f(&mut items)?;
        self.set_value(key, &items).await?;
        Ok(out)
    }

    pub async fn users(&self) -> StorageResult<Vec<User>> {
        self.load(keys::USERS).await
    }

    pub async fn find_user(&self, id: &str) -> StorageResult<Option<User>> {
        Ok(self.users().await?.into_iter().find(|u| u.id == id))
    }

    pub async fn find_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        Ok(self.users().await?.into_iter().find(|u| u.email == email))
    }

    /// Drops a user record and its password entry.
    pub async fn remove_user(&self, user_id: &str) -> StorageResult<()> {
        self.update(keys::USERS, |users: &mut Vec<User>| {
            users.retain(|u| u.id != user_id);
            Ok::<_, StorageError>(())
        })
        .await?;
        let _guard = self.write_lock.lock().await;
        self.storage.remove(&keys::password(user_id)).await
    }

    pub async fn password_hash(&self, user_id: &str) -> StorageResult<Option<String>> {
        self.get_value(&keys::password(user_id)).await
    }

    pub async fn set_password_hash(&self, user_id: &str, hash: &str) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        self.set_value(&keys::password(user_id), hash).await
    }

    pub async fn quizzes(&self) -> StorageResult<Vec<Quiz>> {
        self.load(keys::QUIZZES).await
    }

    pub async fn find_quiz(&self, id: &str) -> StorageResult<Option<Quiz>> {
        Ok(self.quizzes().await?.into_iter().find(|q| q.id == id))
    }

    pub async fn results(&self) -> StorageResult<Vec<QuizResult>> {
        self.load(keys::RESULTS).await
    }

    pub async fn append_result(&self, result: QuizResult) -> StorageResult<()> {
        self.update(keys::RESULTS, |results: &mut Vec<QuizResult>| {
            results.push(result);
            Ok::<_, StorageError>(())
        })
        .await
    }

    pub async fn sessions(&self) -> StorageResult<Vec<Session>> {
        self.load(keys::SESSIONS).await
    }

    pub async fn session_exists(&self, session_id: &str) -> StorageResult<bool> {
        Ok(self.sessions().await?.iter().any(|s| s.id == session_id))
    }

    pub async fn theme(&self, user_id: &str) -> StorageResult<Theme> {
        Ok(self.get_value(&keys::theme(user_id)).await?.unwrap_or_default())
    }

    pub async fn set_theme(&self, user_id: &str, theme: Theme) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        self.set_value(&keys::theme(user_id), &theme).await
    }
}
