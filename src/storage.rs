use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::types::{LastCompletedRoutine, User};

const TOKEN_KEY: &str = "dumbbell_token";
const USER_KEY: &str = "dumbbell_user";
const LAST_ROUTINE_PREFIX: &str = "dumbbell_last_routine_";

#[derive(Debug, Error, PartialEq)]
pub enum StorageError {
    #[error("storage is not available")]
    Unavailable,
    #[error("failed to write {0}")]
    Write(String),
    #[error("failed to serialize: {0}")]
    Serialize(String),
}

/// String key/value persistence. Implementations use interior mutability so a
/// store can be shared behind `Rc` by the auth controller and the views.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str);
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Rc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key)
    }
}

pub fn get_local_storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok()?
}

/// Browser `localStorage`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStorage;

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        get_local_storage()?.get_item(key).ok()?
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let storage = get_local_storage().ok_or(StorageError::Unavailable)?;
        storage
            .set_item(key, value)
            .map_err(|_| StorageError::Write(key.to_string()))
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = get_local_storage() {
            let _ = storage.remove_item(key);
        }
    }
}

/// In-process store, used where no browser storage exists.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.items.borrow_mut().remove(key);
    }
}

/// Typed view over the persisted session: token, cached user and the
/// per-user last completed routine.
#[derive(Clone, Debug)]
pub struct SessionStore<S> {
    store: S,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn token(&self) -> Option<String> {
        self.store.get(TOKEN_KEY).filter(|t| !t.trim().is_empty())
    }

    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    pub fn save_token(&self, token: &str) -> Result<(), StorageError> {
        self.store.set(TOKEN_KEY, token)
    }

    pub fn cached_user(&self) -> Option<User> {
        self.load_json(USER_KEY)
    }

    pub fn cache_user(&self, user: &User) -> Result<(), StorageError> {
        self.save_json(USER_KEY, user)
    }

    pub fn last_routine(&self, user_id: u64) -> Option<LastCompletedRoutine> {
        self.load_json(&last_routine_key(user_id))
    }

    pub fn save_last_routine(&self, user_id: u64, record: &LastCompletedRoutine) -> Result<(), StorageError> {
        self.save_json(&last_routine_key(user_id), record)
    }

    pub fn clear_last_routine(&self, user_id: u64) {
        self.store.remove(&last_routine_key(user_id));
    }

    /// Drops the token and cached user, plus the user's routine summary.
    pub fn clear_session(&self, user_id: Option<u64>) {
        if let Some(id) = user_id {
            self.clear_last_routine(id);
        }
        self.store.remove(TOKEN_KEY);
        self.store.remove(USER_KEY);
    }

    fn load_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let json = self.store.get(key)?;
        match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding unreadable stored value");
                self.store.remove(key);
                None
            }
        }
    }

    fn save_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string(value).map_err(|e| StorageError::Serialize(e.to_string()))?;
        self.store.set(key, &json)
    }
}

fn last_routine_key(user_id: u64) -> String {
    format!("{LAST_ROUTINE_PREFIX}{user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_record, sample_user};

    #[test]
    fn token_and_user_survive_in_store() {
        let session = SessionStore::new(MemoryStorage::new());
        assert!(!session.has_token());

        session.save_token("abc123").unwrap();
        session.cache_user(&sample_user()).unwrap();

        assert_eq!(session.token().as_deref(), Some("abc123"));
        assert_eq!(session.cached_user(), Some(sample_user()));
    }

    #[test]
    fn blank_token_counts_as_absent() {
        let session = SessionStore::new(MemoryStorage::new());
        session.save_token("  ").unwrap();
        assert!(!session.has_token());
    }

    #[test]
    fn last_routine_is_scoped_per_user() {
        let session = SessionStore::new(MemoryStorage::new());
        let record = sample_record(2, 4);
        session.save_last_routine(7, &record).unwrap();

        assert_eq!(session.last_routine(7), Some(record));
        assert_eq!(session.last_routine(8), None);
    }

    #[test]
    fn clear_session_removes_everything_for_that_user() {
        let storage = Rc::new(MemoryStorage::new());
        let session = SessionStore::new(storage.clone());
        session.save_token("abc").unwrap();
        session.cache_user(&sample_user()).unwrap();
        session.save_last_routine(7, &sample_record(1, 1)).unwrap();
        session.save_last_routine(8, &sample_record(1, 1)).unwrap();

        session.clear_session(Some(7));

        assert!(session.token().is_none());
        assert!(session.cached_user().is_none());
        assert!(session.last_routine(7).is_none());
        assert!(session.last_routine(8).is_some());
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn corrupt_cached_user_is_dropped() {
        let storage = Rc::new(MemoryStorage::new());
        storage.set(USER_KEY, "{not json").unwrap();
        let session = SessionStore::new(storage.clone());

        assert!(session.cached_user().is_none());
        assert!(storage.get(USER_KEY).is_none());
    }

    #[test]
    fn last_routine_uses_camel_case_keys() {
        let storage = Rc::new(MemoryStorage::new());
        let session = SessionStore::new(storage.clone());
        session.save_last_routine(3, &sample_record(2, 4)).unwrap();

        let raw = storage.get("dumbbell_last_routine_3").unwrap();
        assert!(raw.contains("\"exercisesCompleted\":2"));
        assert!(raw.contains("\"totalExercises\":4"));
        assert!(raw.contains("\"completedAt\""));
    }
}
