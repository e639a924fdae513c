//! App-Lifetime Lists
//!
//! Notifications and refill reminders live for the lifetime of the app and
//! are persisted as JSON through an injected [`KeyValueStore`]. There are no
//! transactional guarantees: each operation is read, modify, write.
//!
//! Hosts plug in whatever persistent store they have; tests use
//! [`MemoryKeyValueStore`].

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::SupplementId;

pub const NOTIFICATIONS_KEY: &str = "whatdose.notifications";
pub const REFILLS_KEY: &str = "whatdose.refills";

/// Oldest notifications are dropped beyond this many
pub const MAX_NOTIFICATIONS: usize = 50;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("corrupt value under {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode value for {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// String key-value persistence
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: String) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.values
            .lock()
            .map_err(|_| StorageError::Backend("memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.lock()?.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

fn load_list<T: DeserializeOwned, S: KeyValueStore>(store: &S, key: &str) -> Result<Vec<T>, StorageError> {
    match store.get(key)? {
        Some(raw) => serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
            key: key.to_string(),
            source,
        }),
        None => Ok(Vec::new()),
    }
}

fn save_list<T: Serialize, S: KeyValueStore>(store: &S, key: &str, items: &[T]) -> Result<(), StorageError> {
    let raw = serde_json::to_string(items).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.set(key, raw)
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    DoseReminder,
    RefillReminder,
    SafetyAlert,
    Community,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Newest-first notification list
pub struct NotificationInbox<S> {
    store: S,
}

impl<S: KeyValueStore> NotificationInbox<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Result<Vec<Notification>, StorageError> {
        load_list(&self.store, NOTIFICATIONS_KEY)
    }

    pub fn push(
        &self,
        kind: NotificationKind,
        title: impl Into<String>,
        body: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Notification, StorageError> {
        let mut items = self.list()?;
        let id = items.iter().map(|n| n.id).max().map_or(1, |max| max + 1);

        let notification = Notification {
            id,
            kind,
            title: title.into(),
            body: body.into(),
            read: false,
            created_at,
        };
        items.insert(0, notification.clone());
        items.truncate(MAX_NOTIFICATIONS);

        save_list(&self.store, NOTIFICATIONS_KEY, &items)?;
        Ok(notification)
    }

    /// Returns false when no notification has this id.
    pub fn mark_read(&self, id: u64) -> Result<bool, StorageError> {
        let mut items = self.list()?;
        let Some(item) = items.iter_mut().find(|n| n.id == id) else {
            return Ok(false);
        };
        item.read = true;
        save_list(&self.store, NOTIFICATIONS_KEY, &items)?;
        Ok(true)
    }

    pub fn mark_all_read(&self) -> Result<(), StorageError> {
        let mut items = self.list()?;
        items.iter_mut().for_each(|n| n.read = true);
        save_list(&self.store, NOTIFICATIONS_KEY, &items)
    }

    pub fn unread_count(&self) -> Result<usize, StorageError> {
        Ok(self.list()?.iter().filter(|n| !n.read).count())
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(NOTIFICATIONS_KEY)
    }
}

// ============================================================================
// Refill list
// ============================================================================

/// Supplements the user marked as running low
pub struct RefillList<S> {
    store: S,
}

impl<S: KeyValueStore> RefillList<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Result<Vec<SupplementId>, StorageError> {
        load_list(&self.store, REFILLS_KEY)
    }

    /// Returns false when the supplement was already listed.
    pub fn add(&self, id: SupplementId) -> Result<bool, StorageError> {
        let mut items = self.list()?;
        if items.contains(&id) {
            return Ok(false);
        }
        items.push(id);
        save_list(&self.store, REFILLS_KEY, &items)?;
        Ok(true)
    }

    /// Returns false when the supplement was not listed.
    pub fn remove(&self, id: SupplementId) -> Result<bool, StorageError> {
        let mut items = self.list()?;
        let before = items.len();
        items.retain(|item| *item != id);
        if items.len() == before {
            return Ok(false);
        }
        save_list(&self.store, REFILLS_KEY, &items)?;
        Ok(true)
    }

    pub fn contains(&self, id: SupplementId) -> Result<bool, StorageError> {
        Ok(self.list()?.contains(&id))
    }
}
