//! Where a visitor's cart is persisted.
//!
//! The store never looks storage up on its own; handlers pass the visitor's
//! storage into every call. In the web app that is the visitor's session,
//! in tests it is an in-memory slot.

use std::future::Future;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tower_sessions::Session;

use crate::models::session_keys;

/// Failure reading or writing persisted cart state.
#[derive(Debug, Error)]
#[error("cart storage error: {0}")]
pub struct StorageError(String);

impl From<tower_sessions::session::Error> for StorageError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self(err.to_string())
    }
}

/// Persisted cart slot for one visitor.
///
/// The slot holds the raw JSON text of the cart so that malformed data left
/// by an older client can be detected and discarded by the store.
pub trait CartStorage: Send + Sync {
    /// Identifies the visitor in change notifications.
    fn owner(&self) -> String;

    /// Read the raw persisted value, `None` when nothing was written yet.
    fn read(&self) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Overwrite the persisted value.
    fn write(&self, raw: String) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Cart persisted in the visitor's server-side session.
pub struct SessionCartStorage<'a> {
    session: &'a Session,
}

impl<'a> SessionCartStorage<'a> {
    #[must_use]
    pub const fn new(session: &'a Session) -> Self {
        Self { session }
    }
}

impl CartStorage for SessionCartStorage<'_> {
    fn owner(&self) -> String {
        self.session
            .id()
            .map_or_else(|| "new-session".to_string(), |id| id.to_string())
    }

    async fn read(&self) -> Result<Option<String>, StorageError> {
        Ok(self.session.get::<String>(session_keys::CART).await?)
    }

    async fn write(&self, raw: String) -> Result<(), StorageError> {
        self.session.insert(session_keys::CART, raw).await?;
        Ok(())
    }
}

/// In-memory cart slot, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryCartStorage {
    owner: String,
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryCartStorage {
    /// An empty slot owned by `owner`.
    #[must_use]
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            slot: Arc::default(),
        }
    }

    /// A slot pre-filled with raw persisted text.
    #[must_use]
    pub fn with_raw(owner: impl Into<String>, raw: impl Into<String>) -> Self {
        let storage = Self::new(owner);
        if let Ok(mut slot) = storage.slot.lock() {
            *slot = Some(raw.into());
        }
        storage
    }

    /// The raw persisted text, if any.
    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl CartStorage for MemoryCartStorage {
    fn owner(&self) -> String {
        self.owner.clone()
    }

    async fn read(&self) -> Result<Option<String>, StorageError> {
        self.slot
            .lock()
            .map(|slot| slot.clone())
            .map_err(|e| StorageError(e.to_string()))
    }

    async fn write(&self, raw: String) -> Result<(), StorageError> {
        let mut slot = self.slot.lock().map_err(|e| StorageError(e.to_string()))?;
        *slot = Some(raw);
        Ok(())
    }
}
