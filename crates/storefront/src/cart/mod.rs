//! Cart store with change notifications.
//!
//! One [`CartStore`] is built at start-up and shared through `AppState`.
//! Every successful mutation persists the new list through the caller's
//! [`CartStorage`] and publishes a [`CartEvent`] on a broadcast channel.
//! HTTP handlers additionally answer with `HX-Trigger: cart-updated` so the
//! badge and preview fragments re-fetch.
//!
//! Each visitor writes only their own cart, so there is no locking: the last
//! write wins.

mod storage;

pub use storage::{CartStorage, MemoryCartStorage, SessionCartStorage, StorageError};

use evmarket_core::CartItem;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};

/// Notifications buffered per subscriber before old ones are dropped.
const EVENT_CAPACITY: usize = 64;

/// Errors from cart mutations. None of them leave a partial write behind.
#[derive(Debug, Error)]
pub enum CartError {
    /// The new list has more distinct lines than allowed.
    #[error("Your cart can hold at most {max} product(s). Remove one before adding another.")]
    TooManyLines { max: usize },

    /// No line at the requested position.
    #[error("No cart line at position {index} (cart has {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Persisting the cart failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// What kind of mutation produced a [`CartEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartChange {
    Replaced,
    Added,
    Incremented,
    Decremented,
    Removed,
    Cleared,
}

/// Published after every persisted cart change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartEvent {
    /// Visitor whose cart changed.
    pub owner: String,
    /// Number of distinct lines after the change.
    pub line_count: usize,
    pub change: CartChange,
}

/// Process-wide cart store.
#[derive(Debug, Clone)]
pub struct CartStore {
    max_lines: Option<usize>,
    events: broadcast::Sender<CartEvent>,
}

impl CartStore {
    /// Build a store. `max_lines` of `None` means no cap.
    #[must_use]
    pub fn new(max_lines: Option<usize>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { max_lines, events }
    }

    /// The configured line cap.
    #[must_use]
    pub const fn max_lines(&self) -> Option<usize> {
        self.max_lines
    }

    /// Receive change notifications from now on.
    ///
    /// Slow receivers lag and lose the oldest notifications instead of
    /// holding writers back.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.events.subscribe()
    }

    /// Read the persisted cart.
    ///
    /// Missing, unreadable or malformed state reads as an empty cart.
    #[instrument(skip_all, fields(owner = %storage.owner()))]
    pub async fn load<S: CartStorage>(&self, storage: &S) -> Vec<CartItem> {
        let raw = match storage.read().await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read cart, treating as empty");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<CartItem>>(&raw) {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "Discarding malformed persisted cart");
                Vec::new()
            }
        }
    }

    /// Persist `items` as the whole cart.
    ///
    /// # Errors
    ///
    /// [`CartError::TooManyLines`] when the list exceeds the cap (nothing is
    /// written), or [`CartError::Storage`] when persisting fails.
    pub async fn replace<S: CartStorage>(
        &self,
        storage: &S,
        items: Vec<CartItem>,
    ) -> Result<Vec<CartItem>, CartError> {
        self.commit(storage, items, CartChange::Replaced).await
    }

    /// Add a line, merging into an existing line for the same product and
    /// variant.
    ///
    /// # Errors
    ///
    /// Same as [`CartStore::replace`].
    #[instrument(skip_all, fields(owner = %storage.owner(), product_id = %item.id))]
    pub async fn add<S: CartStorage>(
        &self,
        storage: &S,
        item: CartItem,
    ) -> Result<Vec<CartItem>, CartError> {
        let mut items = self.load(storage).await;
        match items.iter_mut().find(|line| line.same_line(&item)) {
            Some(line) => line.quantity = line.quantity.merged(item.quantity),
            None => items.push(item),
        }
        self.commit(storage, items, CartChange::Added).await
    }

    /// One more unit on the line at `index`.
    ///
    /// # Errors
    ///
    /// [`CartError::IndexOutOfRange`] or any error from [`CartStore::replace`].
    #[instrument(skip_all, fields(owner = %storage.owner(), index = index))]
    pub async fn increment<S: CartStorage>(
        &self,
        storage: &S,
        index: usize,
    ) -> Result<Vec<CartItem>, CartError> {
        let mut items = self.load(storage).await;
        let len = items.len();
        let line = items
            .get_mut(index)
            .ok_or(CartError::IndexOutOfRange { index, len })?;
        line.quantity = line.quantity.incremented();
        self.commit(storage, items, CartChange::Incremented).await
    }

    /// One fewer unit on the line at `index`.
    ///
    /// A line already at one unit is left alone: nothing is written and no
    /// notification is sent.
    ///
    /// # Errors
    ///
    /// [`CartError::IndexOutOfRange`] or any error from [`CartStore::replace`].
    #[instrument(skip_all, fields(owner = %storage.owner(), index = index))]
    pub async fn decrement<S: CartStorage>(
        &self,
        storage: &S,
        index: usize,
    ) -> Result<Vec<CartItem>, CartError> {
        let mut items = self.load(storage).await;
        let len = items.len();
        let line = items
            .get_mut(index)
            .ok_or(CartError::IndexOutOfRange { index, len })?;
        let Some(quantity) = line.quantity.decremented() else {
            debug!("Quantity already at one");
            return Ok(items);
        };
        line.quantity = quantity;
        self.commit(storage, items, CartChange::Decremented).await
    }

    /// Delete the line at `index`, keeping the others in order.
    ///
    /// # Errors
    ///
    /// [`CartError::IndexOutOfRange`] or any error from [`CartStore::replace`].
    #[instrument(skip_all, fields(owner = %storage.owner(), index = index))]
    pub async fn remove_at<S: CartStorage>(
        &self,
        storage: &S,
        index: usize,
    ) -> Result<Vec<CartItem>, CartError> {
        let mut items = self.load(storage).await;
        if index >= items.len() {
            return Err(CartError::IndexOutOfRange {
                index,
                len: items.len(),
            });
        }
        items.remove(index);
        self.commit(storage, items, CartChange::Removed).await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// [`CartError::Storage`] when persisting fails.
    pub async fn clear<S: CartStorage>(&self, storage: &S) -> Result<(), CartError> {
        self.commit(storage, Vec::new(), CartChange::Cleared)
            .await
            .map(|_| ())
    }

    async fn commit<S: CartStorage>(
        &self,
        storage: &S,
        items: Vec<CartItem>,
        change: CartChange,
    ) -> Result<Vec<CartItem>, CartError> {
        if let Some(max) = self.max_lines
            && items.len() > max
        {
            return Err(CartError::TooManyLines { max });
        }

        let raw = serde_json::to_string(&items).map_err(StorageError::from)?;
        storage.write(raw).await?;

        let event = CartEvent {
            owner: storage.owner(),
            line_count: items.len(),
            change,
        };
        debug!(?event, "Cart updated");
        // No subscribers is fine.
        let _ = self.events.send(event);

        Ok(items)
    }
}
