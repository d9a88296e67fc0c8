//! Subscription hub - realtime change fan-out.
//!
//! The store remains the source of truth; the hub only pushes committed
//! writes to whoever is listening. Publishing without subscribers is fine.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use taleweaver_core::repository::DocumentChanged;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Default per-document channel capacity.
pub const DEFAULT_CAPACITY: usize = 64;

/// Per-document broadcast channels, created lazily on first subscription.
#[derive(Debug)]
pub struct SubscriptionHub {
    channels: Mutex<HashMap<(String, Uuid), broadcast::Sender<DocumentChanged>>>,
    capacity: usize,
}

impl SubscriptionHub {
    /// Creates a hub whose channels buffer `capacity` notifications.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Subscribes to one document.
    pub fn subscribe(&self, collection: &str, id: Uuid) -> broadcast::Receiver<DocumentChanged> {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels
            .entry((collection.to_owned(), id))
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Publishes a committed change. Channels without receivers are dropped.
    pub fn publish(&self, change: DocumentChanged) {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        let key = (change.collection.clone(), change.id);
        let Some(sender) = channels.get(&key) else {
            return;
        };
        if sender.send(change).is_err() {
            channels.remove(&key);
        }
    }

    /// Number of documents with at least one live channel.
    pub fn channel_count(&self) -> usize {
        self.channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for SubscriptionHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
