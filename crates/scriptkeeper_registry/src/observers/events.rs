//! Lifecycle events emitted by the registry.
//!
//! Observers receive `&RegistryEvent` and match on the variants they care about.
//!
//! # Example
//!
//! ```
//! use scriptkeeper_registry::observers::RegistryEvent;
//!
//! fn handle_event(event: &RegistryEvent) {
//!     match event {
//!         RegistryEvent::FetchStarted { key } => println!("fetching {key}"),
//!         RegistryEvent::FetchFailed { key, reason, .. } => println!("{key} failed: {reason}"),
//!         _ => {}
//!     }
//! }
//! ```

use std::sync::Arc;

use crate::key::ResourceKey;
use crate::registry::SubscriberId;

/// Unified event enum for registry lifecycle observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    // ─────────────────────────────────────────────────────────────────────────
    // Subscriber Events
    // ─────────────────────────────────────────────────────────────────────────
    /// A subscriber was registered for a key.
    SubscriberAdded {
        /// The key subscribed to.
        key: ResourceKey,
        /// The new subscriber.
        subscriber: SubscriberId,
        /// Subscriber count after the addition.
        subscribers: usize,
    },

    /// A subscriber was removed from a key.
    SubscriberRemoved {
        /// The key unsubscribed from.
        key: ResourceKey,
        /// The removed subscriber.
        subscriber: SubscriberId,
        /// Subscriber count after the removal.
        subscribers: usize,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Fetch Events
    // ─────────────────────────────────────────────────────────────────────────
    /// A new record was created and its fetch is about to start.
    FetchStarted {
        /// The key being fetched.
        key: ResourceKey,
    },

    /// A fetch completed successfully.
    FetchSucceeded {
        /// The key that loaded.
        key: ResourceKey,
        /// Number of subscribers notified.
        subscribers: usize,
    },

    /// A fetch failed.
    FetchFailed {
        /// The key that failed.
        key: ResourceKey,
        /// The failure description delivered to subscribers.
        reason: Arc<str>,
        /// Number of subscribers notified.
        subscribers: usize,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Teardown Events
    // ─────────────────────────────────────────────────────────────────────────
    /// A record was removed and its resource handle detached.
    RecordRemoved {
        /// The key whose record was removed.
        key: ResourceKey,
    },
}

impl RegistryEvent {
    /// Returns the key this event concerns.
    #[must_use]
    pub fn key(&self) -> &ResourceKey {
        match self {
            Self::SubscriberAdded { key, .. }
            | Self::SubscriberRemoved { key, .. }
            | Self::FetchStarted { key }
            | Self::FetchSucceeded { key, .. }
            | Self::FetchFailed { key, .. }
            | Self::RecordRemoved { key } => key,
        }
    }

    /// Returns a short name for the event kind, for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SubscriberAdded { .. } => "SubscriberAdded",
            Self::SubscriberRemoved { .. } => "SubscriberRemoved",
            Self::FetchStarted { .. } => "FetchStarted",
            Self::FetchSucceeded { .. } => "FetchSucceeded",
            Self::FetchFailed { .. } => "FetchFailed",
            Self::RecordRemoved { .. } => "RecordRemoved",
        }
    }
}
