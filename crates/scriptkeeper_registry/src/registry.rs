//! The shared loading registry.
//!
//! [`Registry`] tracks one loading record per [`ResourceKey`]. The first
//! subscriber to a key creates the record and starts the fetch; later
//! subscribers share it. When the last subscriber leaves a settled record, the
//! resource handle is detached and the record is dropped, so the next request
//! for that key starts over with a fresh fetch.
//!
//! # Locking
//!
//! Two locks guard the registry:
//!
//! - `state` (a [`Mutex`]) protects the records. It is held only for short
//!   bookkeeping sections and never while callbacks, observers or the fetcher
//!   run.
//! - `dispatch` (a [`ReentrantMutex`]) serializes notifications. Subscribe,
//!   unsubscribe and completion all hold it, so a subscriber sees statuses in
//!   order. Because it is re-entrant, a callback may subscribe or unsubscribe
//!   from inside a notification on the same thread.
//!
//! A completion notifies a snapshot of the subscribers taken before the first
//! callback runs. A subscriber removed by another callback during that fan-out
//! still receives the status being delivered; it hears nothing after that.
//!
//! # Example
//!
//! ```ignore
//! use scriptkeeper_registry::{LoadStatus, Registry, ResourceKey};
//! use scriptkeeper_registry::testing::ManualFetcher;
//!
//! let fetcher = ManualFetcher::new();
//! let registry = Registry::new(fetcher.clone());
//! let key = ResourceKey::new("https://x/s.js").unwrap();
//!
//! let first = registry.subscribe(key.clone(), |_status: &LoadStatus| {});
//! let second = registry.subscribe(key.clone(), |_status: &LoadStatus| {});
//! assert_eq!(fetcher.fetch_count("https://x/s.js"), 1);
//!
//! fetcher.succeed("https://x/s.js");
//! assert_eq!(registry.status("https://x/s.js"), Some(LoadStatus::Loaded));
//!
//! registry.unsubscribe(&key, first.id);
//! registry.unsubscribe(&key, second.id);
//! assert!(!registry.contains("https://x/s.js"));
//! ```

use core::fmt;
use std::sync::{Arc, OnceLock};

use hashbrown::HashMap;
use parking_lot::{Mutex, ReentrantMutex};

use crate::error::{ObserverRegistrationError, RegistryError};
use crate::fetcher::{FetchCompletion, Outcome, ResourceFetcher, ResourceHandle};
use crate::key::ResourceKey;
use crate::observers::{RegistryEvent, RegistryObservers};
use crate::status::LoadStatus;
use crate::subscription::ScriptSubscription;

static GLOBAL: OnceLock<Registry> = OnceLock::new();

type Callback = Arc<dyn Fn(&LoadStatus) + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// Identifiers
// ─────────────────────────────────────────────────────────────────────────────

/// Identity of one subscriber registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Returns the raw ID value.
    #[must_use]
    pub fn index(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscriber_{}", self.0)
    }
}

/// Identity of one loading record, distinguishing successive records for the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct RecordId(u64);

/// Result of [`Registry::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    /// Identity to pass to [`Registry::unsubscribe`].
    pub id: SubscriberId,
    /// Status of the record at the moment of registration.
    pub status: LoadStatus,
}

// ─────────────────────────────────────────────────────────────────────────────
// LoadingRecord
// ─────────────────────────────────────────────────────────────────────────────

/// Registry-owned state for one key.
struct LoadingRecord {
    id: RecordId,
    /// The failure description lives inside `LoadStatus::Failed`.
    status: LoadStatus,
    /// `None` until the fetcher returns.
    handle: Option<Box<dyn ResourceHandle>>,
    subscribers: HashMap<SubscriberId, Callback>,
}

impl LoadingRecord {
    fn new(id: RecordId) -> Self {
        Self {
            id,
            status: LoadStatus::Pending,
            handle: None,
            subscribers: HashMap::new(),
        }
    }

    fn is_collectable(&self) -> bool {
        self.subscribers.is_empty() && self.status.is_terminal()
    }

    fn callbacks(&self) -> Vec<Callback> {
        self.subscribers.values().cloned().collect()
    }
}

#[derive(Default)]
struct RegistryState {
    records: HashMap<ResourceKey, LoadingRecord>,
    next_subscriber: u64,
    next_record: u64,
}

impl RegistryState {
    fn allocate_subscriber(&mut self) -> SubscriberId {
        let id = SubscriberId(self.next_subscriber);
        self.next_subscriber += 1;
        id
    }

    /// Removes the record for `key` if it is still `record` and nothing holds on to it.
    fn take_if_collectable(&mut self, key: &ResourceKey, record: RecordId) -> Option<LoadingRecord> {
        let collectable = self
            .records
            .get(key)
            .is_some_and(|entry| entry.id == record && entry.is_collectable());
        if collectable {
            self.records.remove(key)
        } else {
            None
        }
    }
}

pub(crate) struct RegistryInner {
    fetcher: Arc<dyn ResourceFetcher>,
    state: Mutex<RegistryState>,
    dispatch: ReentrantMutex<()>,
    observers: RegistryObservers,
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// De-duplicating, reference-counted registry of script loads.
///
/// `Registry` is a cheap handle: clones share the same records. Use
/// [`install_global`](Self::install_global) to expose one instance process-wide.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    /// Creates a registry that starts loads through `fetcher`.
    #[must_use]
    pub fn new(fetcher: impl ResourceFetcher) -> Self {
        Self::with_fetcher(Arc::new(fetcher))
    }

    /// Creates a registry from a shared fetcher.
    #[must_use]
    pub fn with_fetcher(fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                fetcher,
                state: Mutex::new(RegistryState::default()),
                dispatch: ReentrantMutex::new(()),
                observers: RegistryObservers::new(),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<RegistryInner>) -> Self {
        Self { inner }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Process-wide instance
    // ─────────────────────────────────────────────────────────────────────

    /// Installs `registry` as the process-wide instance.
    ///
    /// The global registry lives for the rest of the process.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AlreadyInstalled`] if a global registry exists.
    pub fn install_global(registry: Registry) -> Result<&'static Registry, RegistryError> {
        let mut installed = false;
        let global = GLOBAL.get_or_init(|| {
            installed = true;
            registry
        });

        if installed {
            tracing::debug!("global script registry installed");
            Ok(global)
        } else {
            Err(RegistryError::AlreadyInstalled)
        }
    }

    /// Returns the process-wide instance, if one was installed.
    #[must_use]
    pub fn global() -> Option<&'static Registry> {
        GLOBAL.get()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Subscription
    // ─────────────────────────────────────────────────────────────────────

    /// Registers `callback` for status changes of `key`.
    ///
    /// Creates the record and starts the fetch if this is the first
    /// subscriber; otherwise joins the existing record. In both cases the
    /// callback is invoked once immediately with the current status, so a late
    /// subscriber to a settled record sees the outcome without waiting.
    ///
    /// The returned status is the one at registration time. A fetcher that
    /// completes synchronously may already have moved the record on by the
    /// time this returns; the callback always receives the newer status.
    pub fn subscribe<F>(&self, key: ResourceKey, callback: F) -> Subscriber
    where
        F: Fn(&LoadStatus) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);

        let (subscriber, created) = {
            let _dispatch = self.inner.dispatch.lock();

            let (subscriber, status, subscribers, created) = {
                let mut guard = self.inner.state.lock();
                let state = &mut *guard;

                let id = state.allocate_subscriber();
                let next_record = RecordId(state.next_record);
                let mut created = None;
                let record = state.records.entry(key.clone()).or_insert_with(|| {
                    created = Some(next_record);
                    LoadingRecord::new(next_record)
                });
                record.subscribers.insert(id, Arc::clone(&callback));
                let status = record.status.clone();
                let subscribers = record.subscribers.len();

                if created.is_some() {
                    state.next_record += 1;
                }
                (id, status, subscribers, created)
            };

            tracing::debug!(%key, %subscriber, subscribers, "subscriber added");
            self.inner.observers.notify(&RegistryEvent::SubscriberAdded {
                key: key.clone(),
                subscriber,
                subscribers,
            });

            callback(&status);

            (
                Subscriber {
                    id: subscriber,
                    status,
                },
                created,
            )
        };

        if let Some(record) = created {
            self.start_fetch(&key, record);
        }

        subscriber
    }

    /// Removes a subscriber from `key`.
    ///
    /// When the last subscriber leaves a settled record, the resource handle is
    /// detached and the record removed. A pending record is kept until its
    /// fetch completes.
    ///
    /// Returns `false` if the key or subscriber is unknown.
    pub fn unsubscribe(&self, key: &ResourceKey, subscriber: SubscriberId) -> bool {
        let _dispatch = self.inner.dispatch.lock();

        let (subscribers, removed) = {
            let mut state = self.inner.state.lock();
            let Some(record) = state.records.get_mut(key) else {
                return false;
            };
            if record.subscribers.remove(&subscriber).is_none() {
                return false;
            }
            let subscribers = record.subscribers.len();
            let record_id = record.id;
            (subscribers, state.take_if_collectable(key, record_id))
        };

        tracing::debug!(%key, %subscriber, subscribers, "subscriber removed");
        self.inner.observers.notify(&RegistryEvent::SubscriberRemoved {
            key: key.clone(),
            subscriber,
            subscribers,
        });

        if subscribers == 0 && removed.is_none() {
            tracing::debug!(%key, "last subscriber left while pending; keeping in-flight fetch");
        }
        if let Some(record) = removed {
            self.teardown(key, record);
        }
        true
    }

    /// Returns a subscription handle for `key`.
    ///
    /// An absent or empty key yields an idle handle that never touches the registry.
    #[must_use]
    pub fn use_script(&self, key: Option<&str>) -> ScriptSubscription {
        let mut subscription = ScriptSubscription::new(self.clone());
        subscription.set_key(key);
        subscription
    }

    // ─────────────────────────────────────────────────────────────────────
    // Observers
    // ─────────────────────────────────────────────────────────────────────

    /// Registers a named lifecycle observer.
    ///
    /// # Errors
    ///
    /// Returns [`ObserverRegistrationError::DuplicateName`] if the name is taken.
    pub fn register_observer<F>(
        &self,
        name: impl Into<String>,
        observer: F,
    ) -> Result<&Self, ObserverRegistrationError>
    where
        F: Fn(&RegistryEvent) + Send + Sync + 'static,
    {
        self.inner.observers.register(name, observer)?;
        Ok(self)
    }

    /// Returns the observer list.
    #[must_use]
    pub fn observers(&self) -> &RegistryObservers {
        &self.inner.observers
    }

    // ─────────────────────────────────────────────────────────────────────
    // Inspection
    // ─────────────────────────────────────────────────────────────────────

    /// Returns the number of live records.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.inner.state.lock().records.len()
    }

    /// Returns `true` if a record exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.state.lock().records.contains_key(key)
    }

    /// Returns the status of the record for `key`.
    #[must_use]
    pub fn status(&self, key: &str) -> Option<LoadStatus> {
        self.inner
            .state
            .lock()
            .records
            .get(key)
            .map(|record| record.status.clone())
    }

    /// Returns the number of subscribers of `key`, or 0 if there is no record.
    #[must_use]
    pub fn subscriber_count(&self, key: &str) -> usize {
        self.inner
            .state
            .lock()
            .records
            .get(key)
            .map_or(0, |record| record.subscribers.len())
    }

    /// Lists the keys of all live records.
    #[must_use]
    pub fn keys(&self) -> Vec<ResourceKey> {
        self.inner.state.lock().records.keys().cloned().collect()
    }

    /// Drops every record, detaching all resource handles.
    ///
    /// Completions of fetches that were still in flight become no-ops.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn reset(&self) {
        let _dispatch = self.inner.dispatch.lock();
        let records: Vec<(ResourceKey, LoadingRecord)> =
            self.inner.state.lock().records.drain().collect();

        tracing::debug!(records = records.len(), "registry reset");
        for (key, record) in records {
            self.teardown(&key, record);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Fetch protocol
    // ─────────────────────────────────────────────────────────────────────

    fn start_fetch(&self, key: &ResourceKey, record: RecordId) {
        tracing::info!(%key, "fetch started");
        self.inner
            .observers
            .notify(&RegistryEvent::FetchStarted { key: key.clone() });

        let completion = FetchCompletion::new(Arc::downgrade(&self.inner), key.clone(), record);
        let handle = self.inner.fetcher.fetch(key, completion);
        self.attach_handle(key, record, handle);
    }

    /// Stores the fetcher's handle on its record, or detaches it if the record is gone.
    fn attach_handle(&self, key: &ResourceKey, record: RecordId, mut handle: Box<dyn ResourceHandle>) {
        {
            let mut state = self.inner.state.lock();
            if let Some(entry) = state.records.get_mut(key)
                && entry.id == record
            {
                entry.handle = Some(handle);
                return;
            }
        }

        tracing::debug!(%key, "record removed before its handle was attached");
        handle.detach();
    }

    pub(crate) fn complete(&self, key: &ResourceKey, record: RecordId, outcome: Outcome) {
        let _dispatch = self.inner.dispatch.lock();

        let (status, callbacks) = {
            let mut state = self.inner.state.lock();
            let Some(entry) = state.records.get_mut(key) else {
                tracing::debug!(%key, "completion for a removed record ignored");
                return;
            };
            if entry.id != record {
                tracing::debug!(%key, "completion for a superseded record ignored");
                return;
            }
            if entry.status.is_terminal() {
                tracing::debug!(%key, "completion for a settled record ignored");
                return;
            }

            entry.status = match outcome {
                Outcome::Loaded => LoadStatus::Loaded,
                Outcome::Failed(reason) => LoadStatus::Failed(reason),
            };
            (entry.status.clone(), entry.callbacks())
        };

        let subscribers = callbacks.len();
        let event = match &status {
            LoadStatus::Failed(reason) => {
                tracing::warn!(%key, %reason, subscribers, "fetch failed");
                RegistryEvent::FetchFailed {
                    key: key.clone(),
                    reason: Arc::clone(reason),
                    subscribers,
                }
            }
            LoadStatus::Loaded | LoadStatus::Pending => {
                tracing::info!(%key, subscribers, "fetch succeeded");
                RegistryEvent::FetchSucceeded {
                    key: key.clone(),
                    subscribers,
                }
            }
        };
        self.inner.observers.notify(&event);

        for callback in callbacks {
            callback(&status);
        }

        // Everyone may have left while the fetch was in flight.
        let removed = self.inner.state.lock().take_if_collectable(key, record);
        if let Some(entry) = removed {
            self.teardown(key, entry);
        }
    }

    fn teardown(&self, key: &ResourceKey, record: LoadingRecord) {
        if let Some(mut handle) = record.handle {
            handle.detach();
        }
        tracing::debug!(%key, "record removed");
        self.inner
            .observers
            .notify(&RegistryEvent::RecordRemoved { key: key.clone() });
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("records", &self.keys())
            .field("observers", &self.inner.observers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ManualFetcher;
    use std::sync::Mutex as StdMutex;

    fn key(url: &str) -> ResourceKey {
        ResourceKey::new(url).unwrap()
    }

    fn recorder() -> (Arc<StdMutex<Vec<LoadStatus>>>, impl Fn(&LoadStatus) + Send + Sync + 'static) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        (seen, move |status: &LoadStatus| {
            seen_clone.lock().unwrap().push(status.clone());
        })
    }

    #[test]
    fn first_subscriber_creates_record_and_fetches() {
        let fetcher = ManualFetcher::new();
        let registry = Registry::new(fetcher.clone());

        let subscriber = registry.subscribe(key("https://x/s.js"), |_: &LoadStatus| {});

        assert_eq!(subscriber.status, LoadStatus::Pending);
        assert_eq!(registry.record_count(), 1);
        assert_eq!(registry.subscriber_count("https://x/s.js"), 1);
        assert_eq!(fetcher.fetch_count("https://x/s.js"), 1);
    }

    #[test]
    fn callback_is_invoked_immediately() {
        let registry = Registry::new(ManualFetcher::new());
        let (seen, callback) = recorder();

        registry.subscribe(key("https://x/s.js"), callback);

        assert_eq!(*seen.lock().unwrap(), vec![LoadStatus::Pending]);
    }

    #[test]
    fn subscriber_ids_are_unique() {
        let registry = Registry::new(ManualFetcher::new());
        let a = registry.subscribe(key("https://x/a.js"), |_: &LoadStatus| {});
        let b = registry.subscribe(key("https://x/a.js"), |_: &LoadStatus| {});
        let c = registry.subscribe(key("https://x/c.js"), |_: &LoadStatus| {});

        assert_ne!(a.id, b.id);
        assert_ne!(b.id, c.id);
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn completion_on_settled_record_is_ignored() {
        let fetcher = ManualFetcher::new();
        let registry = Registry::new(fetcher.clone());
        let (seen, callback) = recorder();
        registry.subscribe(key("https://x/s.js"), callback);

        fetcher.succeed("https://x/s.js");
        let record = registry.inner.state.lock().records["https://x/s.js"].id;
        registry.complete(&key("https://x/s.js"), record, Outcome::Failed(Arc::from("late")));

        assert_eq!(registry.status("https://x/s.js"), Some(LoadStatus::Loaded));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![LoadStatus::Pending, LoadStatus::Loaded]
        );
    }

    #[test]
    fn completion_for_superseded_record_is_ignored() {
        let fetcher = ManualFetcher::new();
        let registry = Registry::new(fetcher.clone());
        let (seen, callback) = recorder();
        registry.subscribe(key("https://x/s.js"), callback);

        registry.complete(&key("https://x/s.js"), RecordId(u64::MAX), Outcome::Loaded);

        assert_eq!(registry.status("https://x/s.js"), Some(LoadStatus::Pending));
        assert_eq!(*seen.lock().unwrap(), vec![LoadStatus::Pending]);
    }

    #[test]
    fn unsubscribe_unknown_is_noop() {
        let registry = Registry::new(ManualFetcher::new());
        let subscriber = registry.subscribe(key("https://x/s.js"), |_: &LoadStatus| {});

        assert!(!registry.unsubscribe(&key("https://x/other.js"), subscriber.id));
        assert!(!registry.unsubscribe(&key("https://x/s.js"), SubscriberId(u64::MAX)));
        assert_eq!(registry.subscriber_count("https://x/s.js"), 1);
    }

    #[test]
    fn unsubscribe_twice_returns_false() {
        let registry = Registry::new(ManualFetcher::new());
        let a = registry.subscribe(key("https://x/s.js"), |_: &LoadStatus| {});
        registry.subscribe(key("https://x/s.js"), |_: &LoadStatus| {});

        assert!(registry.unsubscribe(&key("https://x/s.js"), a.id));
        assert!(!registry.unsubscribe(&key("https://x/s.js"), a.id));
    }

    #[test]
    fn debug_lists_keys() {
        let registry = Registry::new(ManualFetcher::new());
        registry.subscribe(key("https://x/s.js"), |_: &LoadStatus| {});

        let debug = format!("{registry:?}");
        assert!(debug.contains("https://x/s.js"));
    }

    #[test]
    fn reset_detaches_everything() {
        let fetcher = ManualFetcher::new();
        let registry = Registry::new(fetcher.clone());
        registry.subscribe(key("https://x/a.js"), |_: &LoadStatus| {});
        registry.subscribe(key("https://x/b.js"), |_: &LoadStatus| {});
        fetcher.succeed("https://x/a.js");

        registry.reset();

        assert_eq!(registry.record_count(), 0);
        assert_eq!(fetcher.detach_count("https://x/a.js"), 1);
        assert_eq!(fetcher.detach_count("https://x/b.js"), 1);

        // The in-flight fetch for b completes into nothing.
        assert!(fetcher.succeed("https://x/b.js"));
        assert_eq!(registry.record_count(), 0);
    }
}
