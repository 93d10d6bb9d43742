//! Per-consumer subscription handles.
//!
//! A [`ScriptSubscription`] follows one consumer's interest in one key over
//! time. It subscribes to the registry when given a key, mirrors every status
//! change into a [`watch`] channel the host can react to, and unsubscribes when
//! the key changes or the handle is dropped.
//!
//! # Example
//!
//! ```ignore
//! let mut script = registry.use_script(Some("https://x/s.js"));
//! assert!(script.state().loading);
//!
//! let mut changes = script.watch();
//! changes.changed().await?;
//! assert!(script.state().loaded);
//!
//! // Switching keys releases the old record before acquiring the new one.
//! script.set_key(Some("https://x/other.js"));
//! ```

use core::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use crate::error::RegistryError;
use crate::key::ResourceKey;
use crate::registry::{Registry, SubscriberId};
use crate::status::{LoadStatus, ScriptState};

struct Active {
    key: ResourceKey,
    subscriber: SubscriberId,
}

/// One consumer's subscription to a script.
///
/// The observable view follows the record status:
///
/// | Status | `loading` | `loaded` | `error` |
/// |--------|-----------|----------|---------|
/// | no key | false | false | `None` |
/// | Pending | true | false | `None` |
/// | Loaded | false | true | `None` |
/// | Failed | false | false | reason |
pub struct ScriptSubscription {
    registry: Registry,
    active: Option<Active>,
    /// Bumped on every release so handlers of earlier subscriptions go quiet.
    generation: Arc<AtomicU64>,
    state: Arc<watch::Sender<ScriptState>>,
}

impl ScriptSubscription {
    /// Creates an idle subscription with no key.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        let (state, _) = watch::channel(ScriptState::idle());
        Self {
            registry,
            active: None,
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(state),
        }
    }

    /// Points this subscription at `key`.
    ///
    /// Setting the current key again does nothing. Otherwise the previous key
    /// is unsubscribed first, then the new one subscribed. An absent or empty
    /// key leaves the subscription idle without touching the registry.
    pub fn set_key(&mut self, key: Option<&str>) {
        let next = ResourceKey::from_optional(key);
        if self.active.as_ref().map(|active| &active.key) == next.as_ref() {
            return;
        }

        self.release();

        let Some(key) = next else {
            publish(&self.state, ScriptState::idle());
            return;
        };

        let expected = self.generation.load(Ordering::SeqCst);
        let generation = Arc::clone(&self.generation);
        let state = Arc::clone(&self.state);
        let handler = move |status: &LoadStatus| {
            if generation.load(Ordering::SeqCst) == expected {
                publish(&state, status.to_state());
            }
        };

        let subscriber = self.registry.subscribe(key.clone(), handler);
        self.active = Some(Active {
            key,
            subscriber: subscriber.id,
        });
    }

    /// Returns the key currently subscribed to.
    #[must_use]
    pub fn key(&self) -> Option<&ResourceKey> {
        self.active.as_ref().map(|active| &active.key)
    }

    /// Returns a snapshot of the current view.
    #[must_use]
    pub fn state(&self) -> ScriptState {
        self.state.borrow().clone()
    }

    /// Returns a receiver that is notified whenever the view changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<ScriptState> {
        self.state.subscribe()
    }

    /// Waits until the script has loaded or failed, or returns at once when idle.
    pub async fn settled(&self) -> ScriptState {
        if self.active.is_none() {
            return self.state();
        }
        let mut receiver = self.state.subscribe();
        match receiver.wait_for(|state| !state.loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    fn release(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(active) = self.active.take() {
            self.registry.unsubscribe(&active.key, active.subscriber);
        }
    }
}

impl Drop for ScriptSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ScriptSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptSubscription")
            .field("key", &self.key())
            .field("state", &*self.state.borrow())
            .finish()
    }
}

fn publish(sender: &watch::Sender<ScriptState>, next: ScriptState) {
    sender.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
}

/// Subscribes to `key` through the process-wide registry.
///
/// # Errors
///
/// Returns [`RegistryError::NotInstalled`] if no global registry was installed
/// with [`Registry::install_global`].
pub fn use_script(key: Option<&str>) -> Result<ScriptSubscription, RegistryError> {
    let registry = Registry::global().ok_or(RegistryError::NotInstalled)?;
    Ok(registry.use_script(key))
}
