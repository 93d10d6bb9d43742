//! Observer registration for registry lifecycle events.
//!
//! [`RegistryObservers`] holds named callbacks that are invoked, in
//! registration order, for every [`RegistryEvent`] the registry emits.
//! Observers are side-effect only: they cannot influence the registry.
//!
//! # Example
//!
//! ```
//! use scriptkeeper_registry::observers::{RegistryEvent, RegistryObservers};
//!
//! let observers = RegistryObservers::new();
//! observers
//!     .register("logger", |event: &RegistryEvent| {
//!         println!("{} {}", event.name(), event.key());
//!     })
//!     .unwrap();
//!
//! assert!(observers.contains("logger"));
//! ```

use core::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::events::RegistryEvent;
use crate::error::ObserverRegistrationError;

type ObserverFn = Arc<dyn Fn(&RegistryEvent) + Send + Sync>;

/// Entry in the observer list.
struct ObserverEntry {
    /// Human-readable name for debugging and duplicate detection.
    name: String,
    observer: ObserverFn,
}

/// Named observers of registry lifecycle events.
///
/// # Thread Safety
///
/// Registration and notification may happen from any thread. Notification
/// works on a snapshot of the list and does not hold the lock while observers
/// run, so an observer may register further observers.
#[derive(Default)]
pub struct RegistryObservers {
    observers: RwLock<Vec<ObserverEntry>>,
}

impl RegistryObservers {
    /// Creates an empty observer list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Registers an observer under a unique name.
    ///
    /// Returns `&Self` so registrations can be chained.
    ///
    /// # Errors
    ///
    /// Returns [`ObserverRegistrationError::DuplicateName`] if an observer with
    /// the same name is already registered.
    pub fn register<F>(
        &self,
        name: impl Into<String>,
        observer: F,
    ) -> Result<&Self, ObserverRegistrationError>
    where
        F: Fn(&RegistryEvent) + Send + Sync + 'static,
    {
        let name = name.into();
        let mut observers = self.observers.write();

        if observers.iter().any(|entry| entry.name == name) {
            return Err(ObserverRegistrationError::DuplicateName { name });
        }

        observers.push(ObserverEntry {
            name,
            observer: Arc::new(observer),
        });
        Ok(self)
    }

    /// Invokes every observer with the event, in registration order.
    pub fn notify(&self, event: &RegistryEvent) {
        let snapshot: Vec<ObserverFn> = self
            .observers
            .read()
            .iter()
            .map(|entry| Arc::clone(&entry.observer))
            .collect();

        for observer in snapshot {
            observer(event);
        }
    }

    /// Returns the number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    /// Returns `true` if no observers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    /// Checks if an observer with the given name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.observers.read().iter().any(|entry| entry.name == name)
    }
}

impl fmt::Debug for RegistryObservers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .observers
            .read()
            .iter()
            .map(|entry| entry.name.clone())
            .collect();
        f.debug_struct("RegistryObservers")
            .field("observers", &names)
            .finish()
    }
}
