//! The fetcher capability consumed by the registry.
//!
//! The registry never loads anything itself. When a key is requested for the
//! first time it hands the key and a one-shot [`FetchCompletion`] to a
//! [`ResourceFetcher`], keeps the returned [`ResourceHandle`] and waits for the
//! completion to be resolved.
//!
//! # Example
//!
//! ```
//! use scriptkeeper_registry::{FetchCompletion, ResourceFetcher, ResourceHandle, ResourceKey};
//!
//! struct AlwaysLoaded;
//!
//! struct NoopHandle;
//!
//! impl ResourceHandle for NoopHandle {
//!     fn detach(&mut self) {}
//! }
//!
//! impl ResourceFetcher for AlwaysLoaded {
//!     fn fetch(&self, _key: &ResourceKey, completion: FetchCompletion) -> Box<dyn ResourceHandle> {
//!         completion.succeed();
//!         Box::new(NoopHandle)
//!     }
//! }
//! ```

use core::fmt;
use std::sync::{Arc, Weak};

use crate::key::ResourceKey;
use crate::registry::{RecordId, Registry, RegistryInner};
use crate::status::load_failure_message;

/// Starts loads on behalf of the registry.
///
/// Implementations must not block: `fetch` should begin the load and return
/// immediately. The outcome is reported later (or synchronously, before `fetch`
/// returns) through the [`FetchCompletion`].
///
/// The registry calls `fetch` without holding any of its locks, so an
/// implementation may resolve the completion from any thread.
pub trait ResourceFetcher: Send + Sync + 'static {
    /// Begins loading `key` and returns the handle of the injected resource.
    fn fetch(&self, key: &ResourceKey, completion: FetchCompletion) -> Box<dyn ResourceHandle>;
}

/// The resource created by a fetcher, owned by its loading record.
///
/// The registry calls [`detach`](Self::detach) exactly once, when the record is
/// torn down.
pub trait ResourceHandle: Send + Sync {
    /// Removes the resource from wherever the fetcher attached it.
    fn detach(&mut self);
}

pub(crate) enum Outcome {
    Loaded,
    Failed(Arc<str>),
}

/// One-shot token used by a fetcher to report the outcome of a load.
///
/// Consuming the token with [`succeed`](Self::succeed) or [`fail`](Self::fail)
/// guarantees a single outcome per fetch. A token dropped without an outcome
/// reports the standard failure for its key.
///
/// The token holds only a weak reference to the registry; resolving it after
/// the registry is gone does nothing.
pub struct FetchCompletion {
    registry: Weak<RegistryInner>,
    key: ResourceKey,
    record: RecordId,
    resolved: bool,
}

impl FetchCompletion {
    pub(crate) fn new(registry: Weak<RegistryInner>, key: ResourceKey, record: RecordId) -> Self {
        Self {
            registry,
            key,
            record,
            resolved: false,
        }
    }

    /// Returns the key being fetched.
    #[must_use]
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    /// Reports that the resource loaded.
    pub fn succeed(mut self) {
        self.resolve(Outcome::Loaded);
    }

    /// Reports that the resource failed to load, with a human-readable reason.
    pub fn fail(mut self, reason: impl Into<String>) {
        let reason: String = reason.into();
        self.resolve(Outcome::Failed(Arc::from(reason)));
    }

    fn resolve(&mut self, outcome: Outcome) {
        self.resolved = true;
        if let Some(inner) = self.registry.upgrade() {
            Registry::from_inner(inner).complete(&self.key, self.record, outcome);
        }
    }
}

impl Drop for FetchCompletion {
    fn drop(&mut self) {
        if !self.resolved {
            tracing::warn!(key = %self.key, "fetch completion dropped without an outcome");
            let reason = load_failure_message(&self.key);
            self.resolve(Outcome::Failed(Arc::from(reason)));
        }
    }
}

impl fmt::Debug for FetchCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchCompletion")
            .field("key", &self.key)
            .field("record", &self.record)
            .field("resolved", &self.resolved)
            .finish()
    }
}
