//! Test doubles for the fetcher capability.
//!
//! Available with the `test-utils` feature.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::fetcher::{FetchCompletion, ResourceFetcher, ResourceHandle};
use crate::key::ResourceKey;

#[derive(Default)]
struct ManualState {
    pending: HashMap<ResourceKey, FetchCompletion>,
    fetches: HashMap<ResourceKey, usize>,
    detaches: HashMap<ResourceKey, usize>,
    complete_immediately: bool,
}

/// A fetcher whose loads complete only when the test says so.
///
/// Records how often each key was fetched and how often a handle for it was
/// detached. Clones share state, so keep one clone in the test and hand the
/// other to the registry.
///
/// Completions are always resolved outside the fetcher's own lock, so
/// subscribers may re-enter the registry (and thus this fetcher) while being
/// notified.
#[derive(Clone, Default)]
pub struct ManualFetcher {
    state: Arc<Mutex<ManualState>>,
}

impl ManualFetcher {
    /// Creates a fetcher that leaves every load pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fetcher that reports success before `fetch` returns.
    #[must_use]
    pub fn succeeding_immediately() -> Self {
        let fetcher = Self::default();
        fetcher.state.lock().complete_immediately = true;
        fetcher
    }

    /// Resolves the pending load of `key` successfully.
    ///
    /// Returns `false` if nothing was pending for `key`.
    pub fn succeed(&self, key: &str) -> bool {
        match self.take(key) {
            Some(completion) => {
                completion.succeed();
                true
            }
            None => false,
        }
    }

    /// Resolves the pending load of `key` with a failure.
    ///
    /// Returns `false` if nothing was pending for `key`.
    pub fn fail(&self, key: &str, reason: impl Into<String>) -> bool {
        match self.take(key) {
            Some(completion) => {
                completion.fail(reason);
                true
            }
            None => false,
        }
    }

    /// Drops the pending completion of `key` without resolving it.
    pub fn abandon(&self, key: &str) -> bool {
        // Dropping reports a failure to the registry, so never under our lock.
        self.take(key).is_some()
    }

    /// Returns how many times `key` was fetched.
    #[must_use]
    pub fn fetch_count(&self, key: &str) -> usize {
        self.state.lock().fetches.get(key).copied().unwrap_or(0)
    }

    /// Returns the total number of fetches across all keys.
    #[must_use]
    pub fn total_fetches(&self) -> usize {
        self.state.lock().fetches.values().sum()
    }

    /// Returns how many handles for `key` were detached.
    #[must_use]
    pub fn detach_count(&self, key: &str) -> usize {
        self.state.lock().detaches.get(key).copied().unwrap_or(0)
    }

    /// Returns `true` if a load for `key` is waiting to be resolved.
    #[must_use]
    pub fn is_pending(&self, key: &str) -> bool {
        self.state.lock().pending.contains_key(key)
    }

    fn take(&self, key: &str) -> Option<FetchCompletion> {
        self.state.lock().pending.remove(key)
    }
}

impl ResourceFetcher for ManualFetcher {
    fn fetch(&self, key: &ResourceKey, completion: FetchCompletion) -> Box<dyn ResourceHandle> {
        let (immediate, superseded) = {
            let mut state = self.state.lock();
            *state.fetches.entry(key.clone()).or_insert(0) += 1;
            if state.complete_immediately {
                (Some(completion), None)
            } else {
                (None, state.pending.insert(key.clone(), completion))
            }
        };

        drop(superseded);
        if let Some(completion) = immediate {
            completion.succeed();
        }

        Box::new(ManualHandle {
            key: key.clone(),
            state: Arc::clone(&self.state),
        })
    }
}

struct ManualHandle {
    key: ResourceKey,
    state: Arc<Mutex<ManualState>>,
}

impl ResourceHandle for ManualHandle {
    fn detach(&mut self) {
        *self
            .state
            .lock()
            .detaches
            .entry(self.key.clone())
            .or_insert(0) += 1;
    }
}
