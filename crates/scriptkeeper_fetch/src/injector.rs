//! A [`ResourceFetcher`] that injects script elements into a [`ScriptHost`].

use core::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use parking_lot::Mutex;
use scriptkeeper_registry::{
    FetchCompletion, ResourceFetcher, ResourceHandle, ResourceKey, load_failure_message,
};
use tokio::runtime::Handle;

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::host::{ElementId, ElementState, ScriptHost};
use crate::source::ScriptSource;

type OwnedElements = Arc<Mutex<IndexSet<ElementId>>>;

/// Attaches one element per fetch and loads its body on a tokio runtime.
///
/// The element moves to [`ElementState::Ready`] or [`ElementState::Errored`]
/// before the registry is told the outcome. Failures always reach the registry
/// as `Error loading script: <url>`; the underlying [`FetchError`] is logged.
///
/// With `check_for_existing` enabled, a ready element for the same URL that
/// this fetcher did not attach is adopted instead of fetched. Adopted elements
/// are never detached.
pub struct InjectingFetcher<S> {
    source: Arc<S>,
    host: ScriptHost,
    runtime: Handle,
    check_for_existing: bool,
    owned: OwnedElements,
}

impl<S: ScriptSource> InjectingFetcher<S> {
    /// Creates a fetcher that spawns loads on `runtime`.
    pub fn new(source: S, host: ScriptHost, config: &FetchConfig, runtime: Handle) -> Self {
        Self {
            source: Arc::new(source),
            host,
            runtime,
            check_for_existing: config.check_for_existing,
            owned: OwnedElements::default(),
        }
    }

    /// Creates a fetcher bound to the runtime of the calling context.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::NoRuntime`] when called outside a tokio runtime.
    pub fn from_current(
        source: S,
        host: ScriptHost,
        config: &FetchConfig,
    ) -> Result<Self, FetchError> {
        let runtime = Handle::try_current().map_err(|_| FetchError::NoRuntime)?;
        Ok(Self::new(source, host, config, runtime))
    }

    /// Returns the host elements are attached to.
    #[must_use]
    pub fn host(&self) -> &ScriptHost {
        &self.host
    }

    /// Returns the script source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    fn adoptable(&self, key: &ResourceKey) -> Option<ElementId> {
        if !self.check_for_existing {
            return None;
        }
        let owned = self.owned.lock();
        self.host
            .elements()
            .into_iter()
            .find(|element| {
                element.src() == key && element.is_ready() && !owned.contains(&element.id())
            })
            .map(|element| element.id())
    }
}

impl<S: ScriptSource> ResourceFetcher for InjectingFetcher<S> {
    fn fetch(&self, key: &ResourceKey, completion: FetchCompletion) -> Box<dyn ResourceHandle> {
        if let Some(id) = self.adoptable(key) {
            tracing::debug!(%key, element = %id, "adopting existing script element");
            completion.succeed();
            return Box::new(ElementHandle::Adopted);
        }

        let id = self.host.attach(key.clone());
        self.owned.lock().insert(id);

        let source = Arc::clone(&self.source);
        let host = self.host.clone();
        let key = key.clone();
        self.runtime.spawn(async move {
            match source.load(&key).await {
                Ok(body) => {
                    host.set_state(id, ElementState::Ready(Arc::from(body)));
                    completion.succeed();
                }
                Err(err) => {
                    tracing::warn!(%key, error = %err, "script load failed");
                    let reason = load_failure_message(&key);
                    host.set_state(id, ElementState::Errored(Arc::from(reason.as_str())));
                    completion.fail(reason);
                }
            }
        });

        Box::new(ElementHandle::Owned {
            host: self.host.clone(),
            owned: Arc::clone(&self.owned),
            id,
        })
    }
}

impl<S> fmt::Debug for InjectingFetcher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectingFetcher")
            .field("host", &self.host)
            .field("check_for_existing", &self.check_for_existing)
            .field("owned", &self.owned.lock().len())
            .finish_non_exhaustive()
    }
}

enum ElementHandle {
    Owned {
        host: ScriptHost,
        owned: OwnedElements,
        id: ElementId,
    },
    Adopted,
}

impl ResourceHandle for ElementHandle {
    fn detach(&mut self) {
        match self {
            Self::Owned { host, owned, id } => {
                owned.lock().shift_remove(id);
                host.detach(*id);
            }
            Self::Adopted => {}
        }
    }
}
