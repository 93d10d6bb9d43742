//! The attachment point for injected script elements.
//!
//! A [`ScriptHost`] plays the part of a document head: fetchers attach an
//! element when a load starts, record how it ended, and detach it when the
//! registry tears the record down. Elements keep their attachment order.

use core::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use scriptkeeper_registry::ResourceKey;

/// Unique identifier of an attached element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

impl ElementId {
    /// Returns the raw ID value.
    #[must_use]
    pub fn index(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "script_{}", self.0)
    }
}

/// Load state of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementState {
    /// The body is being fetched.
    Loading,
    /// The body arrived.
    Ready(Arc<str>),
    /// The load failed, with the description reported to subscribers.
    Errored(Arc<str>),
}

/// A script element attached to a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptElement {
    id: ElementId,
    src: ResourceKey,
    state: ElementState,
}

impl ScriptElement {
    /// Returns the element's ID.
    #[must_use]
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Returns the URL the element was loaded from.
    #[must_use]
    pub fn src(&self) -> &ResourceKey {
        &self.src
    }

    /// Returns the element's load state.
    #[must_use]
    pub fn state(&self) -> &ElementState {
        &self.state
    }

    /// Returns `true` once the body has arrived.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, ElementState::Ready(_))
    }

    /// Returns the script body, if ready.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match &self.state {
            ElementState::Ready(body) => Some(body),
            ElementState::Loading | ElementState::Errored(_) => None,
        }
    }
}

#[derive(Default)]
struct HostState {
    elements: IndexMap<ElementId, ScriptElement>,
    next_id: u64,
}

impl HostState {
    fn insert(&mut self, src: ResourceKey, state: ElementState) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.elements.insert(id, ScriptElement { id, src, state });
        id
    }
}

/// Shared container of attached script elements.
///
/// Clones share the same elements.
#[derive(Clone, Default)]
pub struct ScriptHost {
    inner: Arc<RwLock<HostState>>,
}

impl ScriptHost {
    /// Creates an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a new element for `src` in the [`Loading`](ElementState::Loading) state.
    pub fn attach(&self, src: ResourceKey) -> ElementId {
        let id = self.inner.write().insert(src, ElementState::Loading);
        tracing::trace!(%id, "script element attached");
        id
    }

    /// Attaches an element whose body is already available.
    ///
    /// Models scripts placed in the host by someone other than a fetcher.
    pub fn attach_ready(&self, src: ResourceKey, body: impl Into<Arc<str>>) -> ElementId {
        self.inner
            .write()
            .insert(src, ElementState::Ready(body.into()))
    }

    /// Updates the state of an attached element.
    ///
    /// Returns `false` if the element is no longer attached.
    pub fn set_state(&self, id: ElementId, state: ElementState) -> bool {
        match self.inner.write().elements.get_mut(&id) {
            Some(element) => {
                element.state = state;
                true
            }
            None => false,
        }
    }

    /// Removes an element, returning it if it was attached.
    pub fn detach(&self, id: ElementId) -> Option<ScriptElement> {
        let removed = self.inner.write().elements.shift_remove(&id);
        if removed.is_some() {
            tracing::trace!(%id, "script element detached");
        }
        removed
    }

    /// Returns a copy of an attached element.
    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<ScriptElement> {
        self.inner.read().elements.get(&id).cloned()
    }

    /// Returns the first attached element loaded from `src`.
    #[must_use]
    pub fn find_by_src(&self, src: &str) -> Option<ScriptElement> {
        self.inner
            .read()
            .elements
            .values()
            .find(|element| element.src.as_str() == src)
            .cloned()
    }

    /// Returns copies of all attached elements, in attachment order.
    #[must_use]
    pub fn elements(&self) -> Vec<ScriptElement> {
        self.inner.read().elements.values().cloned().collect()
    }

    /// Returns the number of attached elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().elements.len()
    }

    /// Returns `true` if nothing is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().elements.is_empty()
    }
}

impl fmt::Debug for ScriptHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let srcs: Vec<String> = self
            .inner
            .read()
            .elements
            .values()
            .map(|element| element.src.to_string())
            .collect();
        f.debug_struct("ScriptHost").field("elements", &srcs).finish()
    }
}
