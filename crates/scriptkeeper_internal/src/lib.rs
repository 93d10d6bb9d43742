//! # scriptkeeper Internal Library
//!
//! Re-exports the scriptkeeper crates for convenience.

/// Shared, reference-counted loading records.
pub use scriptkeeper_registry;

/// Script host, injecting fetcher and HTTP source.
pub use scriptkeeper_fetch;

/// Logging setup.
pub use scriptkeeper_core;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use scriptkeeper_core::{TracingFormat, TracingSetup, trace_registry_events};
    pub use scriptkeeper_fetch::{
        ElementState, FetchConfig, FetchError, HttpSource, InjectingFetcher, ScriptHost,
        ScriptSource,
    };
    pub use scriptkeeper_registry::observers::RegistryEvent;
    pub use scriptkeeper_registry::{
        FetchCompletion, LoadStatus, Registry, RegistryError, ResourceFetcher, ResourceHandle,
        ResourceKey, ScriptState, ScriptSubscription, use_script,
    };
}
