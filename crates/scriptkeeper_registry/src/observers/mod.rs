//! Lifecycle observers for the script registry.
//!
//! Observers watch the registry from the outside: subscriber churn, fetch
//! start and completion, record teardown. Primary use cases are tracing,
//! metrics and debugging.
//!
//! - **Events** ([`events`]): the `RegistryEvent` enum carrying context to observers
//! - **API** ([`api`]): registration and invocation
//!
//! Observers run after the registry has updated its state and never while a
//! registry lock is held.

pub mod api;
pub mod events;

pub use api::RegistryObservers;
pub use events::RegistryEvent;
