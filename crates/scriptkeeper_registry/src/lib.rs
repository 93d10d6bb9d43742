//! De-duplicated, reference-counted script loading.
//!
//! `scriptkeeper_registry` keeps one loading record per script URL and shares
//! it between every consumer that asks for that script:
//!
//! - [`Registry`] - the shared registry: one record and one fetch per key
//! - [`ScriptSubscription`] - one consumer's handle, mirroring a record's status
//! - [`ResourceFetcher`] - the capability that actually loads a script
//! - [`observers`] - lifecycle events for tracing and metrics
//!
//! # Lifecycle
//!
//! 1. The first subscriber to a key creates a `Pending` record and starts the fetch.
//! 2. Further subscribers join the record and immediately see its status.
//! 3. The fetcher resolves the record to `Loaded` or `Failed` and every
//!    subscriber is notified.
//! 4. When the last subscriber leaves a settled record, its resource handle is
//!    detached and the record removed. A pending record is never torn down.
//!
//! # Feature Flags
//!
//! - `test-utils` - Enables [`testing::ManualFetcher`] and [`Registry::reset`]
//!
//! # Example
//!
//! ```ignore
//! use scriptkeeper_registry::Registry;
//!
//! let registry = Registry::new(my_fetcher);
//! let script = registry.use_script(Some("https://x/s.js"));
//!
//! if script.state().loaded {
//!     // ...
//! }
//! ```

mod error;
mod fetcher;
mod key;
pub mod observers;
mod registry;
mod status;
mod subscription;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use error::{ObserverRegistrationError, RegistryError};
pub use fetcher::{FetchCompletion, ResourceFetcher, ResourceHandle};
pub use key::ResourceKey;
pub use registry::{Registry, Subscriber, SubscriberId};
pub use status::{LoadStatus, ScriptState, load_failure_message};
pub use subscription::{ScriptSubscription, use_script};
