//! Script host and fetchers for `scriptkeeper`.
//!
//! - [`ScriptHost`] - where injected script elements live
//! - [`InjectingFetcher`] - a [`ResourceFetcher`](scriptkeeper_registry::ResourceFetcher)
//!   that attaches an element per fetch and loads it on a tokio runtime
//! - [`ScriptSource`] / [`HttpSource`] - where script bodies come from
//! - [`FetchConfig`] - timeouts, limits and adoption of existing scripts
//!
//! # Example
//!
//! ```no_run
//! use scriptkeeper_fetch::{FetchConfig, HttpSource, InjectingFetcher, ScriptHost};
//! use scriptkeeper_registry::Registry;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FetchConfig::default();
//! let host = ScriptHost::new();
//! let fetcher = InjectingFetcher::from_current(HttpSource::new(config.clone())?, host, &config)?;
//! let registry = Registry::new(fetcher);
//!
//! let script = registry.use_script(Some("https://cdn.example.com/widget.js"));
//! let state = script.settled().await;
//! assert!(state.loaded || state.error.is_some());
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod host;
mod injector;
mod source;

pub use config::FetchConfig;
pub use error::{ConfigError, FetchError};
pub use host::{ElementId, ElementState, ScriptElement, ScriptHost};
pub use injector::InjectingFetcher;
pub use source::{HttpSource, ScriptSource};
