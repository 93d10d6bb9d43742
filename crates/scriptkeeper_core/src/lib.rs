//! Logging setup for `scriptkeeper`.
//!
//! [`TracingSetup`] installs a `tracing` subscriber; [`trace_registry_events`]
//! forwards a registry's lifecycle events to it.

mod tracing_setup;

pub use tracing_setup::{
    TRACING_OBSERVER, TracingConfig, TracingFormat, TracingSetup, trace_registry_events,
};
