//! Tracing subscriber setup.
//!
//! # Example
//!
//! ```
//! use scriptkeeper_core::{TracingFormat, TracingSetup};
//! use tracing::Level;
//!
//! // Development: pretty output with debug level
//! let installed = TracingSetup::new()
//!     .with_level(Level::DEBUG)
//!     .with_format(TracingFormat::Pretty)
//!     .init();
//! if let Some(config) = installed {
//!     assert_eq!(config.level, Level::DEBUG);
//! }
//!
//! // Production: JSON output for log aggregation
//! let _prod = TracingSetup::new()
//!     .with_format(TracingFormat::Json)
//!     .with_env_filter("scriptkeeper=info,reqwest=warn");
//! ```

use scriptkeeper_registry::observers::RegistryEvent;
use scriptkeeper_registry::{ObserverRegistrationError, Registry};
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Observer name used by [`trace_registry_events`].
pub const TRACING_OBSERVER: &str = "scriptkeeper::tracing";

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable colored output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig
// ─────────────────────────────────────────────────────────────────────────────

/// The configuration installed by [`TracingSetup::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracingConfig {
    /// The configured log level.
    pub level: Level,
    /// The configured output format.
    pub format: TracingFormat,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingSetup
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for the global `tracing` subscriber.
///
/// Initialization is idempotent: if a subscriber is already installed the
/// call is a no-op, the existing subscriber keeps running and
/// [`init`](Self::init) returns `None`.
#[derive(Debug, Clone)]
pub struct TracingSetup {
    level: Level,
    format: TracingFormat,
    /// Target filter (e.g., "scriptkeeper=debug,reqwest=warn").
    env_filter: Option<String>,
    span_events: bool,
}

impl Default for TracingSetup {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
        }
    }
}

impl TracingSetup {
    /// Creates a setup with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets a custom filter string.
    ///
    /// Format: `target=level,target=level,...`. An unparsable filter falls
    /// back to the configured level.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events in output.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// Returns the configuration this setup requests.
    #[must_use]
    pub fn config(&self) -> TracingConfig {
        TracingConfig {
            level: self.level,
            format: self.format,
        }
    }

    fn filter(&self) -> EnvFilter {
        match &self.env_filter {
            Some(filter) => {
                EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
            }
            None => EnvFilter::new(self.level.as_str()),
        }
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        }
    }

    /// Installs the global subscriber.
    ///
    /// Returns the installed configuration, or `None` if another subscriber
    /// was already in place.
    pub fn init(&self) -> Option<TracingConfig> {
        let env_filter = self.filter();
        let span_events = self.span_events();

        // try_init fails when a subscriber is already installed; that one wins
        let installed = match self.format {
            TracingFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .pretty()
                            .with_span_events(span_events),
                    )
                    .try_init()
                    .is_ok()
            }
            TracingFormat::Compact => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_span_events(span_events),
                    )
                    .try_init()
                    .is_ok()
            }
            TracingFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_span_events(span_events),
                    )
                    .try_init()
                    .is_ok()
            }
        };

        if !installed {
            tracing::debug!("tracing subscriber already installed");
            return None;
        }
        tracing::info!(level = %self.level, format = ?self.format, "tracing initialized");
        Some(self.config())
    }
}

/// Logs every lifecycle event of `registry` at debug level.
///
/// Registers an observer named [`TRACING_OBSERVER`].
///
/// # Errors
///
/// Returns [`ObserverRegistrationError::DuplicateName`] if called twice for
/// the same registry.
pub fn trace_registry_events(registry: &Registry) -> Result<(), ObserverRegistrationError> {
    registry.register_observer(TRACING_OBSERVER, |event: &RegistryEvent| {
        tracing::debug!(
            target: "scriptkeeper::registry",
            event = event.name(),
            key = %event.key(),
            "registry event"
        );
    })?;
    Ok(())
}
