//! Load status and the consumer-facing view derived from it.

use std::sync::Arc;

use crate::key::ResourceKey;

/// Builds the failure description reported for a script that could not be loaded.
///
/// Fetchers use this so that every failure names the key that failed.
#[must_use]
pub fn load_failure_message(key: &ResourceKey) -> String {
    format!("Error loading script: {key}")
}

/// Status of a loading record.
///
/// Records start in [`Pending`](LoadStatus::Pending) and move to exactly one of
/// the two terminal states. There is no transition out of a terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// The fetch is in flight.
    Pending,
    /// The fetch completed successfully.
    Loaded,
    /// The fetch failed. Carries a human-readable description.
    Failed(Arc<str>),
}

impl LoadStatus {
    /// Returns `true` while the fetch is in flight.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns `true` for [`Loaded`](Self::Loaded) and [`Failed`](Self::Failed).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    /// Returns the failure description, if the load failed.
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            Self::Pending | Self::Loaded => None,
        }
    }

    /// Translates this status into the consumer-facing view.
    #[must_use]
    pub fn to_state(&self) -> ScriptState {
        match self {
            Self::Pending => ScriptState {
                loading: true,
                loaded: false,
                error: None,
            },
            Self::Loaded => ScriptState {
                loading: false,
                loaded: true,
                error: None,
            },
            Self::Failed(reason) => ScriptState {
                loading: false,
                loaded: false,
                error: Some(Arc::clone(reason)),
            },
        }
    }
}

/// What a consumer observes for the script it asked for.
///
/// When a key is present, exactly one of `loading`, `loaded` or `error` is set.
/// All three are unset only when no key was supplied (see [`ScriptState::idle`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptState {
    /// The script is still being fetched.
    pub loading: bool,
    /// The script finished loading.
    pub loaded: bool,
    /// Why the script failed to load.
    pub error: Option<Arc<str>>,
}

impl ScriptState {
    /// The view reported when no script was requested.
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }

    /// Returns the error description as a string slice.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns `true` once the script has either loaded or failed.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.loaded || self.error.is_some()
    }
}

impl From<&LoadStatus> for ScriptState {
    fn from(status: &LoadStatus) -> Self {
        status.to_state()
    }
}
