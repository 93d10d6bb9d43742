//! Error types for the script registry.

/// Errors around the process-wide registry instance.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// [`Registry::install_global`](crate::Registry::install_global) was called twice.
    #[error("a global script registry is already installed")]
    AlreadyInstalled,

    /// The global registry was requested before one was installed.
    #[error("no global script registry has been installed")]
    NotInstalled,
}

/// Errors that can occur while registering a registry observer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObserverRegistrationError {
    /// An observer with this name already exists.
    #[error("observer '{name}' already registered")]
    DuplicateName {
        /// The duplicate observer name.
        name: String,
    },
}
