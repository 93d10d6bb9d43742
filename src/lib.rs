//! De-duplicated, reference-counted loading of external scripts.
//!
//! Any number of consumers can ask for the same script URL; it is fetched
//! once, every consumer sees its loading state, and its element is removed
//! once nobody needs it anymore.

pub use scriptkeeper_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use scriptkeeper_internal::prelude::*;
}
