//! Resource keys.

use core::borrow::Borrow;
use core::fmt;
use std::sync::Arc;

/// Identifier of a loadable script, usually its URL.
///
/// Keys compare by exact value. No normalization is performed, so
/// `https://x/s.js` and `https://x/s.js?` name two different resources.
///
/// An empty string is not a key: it means "no resource requested" and is
/// rejected by [`ResourceKey::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey(Arc<str>);

impl ResourceKey {
    /// Creates a key, returning `None` for the empty string.
    #[must_use]
    pub fn new(key: impl AsRef<str>) -> Option<Self> {
        let key = key.as_ref();
        (!key.is_empty()).then(|| Self(Arc::from(key)))
    }

    /// Creates a key from an optional string. Absent and empty inputs both yield `None`.
    #[must_use]
    pub fn from_optional(key: Option<&str>) -> Option<Self> {
        key.and_then(Self::new)
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ResourceKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_not_a_key() {
        assert!(ResourceKey::new("").is_none());
        assert!(ResourceKey::from_optional(None).is_none());
        assert!(ResourceKey::from_optional(Some("")).is_none());
    }

    #[test]
    fn keys_compare_by_exact_value() {
        let a = ResourceKey::new("https://x/s.js").unwrap();
        let b = ResourceKey::new("https://x/s.js").unwrap();
        let c = ResourceKey::new("https://x/s.js?").unwrap();
        let upper = ResourceKey::new("HTTPS://x/s.js").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, upper, "keys are not normalized");
    }

    #[test]
    fn borrows_as_str_for_lookups() {
        let mut map = hashbrown::HashMap::new();
        map.insert(ResourceKey::new("https://x/s.js").unwrap(), 1);
        assert_eq!(map.get("https://x/s.js"), Some(&1));
    }

    #[test]
    fn displays_the_raw_key() {
        let key = ResourceKey::new("https://x/s.js").unwrap();
        assert_eq!(key.to_string(), "https://x/s.js");
        assert_eq!(key.as_str(), "https://x/s.js");
    }
}
