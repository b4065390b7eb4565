//! Link-time-discovered driver catalogue and the `name[:params]` resolver.
//!
//! Each of the five categories (codec/display/memman/pixconv/timer) gets
//! its own [`Registry`]. Entries are constructor functions, not live
//! instances; the registry itself never allocates, only `find` does,
//! by invoking the matched constructor.

use crate::error::{PlayerError, Result};

/// One registered driver: a name and a constructor for a fresh instance.
pub struct DriverEntry<T: ?Sized> {
    pub name: &'static str,
    pub make: fn() -> Box<T>,
}

/// A catalogue of drivers for one category.
pub struct Registry<T: ?Sized> {
    category: &'static str,
    entries: Vec<DriverEntry<T>>,
}

impl<T: ?Sized> Registry<T> {
    #[must_use]
    pub fn new(category: &'static str) -> Self {
        Self {
            category,
            entries: Vec::new(),
        }
    }

    /// Registers a driver under `name`. Drivers enabled at compile time
    /// call this from a central registration table (see
    /// `player-drivers::register_all`).
    pub fn register(&mut self, name: &'static str, make: fn() -> Box<T>) {
        self.entries.push(DriverEntry { name, make });
    }

    /// Resolves `spec` of the form `name[:params]` and constructs the
    /// matched driver. A `None`/empty `spec` returns the first
    /// registered driver with no params. Lookup matches the driver name
    /// up to the colon *exactly* (same length, same bytes), not a
    /// prefix search.
    pub fn find(&self, spec: Option<&str>) -> Result<(Box<T>, Option<String>)> {
        let spec = spec.filter(|s| !s.is_empty());

        let Some(spec) = spec else {
            let entry = self
                .entries
                .first()
                .ok_or_else(|| PlayerError::DriverNotFound {
                    category: self.category,
                    name: String::new(),
                })?;
            return Ok(((entry.make)(), None));
        };

        let (name, params) = match spec.split_once(':') {
            Some((n, p)) => (n, Some(p.to_string())),
            None => (spec, None),
        };

        let entry = self
            .entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| PlayerError::DriverNotFound {
                category: self.category,
                name: name.to_string(),
            })?;

        Ok(((entry.make)(), params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Thing {
        fn id(&self) -> &'static str;
    }

    struct A;
    impl Thing for A {
        fn id(&self) -> &'static str {
            "a"
        }
    }

    struct B;
    impl Thing for B {
        fn id(&self) -> &'static str {
            "b"
        }
    }

    fn make_registry() -> Registry<dyn Thing> {
        let mut r = Registry::new("thing");
        r.register("a", || Box::new(A));
        r.register("b", || Box::new(B));
        r
    }

    #[test]
    fn test_find_by_exact_name() {
        let r = make_registry();
        let (d, params) = r.find(Some("b")).expect("found");
        assert_eq!(d.id(), "b");
        assert!(params.is_none());
    }

    #[test]
    fn test_find_with_params() {
        let r = make_registry();
        let (d, params) = r.find(Some("a:w=100,h=50")).expect("found");
        assert_eq!(d.id(), "a");
        assert_eq!(params.as_deref(), Some("w=100,h=50"));
    }

    #[test]
    fn test_find_none_returns_first() {
        let r = make_registry();
        let (d, params) = r.find(None).expect("found");
        assert_eq!(d.id(), "a");
        assert!(params.is_none());
    }

    #[test]
    fn test_find_unknown_name_errors() {
        let r = make_registry();
        let err = r.find(Some("c")).unwrap_err();
        assert!(matches!(err, PlayerError::DriverNotFound { .. }));
    }

    #[test]
    fn test_prefix_that_is_not_a_full_name_does_not_match() {
        // "a" is registered, but "ab" is not a valid spec for it: this
        // is exact matching up to ':', not a substring/prefix search.
        let r = make_registry();
        let err = r.find(Some("ab")).unwrap_err();
        assert!(matches!(err, PlayerError::DriverNotFound { .. }));
    }
}
