//! OID-keyed factories that upgrade generic controls to typed controls.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use tracing::debug;

use super::{Control, DecodeControl, PagedResults, ResponseControl, SortRequest, SortResponse};
use crate::Result;

/// Factory building a typed control from its generic form.
pub type ControlFactory = Arc<dyn Fn(&Control) -> Result<Box<dyn ResponseControl>> + Send + Sync>;

/// Process-wide registry, used by [`crate::Dispatcher`] unless another is set.
static GLOBAL: LazyLock<ControlRegistry> = LazyLock::new(ControlRegistry::with_defaults);

/// Registry of control factories keyed by OID.
///
/// Lookups take a shared lock and never wait for each other. A registration
/// becomes visible to lookups only once the entry is fully inserted. The
/// factory itself runs after the lock is released.
pub struct ControlRegistry {
    factories: RwLock<HashMap<String, ControlFactory>>,
}

impl ControlRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a registry holding the typed controls shipped with this crate.
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register_type::<PagedResults>();
        registry.register_type::<SortRequest>();
        registry.register_type::<SortResponse>();
        registry
    }

    /// Returns the process-wide registry.
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Installs `factory` for `oid`, replacing any previous factory.
    pub fn register<F>(&self, oid: impl Into<String>, factory: F)
    where
        F: Fn(&Control) -> Result<Box<dyn ResponseControl>> + Send + Sync + 'static,
    {
        let oid = oid.into();
        debug!(%oid, "Registering control factory");
        self.factories.write().insert(oid, Arc::new(factory));
    }

    /// Installs the factory of a typed control under its OID.
    pub fn register_type<T: DecodeControl>(&self) {
        self.register(T::OID, |control| {
            T::from_control(control).map(|typed| Box::new(typed) as Box<dyn ResponseControl>)
        });
    }

    /// Returns `true` if a factory is installed for `oid`.
    #[must_use]
    pub fn is_registered(&self, oid: &str) -> bool {
        self.factories.read().contains_key(oid)
    }

    /// Upgrades a generic control.
    ///
    /// Returns the generic control unchanged when no factory is installed,
    /// when the factory fails, or when it panics.
    #[must_use]
    pub fn instantiate(&self, control: Control) -> Box<dyn ResponseControl> {
        let Some(factory) = self.factories.read().get(control.oid()).cloned() else {
            return Box::new(control);
        };

        match panic::catch_unwind(AssertUnwindSafe(|| factory(&control))) {
            Ok(Ok(typed)) => typed,
            Ok(Err(error)) => {
                debug!(
                    oid = control.oid(),
                    %error,
                    "Control factory failed, keeping generic control"
                );
                Box::new(control)
            }
            Err(_) => {
                debug!(
                    oid = control.oid(),
                    "Control factory panicked, keeping generic control"
                );
                Box::new(control)
            }
        }
    }
}

impl Default for ControlRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ControlRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut oids: Vec<_> = self.factories.read().keys().cloned().collect();
        oids.sort();
        f.debug_struct("ControlRegistry")
            .field("oids", &oids)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::control::downcast;

    #[derive(Debug)]
    struct Marker(Control);

    impl ResponseControl for Marker {
        fn control(&self) -> &Control {
            &self.0
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    fn marker(control: &Control) -> Result<Box<dyn ResponseControl>> {
        Ok(Box::new(Marker(control.clone())))
    }

    #[test]
    fn test_unregistered_oid_stays_generic() {
        let registry = ControlRegistry::new();
        let control = Control::new("1.9.9", false, None);
        let result = registry.instantiate(control.clone());
        assert_eq!(downcast::<Control>(result.as_ref()), Some(&control));
    }

    #[test]
    fn test_registered_factory_used() {
        let registry = ControlRegistry::new();
        registry.register("1.9.9", marker);
        assert!(registry.is_registered("1.9.9"));
        let result = registry.instantiate(Control::new("1.9.9", true, None));
        assert!(downcast::<Marker>(result.as_ref()).is_some());
        assert!(result.control().is_critical());
    }

    #[test]
    fn test_last_registration_wins() {
        let registry = ControlRegistry::new();
        registry.register("1.9.9", |_| Err(Error::decode("test", "first")));
        registry.register("1.9.9", marker);
        let result = registry.instantiate(Control::new("1.9.9", false, None));
        assert!(downcast::<Marker>(result.as_ref()).is_some());
    }

    #[test]
    fn test_failing_factory_falls_back() {
        let registry = ControlRegistry::new();
        registry.register("1.9.9", |_| Err(Error::decode("test", "bad shape")));
        let control = Control::new("1.9.9", false, Some(vec![0xFF]));
        let result = registry.instantiate(control.clone());
        assert_eq!(downcast::<Control>(result.as_ref()), Some(&control));
    }

    #[test]
    fn test_panicking_factory_falls_back() {
        let registry = ControlRegistry::new();
        registry.register("1.9.9", |_| panic!("factory bug"));
        let control = Control::new("1.9.9", false, None);
        let result = registry.instantiate(control.clone());
        assert_eq!(downcast::<Control>(result.as_ref()), Some(&control));
        // The registry stays usable afterwards.
        assert!(registry.is_registered("1.9.9"));
    }

    #[test]
    fn test_defaults_registered() {
        let registry = ControlRegistry::global();
        assert!(registry.is_registered(PagedResults::OID));
        assert!(registry.is_registered(SortRequest::OID));
        assert!(registry.is_registered(SortResponse::OID));
    }

    #[test]
    fn test_concurrent_register_and_lookup() {
        let registry = Arc::new(ControlRegistry::with_defaults());
        let writers: Vec<_> = (0..4)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for j in 0..100 {
                        registry.register(format!("1.9.{i}.{j}"), marker);
                    }
                })
            })
            .collect();
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let control = PagedResults::new(10, Vec::new(), false).unwrap();
                        let typed = registry.instantiate(control.into());
                        assert!(downcast::<PagedResults>(typed.as_ref()).is_some());
                    }
                })
            })
            .collect();
        for handle in writers.into_iter().chain(readers) {
            handle.join().unwrap();
        }
        assert!(registry.is_registered("1.9.3.99"));
    }
}
