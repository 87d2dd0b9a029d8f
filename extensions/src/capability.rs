//! Capability contracts and their singleton bindings.
//!
//! A capability is a configuration contract a check may ask for, usually a
//! trait object type such as `dyn ClosurePolicy`. Extension units offer
//! instances through a [`Registrar`]; the first unit to offer a capability
//! wins the binding and later offers are ignored. [`NoConfig`] is always
//! bound.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};

/// A configuration contract that can be bound to a singleton instance.
///
/// Implement this for the trait object type of a configuration trait:
///
/// ```
/// use assayer_extensions::Capability;
///
/// /// Decides whether a dependency is acceptable.
/// pub trait DependencyPolicy: Send + Sync {
///     /// Returns true when `dependency` may be required.
///     fn allowed(&self, dependency: &str) -> bool;
/// }
///
/// impl Capability for dyn DependencyPolicy {
///     const NAME: &'static str = "DependencyPolicy";
/// }
/// ```
pub trait Capability: Send + Sync + 'static {
    /// Human-readable capability name used in logs and diagnostics.
    const NAME: &'static str;
}

/// Capability of checks that need no configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoConfig;

impl Capability for NoConfig {
    const NAME: &'static str = "NoConfig";
}

/// Unit name recorded for bindings that are not supplied by an extension.
pub const BUILTIN_UNIT: &str = "<builtin>";

struct Binding {
    capability: &'static str,
    unit: String,
    instance: Box<dyn Any + Send + Sync>,
}

/// Map from capability to its bound singleton instance.
///
/// Resources a unit asked to keep alive, such as the library its instance
/// was loaded from, are released only after every instance.
pub struct Bindings {
    entries: HashMap<TypeId, Binding>,
    // Dropped after `entries`.
    retained: Vec<Box<dyn Any + Send + Sync>>,
}

impl Bindings {
    /// Create bindings holding only the [`NoConfig`] singleton.
    #[must_use]
    pub fn new() -> Self {
        let mut bindings = Self {
            entries: HashMap::new(),
            retained: Vec::new(),
        };
        bindings.bind::<NoConfig>(BUILTIN_UNIT, Arc::new(NoConfig));
        bindings
    }

    /// Return the instance bound to capability `C`, if any.
    #[must_use]
    pub fn get<C: Capability + ?Sized>(&self) -> Option<Arc<C>> {
        self.entries
            .get(&TypeId::of::<C>())
            .and_then(|binding| binding.instance.downcast_ref::<Arc<C>>())
            .cloned()
    }

    /// Returns true if capability `C` is bound.
    #[must_use]
    pub fn contains<C: Capability + ?Sized>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<C>())
    }

    /// Name of the unit that supplied capability `C`.
    #[must_use]
    pub fn provider_of<C: Capability + ?Sized>(&self) -> Option<&str> {
        self.entries
            .get(&TypeId::of::<C>())
            .map(|binding| binding.unit.as_str())
    }

    /// Names of all bound capabilities, sorted.
    #[must_use]
    pub fn capability_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.values().map(|b| b.capability).collect();
        names.sort_unstable();
        names
    }

    /// Number of bound capabilities, including [`NoConfig`].
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: [`NoConfig`] is bound from construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bind `instance` to `C` unless `C` is already bound.
    ///
    /// Returns true when the binding was recorded.
    fn bind<C: Capability + ?Sized>(&mut self, unit: &str, instance: Arc<C>) -> bool {
        if self.contains::<C>() {
            return false;
        }
        self.entries.insert(
            TypeId::of::<C>(),
            Binding {
                capability: C::NAME,
                unit: unit.to_owned(),
                instance: Box::new(instance),
            },
        );
        true
    }
}

impl Default for Bindings {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Bindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bindings")
            .field("capabilities", &self.capability_names())
            .finish()
    }
}

/// Handle through which one extension unit offers its instance.
///
/// A unit constructs exactly one instance and offers it for every capability
/// it implements:
///
/// ```
/// use std::sync::Arc;
/// use assayer_extensions::{Bindings, Capability, Registrar};
///
/// pub trait Greeting: Send + Sync {
///     fn text(&self) -> String;
/// }
/// impl Capability for dyn Greeting {
///     const NAME: &'static str = "Greeting";
/// }
///
/// struct Hello;
/// impl Greeting for Hello {
///     fn text(&self) -> String {
///         "hello".to_owned()
///     }
/// }
///
/// let mut bindings = Bindings::new();
/// Registrar::new("hello", &mut bindings).offer::<dyn Greeting>(Arc::new(Hello));
/// let greeting = bindings.get::<dyn Greeting>().map(|g| g.text());
/// assert_eq!(greeting.as_deref(), Some("hello"));
/// ```
pub struct Registrar<'a> {
    unit: &'a str,
    bindings: &'a mut Bindings,
}

impl<'a> Registrar<'a> {
    /// Create a registrar recording offers from `unit` into `bindings`.
    #[must_use]
    pub fn new(unit: &'a str, bindings: &'a mut Bindings) -> Self {
        Self { unit, bindings }
    }

    /// Fully-qualified name of the unit being registered.
    #[must_use]
    pub fn unit(&self) -> &str {
        self.unit
    }

    /// Keep `resource` alive for as long as the bindings exist.
    pub fn keep_alive(&mut self, resource: impl Any + Send + Sync) -> &mut Self {
        self.bindings.retained.push(Box::new(resource));
        self
    }

    /// Offer `instance` as the implementation of capability `C`.
    ///
    /// The offer is ignored when an earlier unit already bound `C`.
    pub fn offer<C: Capability + ?Sized>(&mut self, instance: Arc<C>) -> &mut Self {
        if self.bindings.bind::<C>(self.unit, instance) {
            debug!("{} bound {}", self.unit, C::NAME);
        } else {
            warn!(
                "{} also implements {}; keeping the binding from {}",
                self.unit,
                C::NAME,
                self.bindings.provider_of::<C>().unwrap_or(BUILTIN_UNIT)
            );
        }
        self
    }
}
