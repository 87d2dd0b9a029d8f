//! Unit loaders and the registration entry point.
//!
//! Each compiled unit exports one function, [`ENTRY_POINT`], with the
//! [`RegisterFn`] signature. The function builds the unit's single instance
//! and offers it for every capability it implements. [`export_extension!`]
//! generates the function:
//!
//! ```ignore
//! use assayer_extensions::export_extension;
//!
//! struct AllowAll;
//! impl closure_policy::ClosurePolicy for AllowAll { /* ... */ }
//!
//! export_extension!(AllowAll => dyn closure_policy::ClosurePolicy);
//! ```
//!
//! Units and the host must be built by the same compiler against the same
//! build of this crate, since the entry point uses the Rust ABI.

use std::collections::BTreeMap;

use libloading::Library;
use log::debug;

use crate::capability::Registrar;
use crate::error::{ExtensionError, Result};
use crate::scanner::CompiledUnit;

/// Symbol exported by every extension unit.
pub const ENTRY_POINT: &[u8] = b"assayer_extension_register";

/// Signature of the registration entry point.
///
/// An `Err` aborts the run with an instantiation error naming the unit.
pub type RegisterFn = for<'a> fn(&mut Registrar<'a>) -> std::result::Result<(), String>;

/// Loads one compiled unit and lets it register its capabilities.
pub trait UnitLoader: Send {
    /// Load `unit` and invoke its registration with `registrar`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::Instantiation`] if the unit cannot be loaded,
    /// lacks the entry point or refuses to register.
    fn load(&mut self, unit: &CompiledUnit, registrar: &mut Registrar<'_>) -> Result<()>;
}

/// [`UnitLoader`] opening units as dynamic libraries.
///
/// Each library is handed to the bindings it registers into, so it stays
/// mapped until the last instance it supplied has been dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct DylibLoader;

impl DylibLoader {
    /// Create a loader.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl UnitLoader for DylibLoader {
    fn load(&mut self, unit: &CompiledUnit, registrar: &mut Registrar<'_>) -> Result<()> {
        // SAFETY: units are compiled by the registry from the configured
        // source directory; their initialisers are trusted like the sources.
        let library = unsafe { Library::new(unit.path.as_std_path()) }
            .map_err(|err| instantiation(unit, err))?;

        // SAFETY: `RegisterFn` is the signature `export_extension!` emits.
        let register = unsafe { library.get::<RegisterFn>(ENTRY_POINT) }
            .map(|symbol| *symbol)
            .map_err(|err| instantiation(unit, err))?;

        registrar.keep_alive(library);
        debug!("loaded extension unit {} from {}", unit.name, unit.path);
        register(registrar).map_err(|reason| instantiation(unit, reason))
    }
}

/// [`UnitLoader`] resolving units to registration functions linked into the
/// host, keyed by unit name.
///
/// Compiled files are still discovered on disk, so staleness and ordering
/// behave exactly as with [`DylibLoader`].
#[derive(Debug, Clone, Default)]
pub struct StaticLoader {
    units: BTreeMap<String, RegisterFn>,
}

impl StaticLoader {
    /// Create a loader with no known units.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `register` as the entry point of the unit named `name`.
    #[must_use]
    pub fn with_unit(mut self, name: impl Into<String>, register: RegisterFn) -> Self {
        self.units.insert(name.into(), register);
        self
    }
}

impl UnitLoader for StaticLoader {
    fn load(&mut self, unit: &CompiledUnit, registrar: &mut Registrar<'_>) -> Result<()> {
        let register = self.units.get(&unit.name).ok_or_else(|| {
            instantiation(unit, "no registration function is linked for this unit")
        })?;
        register(registrar).map_err(|reason| instantiation(unit, reason))
    }
}

fn instantiation(unit: &CompiledUnit, reason: impl ToString) -> ExtensionError {
    ExtensionError::Instantiation {
        unit: unit.name.clone(),
        reason: reason.to_string(),
    }
}

/// Generate the registration entry point of an extension unit.
///
/// The first form constructs the instance from an expression. The `fallible`
/// form takes an expression returning `Result<T, E>` with `E: Display`;
/// an error aborts the run and names the unit.
///
/// ```
/// use assayer_extensions::{Bindings, Capability, Registrar, export_extension};
///
/// pub trait Limit: Send + Sync {
///     fn value(&self) -> u32;
/// }
/// impl Capability for dyn Limit {
///     const NAME: &'static str = "Limit";
/// }
///
/// struct Ten;
/// impl Limit for Ten {
///     fn value(&self) -> u32 {
///         10
///     }
/// }
///
/// export_extension!(Ten => dyn Limit);
///
/// let mut bindings = Bindings::new();
/// assayer_extension_register(&mut Registrar::new("ten", &mut bindings)).unwrap();
/// assert_eq!(bindings.get::<dyn Limit>().map(|l| l.value()), Some(10));
/// ```
#[macro_export]
macro_rules! export_extension {
    (fallible $constructor:expr => $($capability:ty),+ $(,)?) => {
        /// Registration entry point of this extension unit.
        #[unsafe(no_mangle)]
        pub fn assayer_extension_register(
            registrar: &mut $crate::Registrar<'_>,
        ) -> ::std::result::Result<(), ::std::string::String> {
            let instance = ::std::sync::Arc::new(
                ($constructor).map_err(|err| ::std::string::ToString::to_string(&err))?,
            );
            $( registrar.offer::<$capability>(instance.clone()); )+
            ::std::result::Result::Ok(())
        }
    };
    ($constructor:expr => $($capability:ty),+ $(,)?) => {
        $crate::export_extension!(
            fallible ::std::result::Result::<_, ::std::convert::Infallible>::Ok($constructor)
                => $($capability),+
        );
    };
}
