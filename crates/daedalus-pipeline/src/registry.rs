//! Named provider factories.
//!
//! The registry is the third resolution tier: tokens that no built-in stage
//! claims are looked up here by key (authenticators by `auth.<scheme>`).
//! Registration happens during start-up; [`ProviderRegistry::seal`] freezes
//! the registry before requests are served.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::provider::Provider;

/// Builds a provider from a token value.
pub type ProviderFactory = Arc<dyn Fn(&str) -> Arc<dyn Provider> + Send + Sync>;

static GLOBAL: OnceLock<Arc<ProviderRegistry>> = OnceLock::new();

/// A map from stage name to provider factory, with a one-way seal.
///
/// ```
/// use daedalus_pipeline::{BoxFuture, Outcome, Provider, ProviderContext, ProviderRegistry};
/// use std::sync::Arc;
///
/// struct Noop;
/// impl Provider for Noop {
///     fn name(&self) -> &str { "noop" }
///     fn handle<'a>(&'a self, _: &'a mut dyn ProviderContext) -> BoxFuture<'a, Outcome> {
///         Box::pin(async { Outcome::Continue })
///     }
/// }
///
/// let registry = ProviderRegistry::new();
/// registry.register("noop", |_value: &str| Arc::new(Noop) as Arc<dyn Provider>).unwrap();
/// registry.seal();
/// assert!(registry.create("noop", "").is_some());
/// assert!(registry.register("late", |_value: &str| Arc::new(Noop) as Arc<dyn Provider>).is_err());
/// ```
#[derive(Default)]
pub struct ProviderRegistry {
    factories: RwLock<HashMap<String, ProviderFactory>>,
    sealed: AtomicBool,
}

impl ProviderRegistry {
    /// Creates an empty, unsealed registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> Arc<ProviderRegistry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(ProviderRegistry::new())))
    }

    /// Registers a factory under `name`, replacing an earlier one.
    pub fn register<F>(&self, name: impl Into<String>, factory: F) -> PipelineResult<()>
    where
        F: Fn(&str) -> Arc<dyn Provider> + Send + Sync + 'static,
    {
        let name = name.into();
        // The seal is flipped under the same write lock.
        let mut factories = self.factories.write();
        if self.is_sealed() {
            return Err(PipelineError::RegistrySealed(name));
        }
        if factories.insert(name.clone(), Arc::new(factory)).is_some() {
            warn!(provider = %name, "provider factory replaced");
        } else {
            debug!(provider = %name, "provider factory registered");
        }
        Ok(())
    }

    /// Freezes the registry. Later registrations fail.
    pub fn seal(&self) {
        let factories = self.factories.write();
        if !self.sealed.swap(true, Ordering::AcqRel) {
            debug!(providers = factories.len(), "provider registry sealed");
        }
    }

    /// True once [`seal`](Self::seal) has been called.
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Instantiates the provider registered under `name`.
    pub fn create(&self, name: &str, value: &str) -> Option<Arc<dyn Provider>> {
        let factory = self.factories.read().get(name).cloned()?;
        Some(factory(value))
    }

    /// True if a factory is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.read().contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered factories.
    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("names", &self.names())
            .field("sealed", &self.is_sealed())
            .finish()
    }
}
