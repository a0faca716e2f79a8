//! Scoped handler resolution.
//!
//! Event handlers are not stored in the bus; the bus only remembers their
//! *types*. A live instance is resolved per inbound delivery from a scope,
//! so a handler can own short-lived resources (a repository, a client)
//! whose lifetime matches one delivery. The scope is dropped when the
//! delivery completes, releasing those resources regardless of handler
//! success or failure.
//!
//! ## Example
//!
//! ```ignore
//! let provider = HandlerProvider::new()
//!     .register(move || TransferEventHandler::new(transfers.clone()));
//!
//! let mut scope = provider.create_scope();
//! let instance = scope.resolve(handler_id::<TransferEventHandler>());
//! ```

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::Arc;

/// Identifier under which a handler type is registered and resolved.
///
/// The bus and the provider must agree on this key; both use this
/// function, so a handler registered with `register::<H>` is always found
/// when `H` is subscribed.
pub fn handler_id<H: 'static>() -> &'static str {
    type_name::<H>()
}

/// A per-delivery resolution context.
///
/// One scope is created for each inbound message and dropped after every
/// subscribed handler has been invoked. Resolution is by handler type
/// identifier; `None` means the type was never registered, which the bus
/// treats as a silent skip rather than an error.
pub trait HandlerScope {
    fn resolve(&mut self, handler_id: &str) -> Option<Arc<dyn Any + Send + Sync>>;
}

/// Creates a fresh scope per inbound delivery.
pub trait ScopeFactory: Send + Sync {
    fn create_scope(&self) -> Box<dyn HandlerScope>;
}

type InstanceFactory = Arc<dyn Fn() -> Arc<dyn Any + Send + Sync> + Send + Sync>;

/// Factory-backed handler provider.
///
/// Maps handler type identifiers to factory closures. Each scope created
/// from the provider builds instances lazily and caches them for the
/// duration of that scope, so two subscriptions resolving the same handler
/// type within one delivery share one instance, while separate deliveries
/// get separate instances.
#[derive(Clone, Default)]
pub struct HandlerProvider {
    factories: HashMap<&'static str, InstanceFactory>,
}

impl HandlerProvider {
    /// Create a provider with no registered handler types.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for handler type `H`.
    ///
    /// Uses builder pattern. Registering the same type again replaces the
    /// previous factory.
    pub fn register<H, F>(mut self, factory: F) -> Self
    where
        H: Send + Sync + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.factories.insert(
            handler_id::<H>(),
            Arc::new(move || Arc::new(factory()) as Arc<dyn Any + Send + Sync>),
        );
        self
    }

    /// Check whether a factory is registered for `H`.
    pub fn contains<H: 'static>(&self) -> bool {
        self.factories.contains_key(handler_id::<H>())
    }
}

impl ScopeFactory for HandlerProvider {
    fn create_scope(&self) -> Box<dyn HandlerScope> {
        Box::new(ProviderScope {
            factories: self.factories.clone(),
            cache: HashMap::new(),
        })
    }
}

/// Scope produced by `HandlerProvider`; caches instances per delivery.
struct ProviderScope {
    factories: HashMap<&'static str, InstanceFactory>,
    cache: HashMap<&'static str, Arc<dyn Any + Send + Sync>>,
}

impl HandlerScope for ProviderScope {
    fn resolve(&mut self, handler_id: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        if let Some(instance) = self.cache.get(handler_id) {
            return Some(Arc::clone(instance));
        }

        let (key, factory) = self.factories.get_key_value(handler_id)?;
        let instance = factory();
        self.cache.insert(*key, Arc::clone(&instance));
        Some(instance)
    }
}
