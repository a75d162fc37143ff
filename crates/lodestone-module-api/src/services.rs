use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

type AnyService = Arc<dyn Any + Send + Sync>;
type ServiceFactory = Arc<dyn Fn(&ServiceProvider) -> AnyService + Send + Sync>;

#[derive(Clone)]
struct ServiceEntry {
    key: TypeId,
    type_name: &'static str,
    factory: ServiceFactory,
}

/// Explicit mapping from capability type to constructor, in registration
/// order. Registering a type twice replaces the earlier factory in place,
/// so snapshots compare stably by key sequence.
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    entries: Vec<ServiceEntry>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T, F>(&mut self, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&ServiceProvider) -> Arc<T> + Send + Sync + 'static,
    {
        let entry = ServiceEntry {
            key: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            factory: Arc::new(move |provider| factory(provider) as AnyService),
        };
        match self.entries.iter_mut().find(|e| e.key == entry.key) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn register_instance<T>(&mut self, instance: Arc<T>)
    where
        T: Send + Sync + 'static,
    {
        self.register(move |_| Arc::clone(&instance));
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.entries.iter().any(|e| e.key == TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered service type names, in registration order.
    pub fn service_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.type_name).collect()
    }

    /// Cheap point-in-time copy for rollback. Factories are shared, so this
    /// clones bookkeeping only.
    pub fn snapshot(&self) -> ServiceRegistry {
        self.clone()
    }

    pub fn restore(&mut self, snapshot: ServiceRegistry) {
        *self = snapshot;
    }
}

impl PartialEq for ServiceRegistry {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(other.entries.iter())
                .all(|(a, b)| a.key == b.key && a.type_name == b.type_name)
    }
}

impl Eq for ServiceRegistry {}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.service_names())
            .finish()
    }
}

/// Concrete resolver built from a [`ServiceRegistry`]. Instances are
/// constructed lazily and cached as singletons for the provider's lifetime.
pub struct ServiceProvider {
    entries: HashMap<TypeId, ServiceEntry>,
    cache: Mutex<HashMap<TypeId, AnyService>>,
}

impl ServiceProvider {
    pub fn build(registry: ServiceRegistry) -> Self {
        Self {
            entries: registry
                .entries
                .into_iter()
                .map(|e| (e.key, e))
                .collect(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let key = TypeId::of::<T>();
        if let Some(cached) = self.cache.lock().get(&key) {
            return Arc::clone(cached).downcast::<T>().ok();
        }
        // Build outside the cache lock so a factory may resolve its own
        // dependencies through this provider.
        let factory = Arc::clone(&self.entries.get(&key)?.factory);
        let instance = factory(self);
        let mut cache = self.cache.lock();
        let stored = cache.entry(key).or_insert(instance);
        Arc::clone(stored).downcast::<T>().ok()
    }

    /// Drop every cached instance. The provider itself stays usable only as
    /// an empty shell; the lifecycle manager calls this exactly once.
    pub fn dispose(&self) {
        self.cache.lock().clear();
    }
}

impl std::fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("registered", &self.entries.len())
            .field("resolved", &self.cache.lock().len())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/services_tests.rs"]
mod tests;
