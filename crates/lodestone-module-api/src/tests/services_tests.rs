use std::sync::Arc;

use super::{ServiceProvider, ServiceRegistry};

struct Clock {
    now_ms: u64,
}

struct Journal {
    label: String,
}

#[test]
fn register_and_resolve_singleton() {
    let mut registry = ServiceRegistry::new();
    registry.register::<Clock, _>(|_| Arc::new(Clock { now_ms: 42 }));

    let provider = ServiceProvider::build(registry);
    let a = provider.get::<Clock>().expect("clock registered");
    let b = provider.get::<Clock>().expect("clock cached");
    assert_eq!(a.now_ms, 42);
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn missing_service_resolves_to_none() {
    let provider = ServiceProvider::build(ServiceRegistry::new());
    assert!(provider.get::<Clock>().is_none());
}

#[test]
fn factory_resolves_its_own_dependencies() {
    let mut registry = ServiceRegistry::new();
    registry.register::<Clock, _>(|_| Arc::new(Clock { now_ms: 7 }));
    registry.register::<Journal, _>(|provider| {
        let clock = provider.get::<Clock>().expect("clock available");
        Arc::new(Journal {
            label: format!("journal@{}", clock.now_ms),
        })
    });

    let provider = ServiceProvider::build(registry);
    let journal = provider.get::<Journal>().expect("journal registered");
    assert_eq!(journal.label, "journal@7");
}

#[test]
fn re_registration_replaces_in_place() {
    let mut registry = ServiceRegistry::new();
    registry.register::<Clock, _>(|_| Arc::new(Clock { now_ms: 1 }));
    registry.register::<Journal, _>(|_| {
        Arc::new(Journal {
            label: "first".into(),
        })
    });
    registry.register::<Clock, _>(|_| Arc::new(Clock { now_ms: 2 }));

    assert_eq!(registry.len(), 2);
    let provider = ServiceProvider::build(registry);
    assert_eq!(provider.get::<Clock>().expect("clock").now_ms, 2);
}

#[test]
fn snapshot_restore_round_trips_content() {
    let mut registry = ServiceRegistry::new();
    registry.register::<Clock, _>(|_| Arc::new(Clock { now_ms: 1 }));
    let snapshot = registry.snapshot();

    registry.register::<Journal, _>(|_| {
        Arc::new(Journal {
            label: "extra".into(),
        })
    });
    assert_ne!(registry, snapshot);

    registry.restore(snapshot.clone());
    assert_eq!(registry, snapshot);
    assert_eq!(registry.service_names(), snapshot.service_names());
}

#[test]
fn dispose_drops_cached_instances() {
    let mut registry = ServiceRegistry::new();
    registry.register::<Clock, _>(|_| Arc::new(Clock { now_ms: 3 }));
    let provider = ServiceProvider::build(registry);

    let before = provider.get::<Clock>().expect("clock");
    provider.dispose();
    let after = provider.get::<Clock>().expect("clock rebuilt");
    assert!(!Arc::ptr_eq(&before, &after));
}
