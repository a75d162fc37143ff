use lodestone_module_api::{Module, ModuleIdentity, ModuleInfo};

use crate::catalog::{ModuleCatalog, StaticModuleCatalog};

struct StubModule {
    identity: ModuleIdentity,
}

impl StubModule {
    fn factory(name: &str) -> impl Fn() -> Box<dyn Module> + Send + Sync {
        let name = name.to_string();
        move || {
            Box::new(StubModule {
                identity: ModuleIdentity::new(name.clone(), "1.0.0"),
            })
        }
    }
}

#[async_trait::async_trait]
impl Module for StubModule {
    fn name(&self) -> &str {
        self.identity.name()
    }

    fn version(&self) -> &str {
        self.identity.version()
    }
}

fn info(name: &str, dependencies: &[&str]) -> ModuleInfo {
    ModuleInfo::new(name, "1.0.0").with_dependencies(dependencies.iter().copied())
}

#[test]
fn load_order_puts_dependencies_first() {
    let mut catalog = StaticModuleCatalog::new();
    catalog.register(info("ui", &["core"]), StubModule::factory("ui"));
    catalog.register(info("core", &[]), StubModule::factory("core"));
    catalog.register(info("export", &["ui", "core"]), StubModule::factory("export"));
    assert_eq!(catalog.load_order(), vec!["core", "ui", "export"]);
}

#[test]
fn load_order_keeps_registration_order_among_ready_modules() {
    let mut catalog = StaticModuleCatalog::new();
    catalog.register(info("b", &[]), StubModule::factory("b"));
    catalog.register(info("a", &[]), StubModule::factory("a"));
    assert_eq!(catalog.load_order(), vec!["b", "a"]);
}

#[test]
fn unknown_dependencies_do_not_gate_ordering() {
    let mut catalog = StaticModuleCatalog::new();
    catalog.register(info("solo", &["external-thing"]), StubModule::factory("solo"));
    assert_eq!(catalog.load_order(), vec!["solo"]);
}

#[test]
fn cycle_members_are_appended_in_registration_order() {
    let mut catalog = StaticModuleCatalog::new();
    catalog.register(info("a", &["b"]), StubModule::factory("a"));
    catalog.register(info("b", &["a"]), StubModule::factory("b"));
    catalog.register(info("free", &[]), StubModule::factory("free"));
    assert_eq!(catalog.load_order(), vec!["free", "a", "b"]);
}

#[test]
fn register_replaces_entry_with_same_name() {
    let mut catalog = StaticModuleCatalog::new();
    catalog.register(info("core", &[]), StubModule::factory("core"));
    catalog.register(
        ModuleInfo::new("core", "2.0.0"),
        StubModule::factory("core"),
    );
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.info("core").unwrap().version, "2.0.0");
}

#[test]
fn create_uses_registered_factory() {
    let mut catalog = StaticModuleCatalog::new();
    catalog.register(info("core", &[]), StubModule::factory("core"));
    let module = catalog.create("core").unwrap();
    assert_eq!(module.name(), "core");
    assert!(catalog.create("missing").is_none());
    assert!(catalog.info("missing").is_none());
}
