mod catalog;
mod config;
mod error;
mod instance;
mod manager;
mod report;

pub use catalog::{ModuleCatalog, StaticModuleCatalog};
pub use config::{ConfigStore, MemoryConfigStore, ModuleConfig};
pub use error::{Error, Result};
pub use instance::{ModuleInstance, ModuleStatus, MAX_INIT_ATTEMPTS};
pub use manager::{LifecycleManager, LoadOutcome, ModuleStatusInfo};
pub use report::ReconcileReport;

pub use lodestone_module_api::{
    Module, ModuleIdentity, ModuleInfo, ServiceProvider, ServiceRegistry,
};
