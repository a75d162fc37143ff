mod info;
mod module;
mod services;

pub use info::ModuleInfo;
pub use module::{Module, ModuleIdentity};
pub use services::{ServiceProvider, ServiceRegistry};
