use anyhow::Result;

use crate::services::{ServiceProvider, ServiceRegistry};

/// Capability surface every loadable module implements.
///
/// Construction is two-phase: the host constructs the module shell (via a
/// catalog factory), then hands it its resolved [`ServiceProvider`] through
/// the initialize hooks. Modules never resolve services before
/// initialization.
#[async_trait::async_trait]
pub trait Module: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Names of modules that must be healthy before this one loads.
    fn dependencies(&self) -> &[String] {
        &[]
    }

    /// Register services visible to every module loaded after this one.
    fn register_shared_services(&mut self, _services: &mut ServiceRegistry) -> Result<()> {
        Ok(())
    }

    /// Register services visible only to this module's own scope.
    fn register_services(&mut self, _services: &mut ServiceRegistry) -> Result<()> {
        Ok(())
    }

    fn initialize(&mut self, _services: &ServiceProvider) -> Result<()> {
        Ok(())
    }

    async fn initialize_async(&mut self, _services: &ServiceProvider) -> Result<()> {
        Ok(())
    }

    fn draw_ui(&mut self) -> Result<()> {
        Ok(())
    }

    fn draw_configuration(&mut self) -> Result<()> {
        Ok(())
    }

    /// Release anything the module holds. Called once, on unload or on load
    /// rollback. Errors are recorded by the host, not propagated.
    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Composable identity helper a module implementation can embed and
/// delegate its `name`/`version`/`dependencies` accessors to.
#[derive(Debug, Clone)]
pub struct ModuleIdentity {
    name: String,
    version: String,
    dependencies: Vec<String>,
}

impl ModuleIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_dependencies<I, T>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}
