use std::any::Any;
use std::collections::{HashSet, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use lodestone_module_api::{Module, ServiceProvider, ServiceRegistry};
use serde::Serialize;

use crate::catalog::ModuleCatalog;
use crate::config::ConfigStore;
use crate::error::{Error, Result};
use crate::instance::{ModuleInstance, ModuleStatus};
use crate::report::ReconcileReport;

/// What became of one load submission. Failures after dependency validation
/// are not errors: the failed instance stays observable in the live list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// A healthy instance with the same name already exists.
    AlreadyLoaded,
    /// Disabled in configuration; nothing was mutated.
    SkippedDisabled,
    /// Initialization failed; the instance was rolled back and recorded as
    /// Failed.
    Failed,
}

/// Point-in-time instance snapshot for hosts that render module health.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleStatusInfo {
    pub name: String,
    pub version: String,
    pub status: ModuleStatus,
    pub enabled: bool,
    pub attempts: u32,
    pub error: Option<String>,
}

/// Owns every module instance and the shared-service accumulator. Loads and
/// unloads are strictly sequential: dependency ordering and shared-service
/// rollback are not safe under concurrent mutation.
pub struct LifecycleManager {
    catalog: Arc<dyn ModuleCatalog>,
    config: Arc<dyn ConfigStore>,
    shared_services: ServiceRegistry,
    instances: Vec<ModuleInstance>,
}

impl LifecycleManager {
    pub fn new(catalog: Arc<dyn ModuleCatalog>, config: Arc<dyn ConfigStore>) -> Self {
        Self {
            catalog,
            config,
            shared_services: ServiceRegistry::new(),
            instances: Vec::new(),
        }
    }

    pub fn shared_services(&self) -> &ServiceRegistry {
        &self.shared_services
    }

    pub fn instances(&self) -> &[ModuleInstance] {
        &self.instances
    }

    pub fn instance(&self, name: &str) -> Option<&ModuleInstance> {
        self.instances.iter().find(|i| i.name() == name)
    }

    pub fn is_module_healthy(&self, name: &str) -> bool {
        self.instance(name).is_some_and(ModuleInstance::is_healthy)
    }

    pub fn statuses(&self) -> Vec<ModuleStatusInfo> {
        self.instances
            .iter()
            .map(|instance| ModuleStatusInfo {
                name: instance.name().to_string(),
                version: instance.version().to_string(),
                status: instance.status(),
                enabled: instance.enabled(),
                attempts: instance.attempts(),
                error: instance.last_error().map(|e| format!("{e:#}")),
            })
            .collect()
    }

    /// Load one module. Dependency validation happens before any mutation;
    /// any failure after it rolls back the shared-service accumulator, the
    /// module scope, and the module itself, then records the instance as
    /// Failed in the live list.
    pub async fn load_module(&mut self, module: Box<dyn Module>) -> Result<LoadOutcome> {
        let enabled = self.config.module_config(module.name()).enabled;
        self.load_instance(ModuleInstance::new(module, enabled)).await
    }

    async fn load_instance(&mut self, mut instance: ModuleInstance) -> Result<LoadOutcome> {
        let name = instance.name().to_string();
        let existing = self.instances.iter().position(|i| i.name() == name);
        if let Some(position) = existing {
            let previous = &self.instances[position];
            if previous.is_healthy() {
                tracing::warn!(module = %name, "module already loaded; ignoring duplicate load");
                return Ok(LoadOutcome::AlreadyLoaded);
            }
            if previous.status() == ModuleStatus::Failed && !previous.can_recover() {
                tracing::warn!(
                    module = %name,
                    attempts = previous.attempts(),
                    "module exhausted initialization attempts; not retrying"
                );
                return Ok(LoadOutcome::Failed);
            }
        }
        if !instance.enabled() {
            tracing::warn!(module = %name, "module disabled in configuration; skipping load");
            return Ok(LoadOutcome::SkippedDisabled);
        }
        for dependency in instance.dependencies() {
            if !self.is_module_healthy(dependency) {
                return Err(Error::dependency_unsatisfied(&name, dependency));
            }
        }

        // The load is certain to proceed: replace the lingering non-healthy
        // instance instead of accumulating a duplicate, carrying its attempt
        // counter so retries stay bounded.
        if let Some(position) = existing {
            let mut previous = self.instances.remove(position);
            instance.carry_attempts(previous.attempts());
            previous.dispose();
        }

        instance.begin_initializing()?;
        let snapshot = self.shared_services.snapshot();
        match self.initialize_instance(&mut instance).await {
            Ok(()) => {
                instance.mark_running()?;
                tracing::info!(
                    module = %name,
                    version = instance.version(),
                    attempts = instance.attempts(),
                    "module running"
                );
                self.instances.push(instance);
                Ok(LoadOutcome::Loaded)
            }
            Err(cause) => {
                tracing::error!(module = %name, error = %cause, "module load failed; rolling back");
                // Rollback order: shared services, then provider, then
                // module, then status. Each step proceeds even if an
                // earlier cleanup failed; cleanup failures never replace
                // the original cause.
                self.shared_services.restore(snapshot);
                tracing::debug!(module = %name, "shared services restored to pre-load snapshot");
                if let Some(provider) = instance.take_provider() {
                    provider.dispose();
                }
                if let Err(shutdown_error) = instance.shutdown_module() {
                    tracing::warn!(
                        module = %name,
                        error = %shutdown_error,
                        "module shutdown failed during rollback"
                    );
                }
                instance.mark_failed(cause);
                self.instances.push(instance);
                Ok(LoadOutcome::Failed)
            }
        }
    }

    async fn initialize_instance(&mut self, instance: &mut ModuleInstance) -> anyhow::Result<()> {
        instance
            .module_mut()
            .register_shared_services(&mut self.shared_services)
            .context("shared service registration failed")?;
        // Module scope is seeded from the accumulated shared services.
        let mut scoped = self.shared_services.snapshot();
        instance
            .module_mut()
            .register_services(&mut scoped)
            .context("module service registration failed")?;
        let provider = ServiceProvider::build(scoped);
        instance
            .module_mut()
            .initialize(&provider)
            .context("initialize hook failed")?;
        instance
            .module_mut()
            .initialize_async(&provider)
            .await
            .context("async initialize hook failed")?;
        instance.attach_provider(provider);
        Ok(())
    }

    /// Unload one module, recursively unloading every dependent first so a
    /// dependency is never torn down while a dependent is still live.
    pub fn unload_module(&mut self, name: &str) -> Result<()> {
        if !self.instances.iter().any(|i| i.name() == name) {
            return Err(Error::not_found(name));
        }
        self.remove_with_dependents(name);
        Ok(())
    }

    fn remove_with_dependents(&mut self, name: &str) {
        for dependent in self.direct_dependents(name) {
            self.remove_with_dependents(&dependent);
        }
        let Some(position) = self.instances.iter().position(|i| i.name() == name) else {
            tracing::debug!(module = name, "unload requested for unknown module");
            return;
        };
        let mut instance = self.instances.remove(position);
        instance.dispose();
        tracing::info!(module = name, "module unloaded");
    }

    /// Re-submit Failed instances with remaining attempts through the load
    /// path. After `MAX_INIT_ATTEMPTS` a module is permanently excluded.
    /// Returns how many modules came back to Running.
    pub async fn recover_failed_modules(&mut self) -> usize {
        let candidates: Vec<String> = self
            .instances
            .iter()
            .filter(|i| i.can_recover() && i.enabled())
            .map(|i| i.name().to_string())
            .collect();

        let mut recovered = 0;
        for name in candidates {
            // Dependencies must be healthy before the instance leaves the
            // list, otherwise a failed re-load would lose it.
            let unsatisfied = self
                .instance(&name)
                .map(|i| {
                    i.dependencies()
                        .iter()
                        .any(|dep| !self.is_module_healthy(dep))
                })
                .unwrap_or(true);
            if unsatisfied {
                tracing::warn!(module = %name, "recovery deferred: dependency not healthy");
                continue;
            }
            let Some(position) = self.instances.iter().position(|i| i.name() == name) else {
                continue;
            };
            let mut instance = self.instances.remove(position);
            if let Err(error) = instance.reset_for_recovery() {
                tracing::warn!(module = %name, %error, "recovery reset rejected");
                self.instances.push(instance);
                continue;
            }
            tracing::info!(
                module = %name,
                attempts = instance.attempts(),
                "re-submitting failed module"
            );
            match self.load_instance(instance).await {
                Ok(LoadOutcome::Loaded) => recovered += 1,
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!(module = %name, %error, "recovery load aborted");
                }
            }
        }
        recovered
    }

    /// Reconcile the live set against configuration: unload modules that
    /// should no longer be loaded, then load pending modules in the
    /// catalog's dependency-respecting order. Configuration enablement is
    /// the sole authority; unsatisfiable modules are skipped with a
    /// warning, never failing the pass.
    pub async fn apply_configuration_changes(&mut self) -> ReconcileReport {
        for instance in self.instances.iter_mut() {
            let enabled = self.config.module_config(instance.name()).enabled;
            instance.set_enabled(enabled);
        }
        let order = self.catalog.load_order();
        let desired: HashSet<String> = order
            .iter()
            .filter(|name| self.config.module_config(name).enabled)
            .cloned()
            .collect();

        let mut report = ReconcileReport {
            discovered: order.len(),
            enabled: desired.len(),
            ..ReconcileReport::default()
        };

        let running: Vec<String> = self
            .instances
            .iter()
            .filter(|i| i.status() == ModuleStatus::Running)
            .map(|i| i.name().to_string())
            .collect();
        for name in &running {
            if !desired.contains(name) {
                self.remove_with_dependents(name);
                report.unloaded.push(name.clone());
            }
        }

        for name in &order {
            if !desired.contains(name) || self.is_module_healthy(name) {
                continue;
            }
            let Some(info) = self.catalog.info(name) else {
                tracing::debug!(module = %name, "catalog has no metadata; skipping");
                report.skipped.push(name.clone());
                continue;
            };
            // Re-check at load time: a dependency must be both enabled in
            // configuration and currently healthy.
            let blocked = info.dependencies.iter().find(|dep| {
                !self.config.module_config(dep).enabled || !self.is_module_healthy(dep)
            });
            if let Some(dependency) = blocked {
                tracing::warn!(
                    module = %name,
                    dependency = %dependency,
                    "skipping module with unsatisfied dependency"
                );
                report.skipped.push(name.clone());
                continue;
            }
            let Some(module) = self.catalog.create(name) else {
                tracing::debug!(module = %name, "catalog produced no instance; skipping");
                report.skipped.push(name.clone());
                continue;
            };
            match self.load_module(module).await {
                Ok(LoadOutcome::Loaded) => report.loaded.push(name.clone()),
                Ok(LoadOutcome::Failed) => report.failed.push(name.clone()),
                Ok(_) => report.skipped.push(name.clone()),
                Err(error) => {
                    tracing::warn!(module = %name, %error, "reconciliation load aborted");
                    report.failed.push(name.clone());
                }
            }
        }

        tracing::debug!(
            discovered = report.discovered,
            enabled = report.enabled,
            loaded = report.loaded.len(),
            unloaded = report.unloaded.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "configuration reconciliation completed"
        );
        report
    }

    /// Instances (loaded or merely registered) whose declared dependency
    /// list names `name`.
    pub fn direct_dependents(&self, name: &str) -> Vec<String> {
        self.instances
            .iter()
            .filter(|i| i.dependencies().iter().any(|dep| dep == name))
            .map(|i| i.name().to_string())
            .collect()
    }

    /// Breadth-first closure over direct dependents, visiting each name at
    /// most once.
    pub fn transitive_dependents(&self, name: &str) -> Vec<String> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = self.direct_dependents(name).into();
        let mut out = Vec::new();
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            for next in self.direct_dependents(&current) {
                if !visited.contains(&next) {
                    queue.push_back(next);
                }
            }
            out.push(current);
        }
        out
    }

    pub fn draw_ui(&mut self) {
        self.draw_each("draw_ui", |module| module.draw_ui());
    }

    pub fn draw_configuration(&mut self) {
        self.draw_each("draw_configuration", |module| module.draw_configuration());
    }

    /// Invoke one draw hook on every healthy instance. A returned error or
    /// a panic is isolated to that module: it is logged and marks the
    /// single instance Failed without aborting the others.
    fn draw_each(
        &mut self,
        hook: &'static str,
        f: impl Fn(&mut dyn Module) -> anyhow::Result<()>,
    ) {
        for instance in self.instances.iter_mut() {
            if !instance.is_healthy() {
                continue;
            }
            let outcome =
                std::panic::catch_unwind(AssertUnwindSafe(|| f(instance.module_mut())));
            let cause = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(error)) => error,
                Err(panic) => anyhow!("{hook} panicked: {}", panic_message(panic.as_ref())),
            };
            tracing::error!(
                module = instance.name(),
                hook,
                error = %cause,
                "draw failed; marking module failed"
            );
            instance.mark_failed(cause);
        }
    }

    /// Unload every live instance, dependency-respecting via the cascading
    /// unload.
    pub fn shutdown(&mut self) {
        while let Some(name) = self.instances.first().map(|i| i.name().to_string()) {
            self.remove_with_dependents(&name);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
#[path = "tests/manager_tests.rs"]
mod tests;
