use std::time::{SystemTime, UNIX_EPOCH};

use lodestone_module_api::{Module, ServiceProvider};
use serde::Serialize;

use crate::error::{Error, Result};

/// Initialization attempts (first load plus recoveries) before a module is
/// permanently excluded from automatic recovery.
pub const MAX_INIT_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModuleStatus {
    Uninitialized,
    Initializing,
    Running,
    Failed,
    Disposed,
}

pub(crate) fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Finite-state wrapper around one loaded module. Mutated only by the
/// lifecycle manager through the guarded transition methods; never reused
/// past `Disposed`.
pub struct ModuleInstance {
    name: String,
    version: String,
    dependencies: Vec<String>,
    module: Box<dyn Module>,
    status: ModuleStatus,
    enabled: bool,
    attempts: u32,
    last_error: Option<anyhow::Error>,
    loaded_at_ms: Option<u64>,
    failed_at_ms: Option<u64>,
    provider: Option<ServiceProvider>,
    shutdown_done: bool,
}

impl ModuleInstance {
    pub fn new(module: Box<dyn Module>, enabled: bool) -> Self {
        Self {
            name: module.name().to_string(),
            version: module.version().to_string(),
            dependencies: module.dependencies().to_vec(),
            module,
            status: ModuleStatus::Uninitialized,
            enabled,
            attempts: 0,
            last_error: None,
            loaded_at_ms: None,
            failed_at_ms: None,
            provider: None,
            shutdown_done: false,
        }
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

    pub fn status(&self) -> ModuleStatus {
        self.status
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_error(&self) -> Option<&anyhow::Error> {
        self.last_error.as_ref()
    }

    pub fn loaded_at_ms(&self) -> Option<u64> {
        self.loaded_at_ms
    }

    pub fn failed_at_ms(&self) -> Option<u64> {
        self.failed_at_ms
    }

    pub fn is_healthy(&self) -> bool {
        self.status == ModuleStatus::Running && self.enabled
    }

    pub fn can_recover(&self) -> bool {
        self.status == ModuleStatus::Failed && self.attempts < MAX_INIT_ATTEMPTS
    }

    pub fn services(&self) -> Option<&ServiceProvider> {
        self.provider.as_ref()
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Inherit the attempt counter of the instance this one replaces, so a
    /// retry through a fresh shell still counts toward the cap.
    pub(crate) fn carry_attempts(&mut self, attempts: u32) {
        self.attempts = attempts;
    }

    pub(crate) fn module_mut(&mut self) -> &mut dyn Module {
        self.module.as_mut()
    }

    pub(crate) fn attach_provider(&mut self, provider: ServiceProvider) {
        self.provider = Some(provider);
    }

    pub(crate) fn take_provider(&mut self) -> Option<ServiceProvider> {
        self.provider.take()
    }

    pub(crate) fn begin_initializing(&mut self) -> Result<()> {
        if self.status == ModuleStatus::Disposed {
            return Err(Error::disposed(&self.name));
        }
        if !self.enabled {
            return Err(Error::disabled(&self.name));
        }
        if self.status != ModuleStatus::Uninitialized {
            return Err(Error::invalid_transition(
                &self.name,
                self.status,
                "Initializing",
            ));
        }
        self.attempts = self.attempts.saturating_add(1);
        self.status = ModuleStatus::Initializing;
        self.shutdown_done = false;
        Ok(())
    }

    pub(crate) fn mark_running(&mut self) -> Result<()> {
        if self.status != ModuleStatus::Initializing {
            return Err(Error::invalid_transition(&self.name, self.status, "Running"));
        }
        self.status = ModuleStatus::Running;
        self.loaded_at_ms = Some(now_unix_ms());
        Ok(())
    }

    pub(crate) fn mark_failed(&mut self, cause: anyhow::Error) {
        if self.status == ModuleStatus::Disposed {
            tracing::debug!(module = %self.name, "ignoring failure mark on disposed instance");
            return;
        }
        self.status = ModuleStatus::Failed;
        self.failed_at_ms = Some(now_unix_ms());
        self.last_error = Some(cause);
    }

    /// Failed -> Uninitialized, clearing the recorded cause but keeping the
    /// attempt counter so recovery stays bounded.
    pub(crate) fn reset_for_recovery(&mut self) -> Result<()> {
        if self.status != ModuleStatus::Failed {
            return Err(Error::invalid_transition(
                &self.name,
                self.status,
                "Uninitialized",
            ));
        }
        if self.attempts >= MAX_INIT_ATTEMPTS {
            return Err(Error::operation(
                "recover",
                format!(
                    "module `{}` exhausted {} initialization attempts",
                    self.name, self.attempts
                ),
            ));
        }
        self.status = ModuleStatus::Uninitialized;
        self.last_error = None;
        self.failed_at_ms = None;
        Ok(())
    }

    /// Shut the module down without disposing the instance. Used during
    /// load rollback, where the instance stays observable as Failed.
    pub(crate) fn shutdown_module(&mut self) -> anyhow::Result<()> {
        if self.shutdown_done {
            return Ok(());
        }
        self.shutdown_done = true;
        self.module.shutdown()
    }

    /// Terminal transition: dispose services, shut down the module, record
    /// (never propagate) shutdown failures.
    pub(crate) fn dispose(&mut self) {
        if self.status == ModuleStatus::Disposed {
            return;
        }
        if let Some(provider) = self.provider.take() {
            provider.dispose();
        }
        if !self.shutdown_done {
            self.shutdown_done = true;
            if let Err(error) = self.module.shutdown() {
                tracing::warn!(module = %self.name, %error, "module shutdown failed during dispose");
                self.last_error = Some(error);
            }
        }
        self.status = ModuleStatus::Disposed;
    }
}

impl std::fmt::Debug for ModuleInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleInstance")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("status", &self.status)
            .field("enabled", &self.enabled)
            .field("attempts", &self.attempts)
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/instance_tests.rs"]
mod tests;
