use std::collections::HashMap;

use parking_lot::RwLock;

/// Per-module configuration the manager treats as the sole authority for
/// enablement during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleConfig {
    pub enabled: bool,
    pub config_version: u64,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            config_version: 0,
        }
    }
}

/// Black-box configuration persistence keyed by module name.
pub trait ConfigStore: Send + Sync {
    fn module_config(&self, name: &str) -> ModuleConfig;

    fn save(&self) -> anyhow::Result<()>;
}

/// In-memory configuration store for tests and embedding hosts that manage
/// persistence themselves.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    fallback: ModuleConfig,
    entries: RwLock<HashMap<String, ModuleConfig>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(fallback: ModuleConfig) -> Self {
        Self {
            fallback,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_enabled(&self, name: impl Into<String>, enabled: bool) {
        let mut entries = self.entries.write();
        let entry = entries.entry(name.into()).or_default();
        entry.enabled = enabled;
        entry.config_version = entry.config_version.saturating_add(1);
    }
}

impl ConfigStore for MemoryConfigStore {
    fn module_config(&self, name: &str) -> ModuleConfig {
        self.entries
            .read()
            .get(name)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }

    fn save(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
