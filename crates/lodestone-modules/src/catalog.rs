use std::collections::HashSet;

use lodestone_module_api::{Module, ModuleInfo};

/// Discovery collaborator: knows which modules exist, their metadata, and a
/// dependency-respecting load order. A `None` from `create` means "skip, do
/// not fail".
pub trait ModuleCatalog: Send + Sync {
    fn module_infos(&self) -> Vec<ModuleInfo>;

    /// Module names ordered so every dependency precedes its dependents.
    fn load_order(&self) -> Vec<String>;

    fn create(&self, name: &str) -> Option<Box<dyn Module>>;

    fn info(&self, name: &str) -> Option<ModuleInfo>;
}

type ModuleFactory = Box<dyn Fn() -> Box<dyn Module> + Send + Sync>;

/// Catalog over factories registered up front. Load order is a
/// deterministic topological sort over declared dependencies, keeping
/// registration order among ready modules.
#[derive(Default)]
pub struct StaticModuleCatalog {
    entries: Vec<(ModuleInfo, ModuleFactory)>,
}

impl StaticModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        info: ModuleInfo,
        factory: impl Fn() -> Box<dyn Module> + Send + Sync + 'static,
    ) {
        let entry = (info, Box::new(factory) as ModuleFactory);
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.name == entry.0.name)
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ModuleCatalog for StaticModuleCatalog {
    fn module_infos(&self) -> Vec<ModuleInfo> {
        self.entries.iter().map(|(info, _)| info.clone()).collect()
    }

    fn load_order(&self) -> Vec<String> {
        let known: HashSet<&str> = self
            .entries
            .iter()
            .map(|(info, _)| info.name.as_str())
            .collect();
        let mut emitted: HashSet<String> = HashSet::new();
        let mut order = Vec::with_capacity(self.entries.len());
        loop {
            let mut progressed = false;
            for (info, _) in &self.entries {
                if emitted.contains(&info.name) {
                    continue;
                }
                // Dependencies outside the catalog cannot gate ordering.
                let ready = info
                    .dependencies
                    .iter()
                    .all(|dep| emitted.contains(dep) || !known.contains(dep.as_str()));
                if ready {
                    emitted.insert(info.name.clone());
                    order.push(info.name.clone());
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }
        for (info, _) in &self.entries {
            if !emitted.contains(&info.name) {
                tracing::warn!(
                    module = %info.name,
                    "dependency cycle detected; appending in registration order"
                );
                order.push(info.name.clone());
            }
        }
        order
    }

    fn create(&self, name: &str) -> Option<Box<dyn Module>> {
        self.entries
            .iter()
            .find(|(info, _)| info.name == name)
            .map(|(_, factory)| factory())
    }

    fn info(&self, name: &str) -> Option<ModuleInfo> {
        self.entries
            .iter()
            .find(|(info, _)| info.name == name)
            .map(|(info, _)| info.clone())
    }
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
