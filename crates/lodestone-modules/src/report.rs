use serde::Serialize;

/// Outcome of one configuration-driven reconciliation pass.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ReconcileReport {
    /// Modules the catalog knows about.
    pub discovered: usize,
    /// Modules enabled in configuration.
    pub enabled: usize,
    pub loaded: Vec<String>,
    pub unloaded: Vec<String>,
    /// Skipped with a warning: unsatisfied dependency or no catalog factory.
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty()
    }
}
