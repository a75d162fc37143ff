use thiserror::Error;

use crate::instance::ModuleStatus;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("module `{module}` cannot transition from {from:?} to {to}")]
    InvalidTransition {
        module: String,
        from: ModuleStatus,
        to: &'static str,
    },
    #[error("module `{module}` is disabled")]
    Disabled { module: String },
    #[error("module `{module}` is disposed")]
    Disposed { module: String },
    #[error("module `{module}` requires `{dependency}` to be loaded and healthy")]
    DependencyUnsatisfied { module: String, dependency: String },
    #[error("module `{module}` not found")]
    NotFound { module: String },
    #[error("{operation} failed: {details}")]
    Operation {
        operation: &'static str,
        details: String,
    },
}

impl Error {
    pub fn invalid_transition(
        module: impl Into<String>,
        from: ModuleStatus,
        to: &'static str,
    ) -> Self {
        Self::InvalidTransition {
            module: module.into(),
            from,
            to,
        }
    }

    pub fn disabled(module: impl Into<String>) -> Self {
        Self::Disabled {
            module: module.into(),
        }
    }

    pub fn disposed(module: impl Into<String>) -> Self {
        Self::Disposed {
            module: module.into(),
        }
    }

    pub fn dependency_unsatisfied(
        module: impl Into<String>,
        dependency: impl Into<String>,
    ) -> Self {
        Self::DependencyUnsatisfied {
            module: module.into(),
            dependency: dependency.into(),
        }
    }

    pub fn not_found(module: impl Into<String>) -> Self {
        Self::NotFound {
            module: module.into(),
        }
    }

    pub fn operation(operation: &'static str, details: impl Into<String>) -> Self {
        Self::Operation {
            operation,
            details: details.into(),
        }
    }
}
