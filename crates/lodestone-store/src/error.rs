use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{stage}-check rejected action `{action}`: {details}")]
    Validation {
        stage: &'static str,
        action: &'static str,
        details: String,
    },
    #[error("state copy for `{state_id}` failed: {details}")]
    StateCopy { state_id: String, details: String },
    #[error("{operation} failed: {details}")]
    Operation {
        operation: &'static str,
        details: String,
    },
}

impl Error {
    pub fn validation(
        stage: &'static str,
        action: &'static str,
        details: impl Into<String>,
    ) -> Self {
        Self::Validation {
            stage,
            action,
            details: details.into(),
        }
    }

    pub fn state_copy(state_id: impl Into<String>, details: impl Into<String>) -> Self {
        Self::StateCopy {
            state_id: state_id.into(),
            details: details.into(),
        }
    }

    pub fn operation(operation: &'static str, details: impl Into<String>) -> Self {
        Self::Operation {
            operation,
            details: details.into(),
        }
    }
}
