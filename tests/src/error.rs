//! Error types for the scenario fixtures.

use keel_fields::FieldError;
use keel_store::StoreError;
use thiserror::Error;

/// Result type for fixture setup and assertions.
pub type ScenarioResult<T> = Result<T, ScenarioError>;

/// Errors raised while preparing or checking a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Seeding the fixture store failed.
    #[error("failed to seed fixtures: {0}")]
    Seed(#[from] StoreError),

    /// The fixture resources did not register.
    #[error("failed to build registry: {0}")]
    Registry(#[from] FieldError),

    /// Assertion failed.
    #[error("assertion failed for step '{step}': {message}")]
    AssertionFailed { step: String, message: String },
}

impl ScenarioError {
    pub fn assertion_failed(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            step: step.into(),
            message: message.into(),
        }
    }
}
