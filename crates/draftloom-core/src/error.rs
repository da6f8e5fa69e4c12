//! Error types for the orchestrator library.

use std::fmt;

use thiserror::Error;

use crate::models::{FieldId, SectionId};

/// Comprehensive error type for all orchestrator operations.
///
/// Structural violations (`Cycle`, `Conflict`, `Validation`) are raised before
/// any mutation, so an outline that returned one of these is unchanged.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// A dependency edge would close a cycle
    #[error("Dependency from '{field}' on '{dependency}' would create a cycle")]
    Cycle { field: FieldId, dependency: FieldId },
    /// Destructive change attempted without explicit confirmation
    #[error("Confirmation required: {message}")]
    Conflict { message: String },
    /// Invalid input validation errors
    #[error("Invalid input for '{field}': {reason}")]
    Validation { field: String, reason: String },
    /// The generator reported a failure for a field
    #[error("Generation failed for field '{field_id}': {reason}")]
    GenerationFailure { field_id: FieldId, reason: String },
    /// Field not found for the given ID
    #[error("Field with ID '{id}' not found")]
    FieldNotFound { id: FieldId },
    /// Section not found for the given ID
    #[error("Section with ID '{id}' not found")]
    SectionNotFound { id: SectionId },
    /// A generation run or chain regeneration is already in flight
    #[error("A generation run is already in progress")]
    AlreadyRunning,
    /// Operation not allowed in the scheduler's current state
    #[error("Cannot {operation} while the scheduler is {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },
    /// Serialization/deserialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Builder for creating input validation errors.
pub struct ValidationErrorBuilder {
    field: String,
}

impl ValidationErrorBuilder {
    /// Create a new validation error builder for a field.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// Build the error with the given reason.
    pub fn with_reason(self, reason: impl Into<String>) -> OrchestratorError {
        OrchestratorError::Validation {
            field: self.field,
            reason: reason.into(),
        }
    }
}

impl OrchestratorError {
    /// Creates a builder for input validation errors.
    pub fn validation(field: impl Into<String>) -> ValidationErrorBuilder {
        ValidationErrorBuilder::new(field)
    }

    /// Creates a conflict error for an unconfirmed destructive change.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates an invalid-state error for the given operation.
    pub fn invalid_state(operation: &'static str, state: impl fmt::Display) -> Self {
        Self::InvalidState {
            operation,
            state: state.to_string(),
        }
    }

    /// Whether the error is one of the structural rejections that guarantee
    /// the outline was left untouched.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Cycle { .. }
                | Self::Conflict { .. }
                | Self::Validation { .. }
                | Self::FieldNotFound { .. }
                | Self::SectionNotFound { .. }
        )
    }
}

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_builder() {
        let err = OrchestratorError::validation("answer").with_reason("must not be blank");
        assert_eq!(
            err.to_string(),
            "Invalid input for 'answer': must not be blank"
        );
        assert!(err.is_structural());
    }

    #[test]
    fn test_generation_failure_is_not_structural() {
        let err = OrchestratorError::GenerationFailure {
            field_id: FieldId::from("field_1"),
            reason: "model timeout".to_string(),
        };
        assert!(!err.is_structural());
        assert!(err.to_string().contains("field_1"));
    }
}
