//! The generation collaborator.
//!
//! The orchestrator never produces content itself. It hands one field at a
//! time to a [`FieldGenerator`] and interprets the [`GenerationOutcome`].
//! Transport, timeout and retry concerns belong to the implementation.

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Field, FieldId, FieldType, WorkflowId};

/// Content of a completed dependency handed to the generator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct DependencyContent {
    pub field_id: FieldId,
    pub name: String,
    pub content: String,
}

/// Everything the generator needs to produce one field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct GenerationRequest {
    pub workflow_id: WorkflowId,
    pub field_id: FieldId,
    pub field_name: String,
    pub display_name: String,
    pub description: String,
    pub field_type: FieldType,
    pub ai_hint: String,
    pub section_name: String,
    /// Completed dependencies in the order listed by the field
    pub dependencies: Vec<DependencyContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification_answer: Option<String>,
    /// Existing content being replaced, when regenerating
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_content: Option<String>,
    /// Whether this call replaces completed content
    #[serde(default)]
    pub regenerate: bool,
}

impl GenerationRequest {
    pub(crate) fn for_field(
        workflow_id: &WorkflowId,
        field: &Field,
        section_name: &str,
        dependencies: Vec<DependencyContent>,
        regenerate: bool,
    ) -> Self {
        Self {
            workflow_id: workflow_id.clone(),
            field_id: field.id.clone(),
            field_name: field.name.clone(),
            display_name: field.display_name.clone(),
            description: field.description.clone(),
            field_type: field.field_type,
            ai_hint: field.ai_hint.clone(),
            section_name: section_name.to_string(),
            dependencies,
            clarification_answer: field.clarification_answer.clone(),
            previous_content: if regenerate { field.content.clone() } else { None },
            regenerate,
        }
    }
}

/// A question the generator needs answered before it can produce a field.
///
/// Always bound to a field id. Names can repeat across sections and can be
/// renamed while the question is open.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ClarificationRequest {
    pub field_id: FieldId,
    pub field_name: String,
    pub question: String,
}

/// Result of one generation call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GenerationOutcome {
    /// The field was generated
    Completed { content: String },
    /// The generator needs operator input first
    NeedsClarification { clarification: ClarificationRequest },
    /// The generator could not produce the field
    Failed { reason: String },
}

/// Errors raised by generator implementations.
///
/// The scheduler treats every variant as a failed generation for the field
/// being processed.
#[derive(Error, Debug)]
pub enum GeneratorError {
    /// The collaborator could not be reached or exited abnormally
    #[error("Generator transport error: {message}")]
    Transport { message: String },
    /// The collaborator did not answer in time
    #[error("Generator timed out after {seconds}s")]
    Timeout { seconds: u64 },
    /// The collaborator answered with something unparseable
    #[error("Invalid generator response: {message}")]
    InvalidResponse { message: String },
}

/// Produces content for one field at a time.
#[async_trait]
pub trait FieldGenerator: Send + Sync {
    /// Generates the field described by `request`.
    async fn generate_field(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationOutcome, GeneratorError>;

    /// Records the operator's answer to a clarification for `field_id`.
    async fn submit_clarification(
        &self,
        _field_id: &FieldId,
        _answer: &str,
    ) -> Result<(), GeneratorError> {
        Ok(())
    }
}

#[async_trait]
impl<G> FieldGenerator for Arc<G>
where
    G: FieldGenerator + ?Sized,
{
    async fn generate_field(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationOutcome, GeneratorError> {
        (**self).generate_field(request).await
    }

    async fn submit_clarification(
        &self,
        field_id: &FieldId,
        answer: &str,
    ) -> Result<(), GeneratorError> {
        (**self).submit_clarification(field_id, answer).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_wire_shape() {
        let outcome: GenerationOutcome = serde_json::from_str(
            r#"{"outcome":"needs_clarification","clarification":{"field_id":"field_2","field_name":"audience","question":"Who reads this?"}}"#,
        )
        .unwrap();
        match outcome {
            GenerationOutcome::NeedsClarification { clarification } => {
                assert_eq!(clarification.field_id, FieldId::from("field_2"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }

        let completed = serde_json::to_value(GenerationOutcome::Completed {
            content: "text".to_string(),
        })
        .unwrap();
        assert_eq!(completed["outcome"], "completed");
    }

    #[test]
    fn test_unknown_outcome_rejected() {
        let result = serde_json::from_str::<GenerationOutcome>(r#"{"outcome":"maybe"}"#);
        assert!(result.is_err());
    }
}
