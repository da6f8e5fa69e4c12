//! Parameter structures for orchestrator operations
//!
//! This module contains shared parameter structures that interface layers
//! (the CLI today, any request handler tomorrow) convert their input into
//! before calling [`crate::outline::Outline`] or [`crate::workflow::Workflow`].
//! They carry plain data and serde derives only; JSON schema generation is
//! enabled with the `schema` feature.
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │   CLI Args      │    │  Core Params    │    │ Outline/Workflow│
//! │  (clap derives) │───▶│ (serde derives) │───▶│    operations   │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//! ```
//!
//! Interface layers keep their framework derives on their own structs and
//! implement `From<TheirArgs>` for the matching parameter type here.

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    error::{OrchestratorError, Result},
    models::{FieldDefinition, FieldId, FieldUpdate, SectionId},
};

/// Parameters for operations requiring just a field ID.
///
/// Used for regenerating a single field and showing a field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct FieldRef {
    /// The ID of the field to operate on
    pub field_id: FieldId,
}

/// Parameters for appending a section to the outline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct AddSection {
    /// Title of the section (required)
    pub name: String,
    /// Optional description of what the section covers
    pub description: Option<String>,
}

impl AddSection {
    /// Rejects blank section names.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(OrchestratorError::validation("name").with_reason("must not be blank"));
        }
        Ok(())
    }
}

/// Parameters for adding fields to a section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct AddFields {
    /// ID of the section to add the fields to
    pub section_id: SectionId,
    /// Field definitions, added as one batch
    pub fields: Vec<FieldDefinition>,
}

/// Parameters for removing a field.
///
/// Removing a field with completed content requires `confirm`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct RemoveField {
    /// ID of the section holding the field
    pub section_id: SectionId,
    /// ID of the field to remove
    pub field_id: FieldId,
    /// Confirms the loss of completed content
    #[serde(default)]
    pub confirm: bool,
}

/// Parameters for removing a section and all of its fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct RemoveSection {
    /// ID of the section to remove
    pub section_id: SectionId,
    /// Confirms the loss of completed content
    #[serde(default)]
    pub confirm: bool,
}

/// Parameters for reordering the fields of a section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ReorderFields {
    /// ID of the section to reorder
    pub section_id: SectionId,
    /// Every field ID of the section, in the new order
    pub field_ids: Vec<FieldId>,
}

/// Parameters for reordering the sections of the outline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ReorderSections {
    /// Every section ID, in the new order
    pub section_ids: Vec<SectionId>,
}

/// Parameters for updating an existing field.
///
/// Allows partial updates. Setting `content` is a manual edit: the field
/// becomes completed and its dependents are flagged stale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct UpdateField {
    /// Field ID to update (required)
    pub field_id: FieldId,
    /// New content for the field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// New display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// New description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Replacement dependency list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Vec<FieldId>>,
}

impl UpdateField {
    /// Splits the parameters into the target field and the update to apply.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use draftloom_core::params::UpdateField;
    ///
    /// let params = UpdateField {
    ///     field_id: "field_2".into(),
    ///     content: Some("Rewritten by hand".to_string()),
    ///     ..Default::default()
    /// };
    /// let (id, update) = params.into_parts();
    /// assert_eq!(id.as_str(), "field_2");
    /// assert!(!update.is_empty());
    /// ```
    pub fn into_parts(self) -> (FieldId, FieldUpdate) {
        let update = FieldUpdate {
            content: self.content,
            display_name: self.display_name,
            description: self.description,
            depends_on: self.depends_on,
        };
        (self.field_id, update)
    }
}

/// Parameters for marking or unmarking a chain head.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct SetChainHead {
    /// ID of the field
    pub field_id: FieldId,
    /// Whether the field anchors a chain
    pub is_chain_head: bool,
}

/// Parameters for answering a clarification question.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct SubmitAnswer {
    /// ID of the field the question was asked for
    pub field_id: FieldId,
    /// The operator's answer (must not be blank)
    pub answer: String,
}

/// Parameters for regenerating a chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct RegenerateChain {
    /// ID of the chain head
    pub head_id: FieldId,
    /// Confirms that completed content will be overwritten
    #[serde(default)]
    pub confirm: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_section_validate_blank_name() {
        let params = AddSection {
            name: "   ".to_string(),
            description: None,
        };

        match params.validate().unwrap_err() {
            OrchestratorError::Validation { field, reason } => {
                assert_eq!(field, "name");
                assert!(reason.contains("blank"));
            }
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_add_section_validate_ok() {
        let params = AddSection {
            name: "Background".to_string(),
            description: Some("Context for the reader".to_string()),
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_update_field_into_parts_empty() {
        let params = UpdateField {
            field_id: FieldId::from("field_1"),
            ..Default::default()
        };
        let (id, update) = params.into_parts();
        assert_eq!(id, FieldId::from("field_1"));
        assert!(update.is_empty());
    }

    #[test]
    fn test_update_field_deserialize_partial() {
        let params: UpdateField =
            serde_json::from_str(r#"{"field_id":"field_3","depends_on":["field_1"]}"#).unwrap();
        let (_, update) = params.into_parts();
        assert_eq!(update.depends_on, Some(vec![FieldId::from("field_1")]));
        assert!(update.content.is_none());
    }

    #[test]
    fn test_remove_field_confirm_defaults_false() {
        let params: RemoveField =
            serde_json::from_str(r#"{"section_id":"section_1","field_id":"field_1"}"#).unwrap();
        assert!(!params.confirm);
    }
}
