//! Field model definition and related functionality.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::{FieldDefinition, FieldId, FieldStatus, FieldType, SectionId};

/// A single generatable unit of content within a section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Field {
    /// Unique identifier of the field within the outline
    pub id: FieldId,

    /// ID of the owning section
    pub section_id: SectionId,

    /// Machine name, unique within the section
    pub name: String,

    /// Human-facing label
    pub display_name: String,

    /// What the field should contain
    #[serde(default)]
    pub description: String,

    /// Expected shape of the content
    #[serde(default)]
    pub field_type: FieldType,

    /// Whether the field must be filled for the document to be complete
    #[serde(default = "default_required")]
    pub required: bool,

    /// Generation hint handed to the generator
    #[serde(default)]
    pub ai_hint: String,

    /// Question the operator must answer before this field can be generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification_prompt: Option<String>,

    /// Position of the field within its section (0-indexed, contiguous)
    pub order: u32,

    /// Generated or manually written content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Current generation status
    #[serde(default)]
    pub status: FieldStatus,

    /// Fields whose content this field was generated from
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<FieldId>,

    /// Head of the chain this field belongs to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<FieldId>,

    /// Whether this field anchors a dependency chain
    #[serde(default)]
    pub is_chain_head: bool,

    /// Content was generated from inputs that have since changed
    #[serde(default)]
    pub context_stale: bool,

    /// Operator's answer to the clarification question
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification_answer: Option<String>,

    /// Timestamp when the field was created (UTC)
    pub created_at: Timestamp,

    /// Timestamp when the field was last modified (UTC)
    pub updated_at: Timestamp,
}

fn default_required() -> bool {
    true
}

impl Field {
    /// Instantiates a pending field from a definition with resolved
    /// dependency ids.
    pub(crate) fn from_definition(
        id: FieldId,
        section_id: SectionId,
        definition: &FieldDefinition,
        order: u32,
        depends_on: Vec<FieldId>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            section_id,
            name: definition.name.clone(),
            display_name: definition.name.clone(),
            description: definition.description.clone(),
            field_type: definition.field_type,
            required: definition.required,
            ai_hint: definition.ai_hint.clone(),
            clarification_prompt: definition.clarification_prompt.clone(),
            order,
            content: None,
            status: FieldStatus::Pending,
            depends_on,
            chain_id: None,
            is_chain_head: false,
            context_stale: false,
            clarification_answer: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the field asks a question that has not been answered yet.
    pub fn needs_clarification(&self) -> bool {
        self.clarification_prompt
            .as_deref()
            .is_some_and(|prompt| !prompt.trim().is_empty())
            && self
                .clarification_answer
                .as_deref()
                .map_or(true, |answer| answer.trim().is_empty())
    }

    /// Whether the field holds completed content.
    pub fn is_completed(&self) -> bool {
        self.status == FieldStatus::Completed
    }

    /// Label used in listings: the display name, falling back to the name.
    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}
