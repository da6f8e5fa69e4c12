//! Request and response shapes for exposing the orchestrator over a boundary.
//!
//! Statuses and field types travel as strings. Converting a wire outline back
//! into an [`Outline`] parses them into the closed model enums, so an unknown
//! status is rejected instead of being carried along. The converted outline
//! then goes through the same validation as any other import: duplicate ids,
//! dangling or cyclic dependencies are rejected and `generating` marks are
//! reset, since nothing is in flight locally.

use std::str::FromStr;

use jiff::Timestamp;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    error::{OrchestratorError, Result},
    generator::ClarificationRequest,
    models::{Field, FieldId, FieldStatus, FieldType, Section, SectionId, SectionStatus, WorkflowId},
    outline::{Outline, OutlinePatch, SectionPatch},
    workflow::{ChainReport, ChainStop, RegenerateReport, RunReport, StepOutcome, StopReason},
};

/// A field as exchanged with a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct WireField {
    pub id: FieldId,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_field_type")]
    pub field_type: String,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub ai_hint: String,
    #[serde(default)]
    pub clarification_prompt: Option<String>,
    pub order: u32,
    #[serde(default)]
    pub content: Option<String>,
    /// One of `pending`, `generating`, `completed`, `error`
    pub status: String,
    #[serde(default)]
    pub depends_on: Vec<FieldId>,
    #[serde(default)]
    pub chain_id: Option<FieldId>,
    #[serde(default)]
    pub is_chain_head: bool,
    #[serde(default)]
    pub context_stale: bool,
    #[serde(default)]
    pub clarification_answer: Option<String>,
}

fn default_field_type() -> String {
    FieldType::Text.as_str().to_string()
}

fn default_required() -> bool {
    true
}

/// A section as exchanged with a client. `status` is derived and ignored on
/// input, but must still be a known value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct WireSection {
    pub id: SectionId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub order: u32,
    #[serde(default = "default_section_status")]
    pub status: String,
    #[serde(default)]
    pub fields: Vec<WireField>,
}

fn default_section_status() -> String {
    SectionStatus::Pending.as_str().to_string()
}

/// Response of `getOutline`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct OutlineResponse {
    pub sections: Vec<WireSection>,
    #[serde(default)]
    pub outline_confirmed: bool,
}

/// Request of `patchOutline`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct PatchOutlineRequest {
    pub workflow_id: WorkflowId,
    pub sections: Vec<SectionPatch>,
    #[serde(default)]
    pub confirm: bool,
}

impl PatchOutlineRequest {
    pub fn into_patch(self) -> (OutlinePatch, bool) {
        (
            OutlinePatch {
                sections: self.sections,
            },
            self.confirm,
        )
    }
}

/// Response of `generateNextField`.
///
/// Either `success` with `remaining_count`, or `waiting_for_clarification`
/// with the question.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct GenerateNextResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_count: Option<usize>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub waiting_for_clarification: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification: Option<ClarificationRequest>,
}

impl GenerateNextResponse {
    fn waiting(clarification: &ClarificationRequest) -> Self {
        Self {
            success: false,
            remaining_count: None,
            waiting_for_clarification: true,
            clarification: Some(clarification.clone()),
        }
    }

    fn remaining(success: bool, remaining: usize) -> Self {
        Self {
            success,
            remaining_count: Some(remaining),
            ..Default::default()
        }
    }

    /// Builds the response for a single scheduler step. `pending` is the
    /// current number of pending fields, reported when the step paused.
    pub fn from_step(outcome: &StepOutcome, pending: usize) -> Self {
        match outcome {
            StepOutcome::Generated { remaining, .. } => Self::remaining(true, *remaining),
            StepOutcome::Idle => Self::remaining(true, 0),
            StepOutcome::Paused { .. } => Self::remaining(false, pending),
            StepOutcome::AwaitingClarification(clarification) => Self::waiting(clarification),
        }
    }

    /// Checks that a waiting response carries its question.
    pub fn validate(&self) -> Result<()> {
        if self.waiting_for_clarification && self.clarification.is_none() {
            return Err(OrchestratorError::validation("clarification")
                .with_reason("required when waiting_for_clarification is set"));
        }
        Ok(())
    }
}

impl From<&RunReport> for GenerateNextResponse {
    fn from(report: &RunReport) -> Self {
        match &report.stop {
            StopReason::Completed => Self::remaining(true, report.remaining),
            StopReason::Paused => Self::remaining(false, report.remaining),
            StopReason::AwaitingClarification { clarification } => Self::waiting(clarification),
        }
    }
}

/// Response of `regenerateField`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct RegenerateFieldResponse {
    pub success: bool,
    pub downstream_stale_count: usize,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub waiting_for_clarification: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification: Option<ClarificationRequest>,
}

impl From<&RegenerateReport> for RegenerateFieldResponse {
    fn from(report: &RegenerateReport) -> Self {
        Self {
            success: report.clarification.is_none(),
            downstream_stale_count: report.downstream_stale_count,
            waiting_for_clarification: report.clarification.is_some(),
            clarification: report.clarification.clone(),
        }
    }
}

/// Response of `regenerateChain`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct RegenerateChainResponse {
    pub success: bool,
    pub regenerated_count: usize,
    pub total_in_chain: usize,
    /// Reason the chain stopped early, if it did
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&ChainReport> for RegenerateChainResponse {
    fn from(report: &ChainReport) -> Self {
        let error = match &report.stop {
            ChainStop::Completed => None,
            ChainStop::Paused => Some("paused".to_string()),
            ChainStop::AwaitingClarification { clarification } => Some(format!(
                "waiting for clarification on field {}",
                clarification.field_id
            )),
            ChainStop::Failed { field_id, reason } => {
                Some(format!("field {field_id} failed: {reason}"))
            }
        };
        Self {
            success: report.is_complete(),
            regenerated_count: report.regenerated_count(),
            total_in_chain: report.total_in_chain,
            error,
        }
    }
}

/// Plain acknowledgement for `submitClarification`, `patchOutline` and the
/// delete operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct Ack {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Ack {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// Negative acknowledgement carrying the error text.
    pub fn rejected(error: &OrchestratorError) -> Self {
        Self {
            success: false,
            message: Some(error.to_string()),
        }
    }
}

impl From<&Field> for WireField {
    fn from(field: &Field) -> Self {
        Self {
            id: field.id.clone(),
            name: field.name.clone(),
            display_name: field.display_name.clone(),
            description: field.description.clone(),
            field_type: field.field_type.as_str().to_string(),
            required: field.required,
            ai_hint: field.ai_hint.clone(),
            clarification_prompt: field.clarification_prompt.clone(),
            order: field.order,
            content: field.content.clone(),
            status: field.status.as_str().to_string(),
            depends_on: field.depends_on.clone(),
            chain_id: field.chain_id.clone(),
            is_chain_head: field.is_chain_head,
            context_stale: field.context_stale,
            clarification_answer: field.clarification_answer.clone(),
        }
    }
}

impl From<&Section> for WireSection {
    fn from(section: &Section) -> Self {
        Self {
            id: section.id.clone(),
            name: section.name.clone(),
            description: section.description.clone(),
            order: section.order,
            status: section.status().as_str().to_string(),
            fields: section.fields.iter().map(WireField::from).collect(),
        }
    }
}

impl From<&Outline> for OutlineResponse {
    fn from(outline: &Outline) -> Self {
        Self {
            sections: outline.sections().iter().map(WireSection::from).collect(),
            outline_confirmed: outline.is_confirmed(),
        }
    }
}

impl WireField {
    fn into_field(self, section_id: &SectionId, now: Timestamp) -> Result<Field> {
        let status = FieldStatus::from_str(&self.status).map_err(|reason| {
            OrchestratorError::validation(format!("{}.status", self.id)).with_reason(reason)
        })?;
        let field_type = FieldType::from_str(&self.field_type).map_err(|reason| {
            OrchestratorError::validation(format!("{}.field_type", self.id)).with_reason(reason)
        })?;
        let display_name = if self.display_name.trim().is_empty() {
            self.name.clone()
        } else {
            self.display_name
        };
        Ok(Field {
            id: self.id,
            section_id: section_id.clone(),
            name: self.name,
            display_name,
            description: self.description,
            field_type,
            required: self.required,
            ai_hint: self.ai_hint,
            clarification_prompt: self.clarification_prompt,
            order: self.order,
            content: self.content,
            status,
            depends_on: self.depends_on,
            chain_id: self.chain_id,
            is_chain_head: self.is_chain_head,
            context_stale: self.context_stale,
            clarification_answer: self.clarification_answer,
            created_at: now,
            updated_at: now,
        })
    }
}

impl TryFrom<WireSection> for Section {
    type Error = OrchestratorError;

    fn try_from(wire: WireSection) -> Result<Self> {
        SectionStatus::from_str(&wire.status).map_err(|reason| {
            OrchestratorError::validation(format!("{}.status", wire.id)).with_reason(reason)
        })?;
        let now = Timestamp::now();
        let fields = wire
            .fields
            .into_iter()
            .map(|f| f.into_field(&wire.id, now))
            .collect::<Result<Vec<_>>>()?;
        Ok(Section {
            id: wire.id,
            name: wire.name,
            description: wire.description,
            order: wire.order,
            fields,
        })
    }
}

impl TryFrom<OutlineResponse> for Outline {
    type Error = OrchestratorError;

    fn try_from(wire: OutlineResponse) -> Result<Self> {
        let sections = wire
            .sections
            .into_iter()
            .map(Section::try_from)
            .collect::<Result<Vec<_>>>()?;
        Outline::from_sections(sections, wire.outline_confirmed)
    }
}
