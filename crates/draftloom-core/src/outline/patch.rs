//! Wholesale replacement of the outline structure.
//!
//! A patch describes the complete desired structure. Fields whose id survives
//! keep their content, status, staleness and clarification answer; fields
//! without a known id are created `pending`; fields missing from the patch are
//! dropped.

use std::collections::{HashMap, HashSet};

use log::info;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Outline;
use crate::{
    error::{OrchestratorError, Result},
    models::{Field, FieldDefinition, FieldId, FieldType, Section, SectionId},
    staleness,
};

/// Desired state of the whole outline.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct OutlinePatch {
    pub sections: Vec<SectionPatch>,
}

/// Desired state of one section. A missing id creates a new section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct SectionPatch {
    #[serde(default)]
    pub id: Option<SectionId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fields: Vec<FieldPatch>,
}

/// Desired state of one field. A missing or unknown id creates a new field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct FieldPatch {
    #[serde(default)]
    pub id: Option<FieldId>,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub field_type: FieldType,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub ai_hint: String,
    #[serde(default)]
    pub clarification_prompt: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<FieldId>,
    #[serde(default)]
    pub is_chain_head: bool,
}

fn default_required() -> bool {
    true
}

/// What a patch changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchSummary {
    /// Fields created by the patch
    pub added: Vec<FieldId>,
    /// Fields dropped by the patch
    pub removed: Vec<FieldId>,
    /// Fields whose state was carried over
    pub preserved: usize,
    /// Surviving fields flagged stale because something they depended on was
    /// dropped
    pub stale_marked: Vec<FieldId>,
}

impl From<&Field> for FieldPatch {
    fn from(field: &Field) -> Self {
        FieldPatch {
            id: Some(field.id.clone()),
            name: field.name.clone(),
            display_name: Some(field.display_name.clone()),
            description: field.description.clone(),
            field_type: field.field_type,
            required: field.required,
            ai_hint: field.ai_hint.clone(),
            clarification_prompt: field.clarification_prompt.clone(),
            depends_on: field.depends_on.clone(),
            is_chain_head: field.is_chain_head,
        }
    }
}

impl From<&Outline> for OutlinePatch {
    fn from(outline: &Outline) -> Self {
        OutlinePatch {
            sections: outline
                .sections()
                .iter()
                .map(|s| SectionPatch {
                    id: Some(s.id.clone()),
                    name: s.name.clone(),
                    description: s.description.clone(),
                    fields: s.fields.iter().map(FieldPatch::from).collect(),
                })
                .collect(),
        }
    }
}

impl Outline {
    /// Replaces the structure with `patch`.
    ///
    /// `confirm` sets the outline's confirmation flag. Dropping a completed
    /// field requires `allow_destructive`.
    ///
    /// # Errors
    ///
    /// - `Conflict` if completed fields would be dropped without
    ///   `allow_destructive`
    /// - `Validation` for blank or duplicate names, duplicate ids and unknown
    ///   dependencies
    /// - `Cycle` if the patched dependencies contain a cycle
    pub fn apply_patch(
        &mut self,
        patch: OutlinePatch,
        confirm: bool,
        allow_destructive: bool,
    ) -> Result<PatchSummary> {
        let existing: HashMap<&FieldId, &Field> = self.fields().map(|f| (&f.id, f)).collect();
        let kept: HashSet<FieldId> = patch
            .sections
            .iter()
            .flat_map(|s| s.fields.iter())
            .filter_map(|f| f.id.clone())
            .collect();

        let dropped: Vec<&Field> = self.fields().filter(|f| !kept.contains(&f.id)).collect();
        let dropped_completed = dropped.iter().filter(|f| f.is_completed()).count();
        if dropped_completed > 0 && !allow_destructive {
            return Err(OrchestratorError::conflict(format!(
                "patch drops {dropped_completed} completed field(s); allow destructive changes to apply it"
            )));
        }

        let mut taken_fields: HashSet<String> =
            kept.iter().map(|id| id.as_str().to_string()).collect();
        taken_fields.extend(self.taken_field_ids());
        let mut taken_sections: HashSet<String> = patch
            .sections
            .iter()
            .filter_map(|s| s.id.as_ref())
            .map(|id| id.as_str().to_string())
            .collect();
        taken_sections.extend(self.taken_section_ids());

        let mut summary = PatchSummary::default();
        let mut sections = Vec::with_capacity(patch.sections.len());
        for (section_order, section_patch) in patch.sections.into_iter().enumerate() {
            let section_id = match section_patch.id {
                Some(id) => id,
                None => {
                    let id = next_id("section", &mut taken_sections);
                    SectionId::new(id)
                }
            };
            if section_patch.name.trim().is_empty() {
                return Err(OrchestratorError::validation("sections")
                    .with_reason(format!("section '{section_id}' has a blank name")));
            }

            let mut section = Section::new(
                section_id,
                section_patch.name,
                section_patch.description,
                section_order as u32,
            );
            let mut names = HashSet::new();
            for (order, field_patch) in section_patch.fields.into_iter().enumerate() {
                let name = field_patch.name.trim().to_string();
                if name.is_empty() || !names.insert(name.clone()) {
                    return Err(OrchestratorError::validation("fields").with_reason(format!(
                        "blank or duplicate field name '{name}' in section '{}'",
                        section.id
                    )));
                }
                let field = match field_patch.id.as_ref().and_then(|id| existing.get(id)) {
                    Some(current) => {
                        summary.preserved += 1;
                        patched_field(current, field_patch, &section.id, order as u32)
                    }
                    None => {
                        let id = match field_patch.id.clone() {
                            Some(id) => id,
                            None => FieldId::new(next_id("field", &mut taken_fields)),
                        };
                        summary.added.push(id.clone());
                        new_field(id, field_patch, &section.id, order as u32)
                    }
                };
                section.fields.push(field);
            }
            sections.push(section);
        }

        // Surviving fields that used to sit downstream of a dropped field.
        let graph = self.dependency_graph();
        let mut downstream: Vec<FieldId> = Vec::new();
        for field in &dropped {
            for id in graph.transitive_dependents(&field.id) {
                if kept.contains(&id) && !downstream.contains(&id) {
                    downstream.push(id);
                }
            }
        }
        summary.removed = dropped.iter().map(|f| f.id.clone()).collect();

        let mut outline = Outline::from_sections(sections, self.confirmed || confirm)?;
        let (marked, _) = staleness::mark(&mut outline, downstream);
        summary.stale_marked = marked;

        info!(
            "Applied outline patch: {} added, {} removed, {} preserved",
            summary.added.len(),
            summary.removed.len(),
            summary.preserved
        );
        *self = outline;
        Ok(summary)
    }
}

fn next_id(prefix: &str, taken: &mut HashSet<String>) -> String {
    let id = Outline::allocate_id(prefix, taken, 1)
        .pop()
        .unwrap_or_else(|| format!("{prefix}_{}", taken.len() + 1));
    taken.insert(id.clone());
    id
}

fn patched_field(current: &Field, patch: FieldPatch, section_id: &SectionId, order: u32) -> Field {
    let mut field = current.clone();
    field.section_id = section_id.clone();
    field.order = order;
    field.display_name = patch.display_name.unwrap_or_else(|| patch.name.clone());
    field.name = patch.name;
    field.description = patch.description;
    field.field_type = patch.field_type;
    field.required = patch.required;
    field.ai_hint = patch.ai_hint;
    field.clarification_prompt = patch.clarification_prompt;
    field.depends_on = patch.depends_on;
    field.is_chain_head = patch.is_chain_head;
    if field != *current {
        field.touch();
    }
    field
}

fn new_field(id: FieldId, patch: FieldPatch, section_id: &SectionId, order: u32) -> Field {
    let definition = FieldDefinition {
        name: patch.name,
        description: patch.description,
        field_type: patch.field_type,
        required: patch.required,
        ai_hint: patch.ai_hint,
        order,
        depends_on: Vec::new(),
        clarification_prompt: patch.clarification_prompt,
    };
    let mut field = Field::from_definition(id, section_id.clone(), &definition, order, patch.depends_on);
    if let Some(display_name) = patch.display_name {
        field.display_name = display_name;
    }
    field.is_chain_head = patch.is_chain_head;
    field
}
