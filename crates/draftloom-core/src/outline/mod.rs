//! The outline aggregate: sections, fields and dependency edges.
//!
//! [`Outline`] is the single source of truth for document structure and
//! per-field state. It guarantees the structural invariants:
//!
//! - field ids are unique across the outline;
//! - `depends_on` never names the field itself, an unknown id, or an id that
//!   would close a cycle;
//! - section and field `order` values are contiguous from zero;
//! - at most one field is `generating` at a time;
//! - removing a field removes it from every other field's `depends_on`.
//!
//! Every operation validates before it mutates, so a call that returns an
//! error leaves the outline exactly as it was.
//!
//! ## Submodules
//!
//! - [`graph`]: dependency graph traversal and cycle detection
//! - [`editing`]: structural editing operations (add, remove, reorder, update)
//! - [`patch`]: wholesale structure replacement that preserves content
//!
//! # Examples
//!
//! ```rust
//! use draftloom_core::{models::FieldDefinition, outline::Outline};
//!
//! # fn example() -> draftloom_core::Result<()> {
//! let mut outline = Outline::new();
//! let section = outline.add_section("Introduction", "");
//! let fields = outline.add_fields(
//!     &section.id,
//!     vec![
//!         FieldDefinition::new("title"),
//!         FieldDefinition::new("summary").depends_on(["title"]),
//!     ],
//! )?;
//! assert_eq!(fields[1].depends_on, vec![fields[0].id.clone()]);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use std::collections::HashSet;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    error::{OrchestratorError, Result},
    models::{Field, FieldId, FieldStatus, Progress, Section, SectionId},
};

pub mod editing;
pub mod graph;
pub mod patch;

#[cfg(test)]
mod tests;

pub use editing::{RemovedField, RemovedSection, UpdatedField};
pub use graph::DependencyGraph;
pub use patch::{FieldPatch, OutlinePatch, PatchSummary, SectionPatch};

/// Ordered tree of sections and fields for one workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OutlineData", into = "OutlineData")]
pub struct Outline {
    sections: Vec<Section>,
    confirmed: bool,
}

/// Unvalidated serialized form of an outline.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OutlineData {
    #[serde(default)]
    sections: Vec<Section>,
    #[serde(default)]
    confirmed: bool,
}

impl TryFrom<OutlineData> for Outline {
    type Error = OrchestratorError;

    fn try_from(data: OutlineData) -> Result<Self> {
        Outline::from_sections(data.sections, data.confirmed)
    }
}

impl From<Outline> for OutlineData {
    fn from(outline: Outline) -> Self {
        OutlineData {
            sections: outline.sections,
            confirmed: outline.confirmed,
        }
    }
}

impl Outline {
    /// Creates an empty, unconfirmed outline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an outline from existing records, validating every invariant.
    ///
    /// Sections and fields are sorted by their `order` (ties keep their
    /// input position) and renumbered contiguously. Any `generating` mark is
    /// reset to `pending`, since nothing can be in flight for records that
    /// were just loaded.
    ///
    /// # Errors
    ///
    /// - `Validation` for duplicate ids or dependencies on unknown fields
    /// - `Cycle` if the dependency edges contain a cycle
    pub fn from_sections(mut sections: Vec<Section>, confirmed: bool) -> Result<Self> {
        sections.sort_by_key(|s| s.order);

        let mut section_ids = HashSet::new();
        let mut field_ids = HashSet::new();
        for (index, section) in sections.iter_mut().enumerate() {
            if !section_ids.insert(section.id.clone()) {
                return Err(OrchestratorError::validation("sections")
                    .with_reason(format!("duplicate section id '{}'", section.id)));
            }
            section.order = index as u32;
            section.fields.sort_by_key(|f| f.order);
            for field in &mut section.fields {
                if !field_ids.insert(field.id.clone()) {
                    return Err(OrchestratorError::validation("fields")
                        .with_reason(format!("duplicate field id '{}'", field.id)));
                }
                field.section_id = section.id.clone();
                if field.status == FieldStatus::Generating {
                    warn!("Resetting stale generating mark on field {}", field.id);
                    field.status = FieldStatus::Pending;
                }
            }
            section.renumber_fields();
        }

        let mut outline = Outline {
            sections,
            confirmed,
        };

        for field in outline.fields() {
            for dep in &field.depends_on {
                if dep == &field.id {
                    return Err(OrchestratorError::Cycle {
                        field: field.id.clone(),
                        dependency: dep.clone(),
                    });
                }
                if !field_ids.contains(dep) {
                    return Err(OrchestratorError::validation("depends_on").with_reason(
                        format!("field '{}' depends on unknown field '{dep}'", field.id),
                    ));
                }
            }
        }
        if let Some((field, dependency)) = outline.dependency_graph().find_cycle() {
            return Err(OrchestratorError::Cycle { field, dependency });
        }

        outline.rebuild_chains();
        Ok(outline)
    }

    /// Sections in order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Looks up a section by id.
    pub fn section(&self, id: &SectionId) -> Option<&Section> {
        self.sections.iter().find(|s| &s.id == id)
    }

    /// Looks up a section by id, failing with `SectionNotFound`.
    pub fn require_section(&self, id: &SectionId) -> Result<&Section> {
        self.section(id)
            .ok_or_else(|| OrchestratorError::SectionNotFound { id: id.clone() })
    }

    /// Looks up a field by id anywhere in the outline.
    pub fn field(&self, id: &FieldId) -> Option<&Field> {
        self.fields().find(|f| &f.id == id)
    }

    /// Looks up a field by id, failing with `FieldNotFound`.
    pub fn require_field(&self, id: &FieldId) -> Result<&Field> {
        self.field(id)
            .ok_or_else(|| OrchestratorError::FieldNotFound { id: id.clone() })
    }

    /// All fields in document order (sections by order, then fields by order).
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.sections.iter().flat_map(|s| s.fields.iter())
    }

    /// Number of fields across all sections.
    pub fn field_count(&self) -> usize {
        self.sections.iter().map(|s| s.fields.len()).sum()
    }

    /// Whether the operator has confirmed the outline structure.
    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    /// Marks the outline structure as confirmed. Editing stays allowed.
    pub fn confirm(&mut self) {
        self.confirmed = true;
    }

    /// Status counts across all fields.
    pub fn progress(&self) -> Progress {
        Progress::from_fields(self.fields())
    }

    /// Fields flagged as stale, in document order.
    pub fn stale_fields(&self) -> Vec<&Field> {
        self.fields().filter(|f| f.context_stale).collect()
    }

    /// First `pending` field in document order.
    pub fn first_pending(&self) -> Option<&Field> {
        self.fields().find(|f| f.status == FieldStatus::Pending)
    }

    /// Number of `pending` fields.
    pub fn pending_count(&self) -> usize {
        self.fields()
            .filter(|f| f.status == FieldStatus::Pending)
            .count()
    }

    /// Fields currently marked `generating`.
    pub fn generating_fields(&self) -> Vec<&Field> {
        self.fields()
            .filter(|f| f.status == FieldStatus::Generating)
            .collect()
    }

    /// Snapshot of the dependency edges in document order.
    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::from_edges(self.fields().map(|f| (f.id.clone(), f.depends_on.clone())))
    }

    /// Fields that list `id` directly in their `depends_on`.
    pub fn dependents_of(&self, id: &FieldId) -> Vec<FieldId> {
        self.fields()
            .filter(|f| f.depends_on.contains(id))
            .map(|f| f.id.clone())
            .collect()
    }

    /// Transitive dependents of a field in document order, excluding itself.
    pub fn transitive_dependents(&self, id: &FieldId) -> Result<Vec<FieldId>> {
        self.require_field(id)?;
        Ok(self.dependency_graph().transitive_dependents(id))
    }

    /// The chain anchored at `head`: the head followed by its transitive
    /// dependents in document order.
    pub fn chain_members(&self, head: &FieldId) -> Result<Vec<FieldId>> {
        let mut members = vec![head.clone()];
        members.extend(self.transitive_dependents(head)?);
        Ok(members)
    }

    /// Reverts every `generating` field to `pending`, returning how many were
    /// reset. Used to recover from a run that stopped without reporting back.
    pub fn reset_generating(&mut self) -> usize {
        let mut count = 0;
        for field in self.sections.iter_mut().flat_map(|s| s.fields.iter_mut()) {
            if field.status == FieldStatus::Generating {
                field.status = FieldStatus::Pending;
                field.touch();
                count += 1;
            }
        }
        count
    }

    // ------------------------------------------------------------------
    // Crate-internal mutation used by the propagator and the workflow
    // ------------------------------------------------------------------

    pub(crate) fn field_mut(&mut self, id: &FieldId) -> Option<&mut Field> {
        self.sections
            .iter_mut()
            .flat_map(|s| s.fields.iter_mut())
            .find(|f| &f.id == id)
    }

    pub(crate) fn require_field_mut(&mut self, id: &FieldId) -> Result<&mut Field> {
        self.field_mut(id)
            .ok_or_else(|| OrchestratorError::FieldNotFound { id: id.clone() })
    }

    pub(crate) fn section_index(&self, id: &SectionId) -> Result<usize> {
        self.sections
            .iter()
            .position(|s| &s.id == id)
            .ok_or_else(|| OrchestratorError::SectionNotFound { id: id.clone() })
    }

    /// Optimistically marks a field as the single field being generated.
    pub(crate) fn mark_generating(&mut self, id: &FieldId) -> Result<()> {
        if let Some(other) = self.fields().find(|f| f.status == FieldStatus::Generating) {
            if &other.id != id {
                return Err(OrchestratorError::AlreadyRunning);
            }
        }
        let field = self.require_field_mut(id)?;
        field.status = FieldStatus::Generating;
        field.touch();
        Ok(())
    }

    /// Stores generated content and clears the field's own staleness.
    pub(crate) fn mark_completed(&mut self, id: &FieldId, content: String) -> Result<()> {
        let field = self.require_field_mut(id)?;
        field.content = Some(content);
        field.status = FieldStatus::Completed;
        field.context_stale = false;
        field.touch();
        Ok(())
    }

    pub(crate) fn mark_status(&mut self, id: &FieldId, status: FieldStatus) -> Result<()> {
        let field = self.require_field_mut(id)?;
        field.status = status;
        field.touch();
        Ok(())
    }

    pub(crate) fn clear_stale(&mut self, id: &FieldId) -> Result<()> {
        self.require_field_mut(id)?.context_stale = false;
        Ok(())
    }

    pub(crate) fn set_clarification_answer(&mut self, id: &FieldId, answer: String) -> Result<()> {
        let field = self.require_field_mut(id)?;
        field.clarification_answer = Some(answer);
        field.touch();
        Ok(())
    }

    /// Allocates `<prefix>_<n>` ids not yet present in `taken`.
    pub(crate) fn allocate_id(prefix: &str, taken: &HashSet<String>, count: usize) -> Vec<String> {
        let mut ids = Vec::with_capacity(count);
        let mut n = taken.len() + 1;
        while ids.len() < count {
            let candidate = format!("{prefix}_{n}");
            if !taken.contains(&candidate) && !ids.contains(&candidate) {
                ids.push(candidate);
            }
            n += 1;
        }
        ids
    }

    pub(crate) fn taken_field_ids(&self) -> HashSet<String> {
        self.fields().map(|f| f.id.as_str().to_string()).collect()
    }

    pub(crate) fn taken_section_ids(&self) -> HashSet<String> {
        self.sections.iter().map(|s| s.id.as_str().to_string()).collect()
    }

    pub(crate) fn renumber_sections(&mut self) {
        for (index, section) in self.sections.iter_mut().enumerate() {
            section.order = index as u32;
        }
    }

    /// Recomputes `chain_id` for every field from the current chain heads.
    ///
    /// A field reachable from several heads belongs to the first head in
    /// document order.
    pub(crate) fn rebuild_chains(&mut self) {
        let graph = self.dependency_graph();
        let heads: Vec<FieldId> = self
            .fields()
            .filter(|f| f.is_chain_head)
            .map(|f| f.id.clone())
            .collect();

        for field in self.sections.iter_mut().flat_map(|s| s.fields.iter_mut()) {
            field.chain_id = None;
        }

        for head in heads {
            let mut members = vec![head.clone()];
            members.extend(graph.transitive_dependents(&head));
            for member in members {
                if let Some(field) = self.field_mut(&member) {
                    if field.chain_id.is_none() {
                        field.chain_id = Some(head.clone());
                    }
                }
            }
        }
    }
}
