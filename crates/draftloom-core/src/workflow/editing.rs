//! Outline edits that keep the scheduler state consistent.
//!
//! These forward to the [`Outline`](crate::outline::Outline) operations of
//! the same name, then drop a pending clarification whose field was removed
//! or received content.

use super::Workflow;
use crate::{
    error::Result,
    generator::FieldGenerator,
    models::{FieldId, FieldUpdate, SectionId},
    outline::{OutlinePatch, PatchSummary, RemovedField, RemovedSection, UpdatedField},
};

impl<G: FieldGenerator> Workflow<G> {
    /// See [`Outline::remove_field`](crate::outline::Outline::remove_field).
    pub fn remove_field(
        &mut self,
        section_id: &SectionId,
        field_id: &FieldId,
        confirmed: bool,
    ) -> Result<RemovedField> {
        let removed = self
            .outline
            .remove_field(section_id, field_id, confirmed)?;
        self.reconcile_clarification();
        Ok(removed)
    }

    /// See [`Outline::remove_section`](crate::outline::Outline::remove_section).
    pub fn remove_section(
        &mut self,
        section_id: &SectionId,
        confirmed: bool,
    ) -> Result<RemovedSection> {
        let removed = self.outline.remove_section(section_id, confirmed)?;
        self.reconcile_clarification();
        Ok(removed)
    }

    /// See [`Outline::update_field`](crate::outline::Outline::update_field).
    pub fn update_field(&mut self, field_id: &FieldId, update: FieldUpdate) -> Result<UpdatedField> {
        let updated = self.outline.update_field(field_id, update)?;
        self.reconcile_clarification();
        Ok(updated)
    }

    /// See [`Outline::apply_patch`](crate::outline::Outline::apply_patch).
    pub fn apply_patch(
        &mut self,
        patch: OutlinePatch,
        confirm: bool,
        allow_destructive: bool,
    ) -> Result<PatchSummary> {
        let summary = self.outline.apply_patch(patch, confirm, allow_destructive)?;
        self.reconcile_clarification();
        Ok(summary)
    }
}
