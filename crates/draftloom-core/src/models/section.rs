//! Section model definition and related functionality.

use serde::{Deserialize, Serialize};

use super::{Field, FieldId, FieldStatus, SectionId, SectionStatus};

/// An ordered group of fields within an outline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Section {
    /// Unique identifier of the section
    pub id: SectionId,

    /// Title of the section
    pub name: String,

    /// What the section covers
    #[serde(default)]
    pub description: String,

    /// Position of the section within the outline (0-indexed, contiguous)
    pub order: u32,

    /// Fields in order
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Section {
    pub(crate) fn new(id: SectionId, name: String, description: String, order: u32) -> Self {
        Self {
            id,
            name,
            description,
            order,
            fields: Vec::new(),
        }
    }

    /// Status derived from the section's fields.
    pub fn status(&self) -> SectionStatus {
        SectionStatus::derive(self.fields.iter().map(|f| &f.status))
    }

    /// Looks up a field of this section by id.
    pub fn field(&self, id: &FieldId) -> Option<&Field> {
        self.fields.iter().find(|f| &f.id == id)
    }

    /// Looks up a field of this section by name.
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Number of completed fields.
    pub fn completed_count(&self) -> usize {
        self.fields
            .iter()
            .filter(|f| f.status == FieldStatus::Completed)
            .count()
    }

    /// Renumbers field orders contiguously from zero in current position.
    pub(crate) fn renumber_fields(&mut self) {
        for (index, field) in self.fields.iter_mut().enumerate() {
            field.order = index as u32;
        }
    }
}
