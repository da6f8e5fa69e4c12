//! Result wrapper types for displaying operation outcomes.
//!
//! This module provides wrapper types that format the results of create, update,
//! and delete operations with consistent messaging and resource display.

use std::fmt;

use crate::{
    models::{Field, Section},
    outline::{RemovedField, RemovedSection, UpdatedField},
};

/// Wrapper type for displaying the result of create operations.
///
/// # Examples
///
/// ```rust
/// use draftloom_core::{display::CreateResult, outline::Outline};
///
/// let mut outline = Outline::new();
/// let section = outline.add_section("Background", "");
///
/// let output = CreateResult::new(section).to_string();
/// assert!(output.contains("Created section with ID: section_1"));
/// ```
pub struct CreateResult<T> {
    pub resource: T,
}

impl<T> CreateResult<T> {
    /// Create a new CreateResult wrapper.
    pub fn new(resource: T) -> Self {
        Self { resource }
    }
}

impl fmt::Display for CreateResult<Section> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Created section with ID: {}", self.resource.id)?;
        writeln!(f)?;
        write!(f, "{}", self.resource)
    }
}

impl fmt::Display for CreateResult<Vec<Field>> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.resource.iter().map(|field| field.id.as_str()).collect();
        writeln!(f, "Created {} field(s): {}", ids.len(), ids.join(", "))?;
        writeln!(f)?;
        for field in &self.resource {
            write!(f, "{field}")?;
        }
        Ok(())
    }
}

/// Wrapper type for displaying the result of update operations.
///
/// The wrapper can track and display specific changes made during the update.
pub struct UpdateResult<T> {
    pub resource: T,
    pub changes: Vec<String>,
}

impl<T> UpdateResult<T> {
    /// Create a new UpdateResult wrapper.
    pub fn new(resource: T) -> Self {
        Self {
            resource,
            changes: Vec::new(),
        }
    }

    /// Create an UpdateResult with a list of changes made.
    pub fn with_changes(resource: T, changes: Vec<String>) -> Self {
        Self { resource, changes }
    }
}

impl fmt::Display for UpdateResult<UpdatedField> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Updated field with ID: {}", self.resource.field.id)?;

        if !self.changes.is_empty() {
            writeln!(f)?;
            writeln!(f, "Changes made:")?;
            for change in &self.changes {
                writeln!(f, "- {change}")?;
            }
        }

        if let Some(report) = &self.resource.staleness {
            if !report.marked.is_empty() {
                writeln!(f)?;
                write!(f, "{report}")?;
            }
        }

        writeln!(f)?;
        write!(f, "{}", self.resource.field)
    }
}

/// Wrapper type for displaying the result of delete operations.
pub struct DeleteResult<T> {
    pub resource: T,
}

impl<T> DeleteResult<T> {
    /// Create a new DeleteResult wrapper.
    pub fn new(resource: T) -> Self {
        Self { resource }
    }
}

impl fmt::Display for DeleteResult<RemovedField> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let removed = &self.resource;
        writeln!(
            f,
            "Deleted field '{}' (ID: {})",
            removed.field.label(),
            removed.field.id
        )?;
        if !removed.purged_from.is_empty() {
            let ids: Vec<&str> = removed.purged_from.iter().map(|id| id.as_str()).collect();
            writeln!(f, "- Removed from dependencies of: {}", ids.join(", "))?;
        }
        if !removed.stale_marked.is_empty() {
            writeln!(f, "- Fields now stale: {}", removed.stale_marked.len())?;
        }
        Ok(())
    }
}

impl fmt::Display for DeleteResult<RemovedSection> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let removed = &self.resource;
        writeln!(
            f,
            "Deleted section '{}' (ID: {}) with {} field(s), {} completed",
            removed.section.name,
            removed.section.id,
            removed.removed_fields,
            removed.completed_fields
        )?;
        if !removed.stale_marked.is_empty() {
            writeln!(f, "- Fields now stale: {}", removed.stale_marked.len())?;
        }
        Ok(())
    }
}
