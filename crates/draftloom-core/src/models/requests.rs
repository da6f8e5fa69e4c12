//! Request structures for field modification operations.

use serde::{Deserialize, Serialize};

use super::FieldId;

/// Partial update applied to a single field.
///
/// Setting `content` is a manual edit: the field becomes completed, its own
/// staleness is cleared and its dependents are flagged stale. Setting
/// `depends_on` replaces the dependency list after a cycle check.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Vec<FieldId>>,
}

impl FieldUpdate {
    /// Update that only replaces the content.
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Update that only replaces the dependency list.
    pub fn depends_on(deps: Vec<FieldId>) -> Self {
        Self {
            depends_on: Some(deps),
            ..Default::default()
        }
    }

    /// Check if the update contains no changes.
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.display_name.is_none()
            && self.description.is_none()
            && self.depends_on.is_none()
    }
}
