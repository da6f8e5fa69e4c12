//! Status enumerations for fields and sections.

use std::str::FromStr;

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Type-safe enumeration of field statuses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum FieldStatus {
    /// Field has not been generated yet
    #[default]
    Pending,

    /// Field is the single field currently being generated
    Generating,

    /// Field holds generated or manually written content
    Completed,

    /// Last generation attempt failed
    Error,
}

impl FromStr for FieldStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(FieldStatus::Pending),
            "generating" => Ok(FieldStatus::Generating),
            "completed" => Ok(FieldStatus::Completed),
            "error" => Ok(FieldStatus::Error),
            _ => Err(format!("Invalid field status: {s}")),
        }
    }
}

impl FieldStatus {
    /// Wire representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldStatus::Pending => "pending",
            FieldStatus::Generating => "generating",
            FieldStatus::Completed => "completed",
            FieldStatus::Error => "error",
        }
    }

    /// Get status with consistent icon formatting for display.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use draftloom_core::models::FieldStatus;
    ///
    /// assert_eq!(FieldStatus::Completed.with_icon(), "✓ Completed");
    /// assert_eq!(FieldStatus::Generating.with_icon(), "⟳ Generating");
    /// assert_eq!(FieldStatus::Error.with_icon(), "✕ Failed");
    /// assert_eq!(FieldStatus::Pending.with_icon(), "○ Pending");
    /// ```
    pub fn with_icon(&self) -> &'static str {
        match self {
            FieldStatus::Completed => "✓ Completed",
            FieldStatus::Generating => "⟳ Generating",
            FieldStatus::Error => "✕ Failed",
            FieldStatus::Pending => "○ Pending",
        }
    }
}

/// Status of a section, derived from the statuses of its fields.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    /// No field is completed (or the section is empty)
    #[default]
    Pending,

    /// Some, but not all, fields are completed
    InProgress,

    /// Every field is completed
    Completed,
}

impl SectionStatus {
    /// Derive a section status from its field statuses.
    pub fn derive<'a>(statuses: impl IntoIterator<Item = &'a FieldStatus>) -> Self {
        let (mut total, mut completed) = (0usize, 0usize);
        for status in statuses {
            total += 1;
            if *status == FieldStatus::Completed {
                completed += 1;
            }
        }
        match completed {
            0 => SectionStatus::Pending,
            n if n == total => SectionStatus::Completed,
            _ => SectionStatus::InProgress,
        }
    }

    /// Wire representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionStatus::Pending => "pending",
            SectionStatus::InProgress => "in_progress",
            SectionStatus::Completed => "completed",
        }
    }
}

impl FromStr for SectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(SectionStatus::Pending),
            "in_progress" | "inprogress" => Ok(SectionStatus::InProgress),
            "completed" => Ok(SectionStatus::Completed),
            _ => Err(format!("Invalid section status: {s}")),
        }
    }
}

/// Shape of the content a field is expected to hold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// A single paragraph of text
    #[default]
    Text,

    /// A list of items
    List,

    /// Free-form content
    Freeform,
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(FieldType::Text),
            "list" => Ok(FieldType::List),
            "freeform" => Ok(FieldType::Freeform),
            _ => Err(format!("Invalid field type: {s}")),
        }
    }
}

impl FieldType {
    /// Wire representation of the field type.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::List => "list",
            FieldType::Freeform => "freeform",
        }
    }
}
