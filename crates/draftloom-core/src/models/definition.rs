//! Field definitions: templates from which fields are instantiated.

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::FieldType;

/// Template for a field.
///
/// Definitions are only read when a field is created from them. Their
/// `depends_on` entries may name either existing field ids or the names of
/// sibling definitions; see [`crate::outline::Outline::add_fields`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct FieldDefinition {
    /// Field name, unique within the target section
    pub name: String,

    /// What the field should contain
    #[serde(default)]
    pub description: String,

    /// Expected shape of the content
    #[serde(default)]
    pub field_type: FieldType,

    /// Whether the field is required
    #[serde(default = "default_required")]
    pub required: bool,

    /// Generation hint handed to the generator
    #[serde(default)]
    pub ai_hint: String,

    /// Relative position among the definitions of one batch
    #[serde(default)]
    pub order: u32,

    /// Field ids or sibling definition names this field depends on
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Question to ask the operator before generating
    #[serde(default)]
    pub clarification_prompt: Option<String>,
}

fn default_required() -> bool {
    true
}

impl FieldDefinition {
    /// Creates a required text definition with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            field_type: FieldType::Text,
            required: true,
            ai_hint: String::new(),
            order: 0,
            depends_on: Vec::new(),
            clarification_prompt: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_type(mut self, field_type: FieldType) -> Self {
        self.field_type = field_type;
        self
    }

    pub fn with_ai_hint(mut self, hint: impl Into<String>) -> Self {
        self.ai_hint = hint.into();
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_clarification_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.clarification_prompt = Some(prompt.into());
        self
    }
}
