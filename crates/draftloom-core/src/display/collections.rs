//! Collection wrapper types for displaying groups of fields.

use std::fmt;

use crate::models::Field;

/// Compact listing of fields, one line each.
///
/// # Examples
///
/// ```rust
/// use draftloom_core::{display::FieldList, models::FieldDefinition, outline::Outline};
///
/// let mut outline = Outline::new();
/// let section = outline.add_section("Body", "");
/// outline
///     .add_fields(&section.id, vec![FieldDefinition::new("title")])
///     .unwrap();
///
/// let list = FieldList::new(outline.fields().collect(), "No fields.");
/// assert!(list.to_string().contains("field_1 title (○ Pending)"));
/// ```
pub struct FieldList<'a> {
    fields: Vec<&'a Field>,
    empty_message: &'static str,
}

impl<'a> FieldList<'a> {
    /// Wraps `fields`, printing `empty_message` when there are none.
    pub fn new(fields: Vec<&'a Field>, empty_message: &'static str) -> Self {
        Self {
            fields,
            empty_message,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

impl fmt::Display for FieldList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fields.is_empty() {
            return writeln!(f, "{}", self.empty_message);
        }
        for field in &self.fields {
            write!(f, "- {} {} ({})", field.id, field.label(), field.status.with_icon())?;
            if field.context_stale {
                write!(f, " ⚠ stale")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
