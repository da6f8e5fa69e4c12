//! Display implementations for domain models.
//!
//! Markdown output for the outline, its sections and fields, kept apart from
//! the model definitions.

use std::fmt;

use super::datetime::LocalDateTime;
use crate::{
    models::{Field, FieldStatus, FieldType, Progress, Section, SectionStatus},
    outline::Outline,
};

impl fmt::Display for FieldStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for SectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} fields completed ({}%)",
            self.completed,
            self.total,
            self.percentage()
        )?;
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        if self.stale > 0 {
            write!(f, ", {} stale", self.stale)?;
        }
        Ok(())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "### {} ({})", self.label(), self.status.with_icon())?;
        if self.context_stale {
            write!(f, " ⚠ stale")?;
        }
        writeln!(f)?;
        writeln!(f)?;

        writeln!(f, "- ID: {}", self.id)?;
        writeln!(f, "- Type: {}", self.field_type)?;
        if self.is_chain_head {
            writeln!(f, "- Chain head")?;
        } else if let Some(chain) = &self.chain_id {
            writeln!(f, "- Chain: {chain}")?;
        }
        if !self.depends_on.is_empty() {
            let deps: Vec<&str> = self.depends_on.iter().map(|d| d.as_str()).collect();
            writeln!(f, "- Depends on: {}", deps.join(", "))?;
        }
        if let Some(answer) = &self.clarification_answer {
            writeln!(f, "- Clarification: {answer}")?;
        }
        writeln!(f, "- Updated: {}", LocalDateTime(&self.updated_at))?;

        if !self.description.is_empty() {
            writeln!(f)?;
            writeln!(f, "{}", self.description)?;
        }

        if let Some(content) = &self.content {
            writeln!(f)?;
            writeln!(f, "#### Content")?;
            writeln!(f)?;
            writeln!(f, "{content}")?;
        }
        writeln!(f)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "## {}. {} ({}, {}/{})",
            self.order + 1,
            self.name,
            self.status(),
            self.completed_count(),
            self.fields.len()
        )?;
        writeln!(f)?;
        writeln!(f, "- ID: {}", self.id)?;
        if !self.description.is_empty() {
            writeln!(f)?;
            writeln!(f, "{}", self.description)?;
        }
        writeln!(f)?;

        if self.fields.is_empty() {
            writeln!(f, "No fields in this section.")?;
            writeln!(f)?;
        }
        for field in &self.fields {
            write!(f, "{field}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Outline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_confirmed() {
            "confirmed"
        } else {
            "draft"
        };
        writeln!(f, "# Outline ({state})")?;
        writeln!(f)?;
        writeln!(f, "{}", self.progress())?;
        writeln!(f)?;

        if self.sections().is_empty() {
            return writeln!(f, "No sections yet.");
        }
        for section in self.sections() {
            write!(f, "{section}")?;
        }
        Ok(())
    }
}
