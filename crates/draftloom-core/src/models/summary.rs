//! Progress summary across an outline.

use serde::{Deserialize, Serialize};

use super::{Field, FieldStatus};

/// Counts of fields per status across an outline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Progress {
    /// Total number of fields
    pub total: usize,

    /// Fields holding completed content
    pub completed: usize,

    /// Fields waiting to be generated
    pub pending: usize,

    /// Fields currently being generated (0 or 1)
    pub generating: usize,

    /// Fields whose last generation failed
    pub failed: usize,

    /// Fields flagged as stale
    pub stale: usize,
}

impl Progress {
    /// Tally the statuses of the given fields.
    pub fn from_fields<'a>(fields: impl IntoIterator<Item = &'a Field>) -> Self {
        let mut progress = Progress::default();
        for field in fields {
            progress.total += 1;
            match field.status {
                FieldStatus::Completed => progress.completed += 1,
                FieldStatus::Pending => progress.pending += 1,
                FieldStatus::Generating => progress.generating += 1,
                FieldStatus::Error => progress.failed += 1,
            }
            if field.context_stale {
                progress.stale += 1;
            }
        }
        progress
    }

    /// Completed share of all fields, rounded down to a whole percent.
    pub fn percentage(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed * 100) / self.total) as u8
    }
}
