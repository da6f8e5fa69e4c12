//! Staleness propagation over reverse dependency edges.
//!
//! When a field's content changes, every field transitively depending on it
//! was generated from inputs that no longer hold. Propagation flags those
//! fields with `context_stale` and never touches their content. Fields that
//! are `pending` have nothing to go stale, and a `generating` field picks up
//! the new inputs when its call returns, so both are skipped.

use std::collections::HashSet;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    models::{FieldId, FieldStatus},
    outline::Outline,
};

/// Fields touched by one propagation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StalenessReport {
    /// Field whose change triggered the propagation
    pub origin: FieldId,
    /// Dependents now flagged stale, in document order
    pub marked: Vec<FieldId>,
    /// Dependents left alone because they are pending or generating
    pub skipped: Vec<FieldId>,
}

impl StalenessReport {
    /// Number of fields flagged stale.
    pub fn count(&self) -> usize {
        self.marked.len()
    }
}

/// Flags every transitive dependent of `origin` as stale.
///
/// Running it twice yields the same marked set.
///
/// # Errors
///
/// `FieldNotFound` if `origin` is not in the outline.
pub fn propagate(outline: &mut Outline, origin: &FieldId) -> Result<StalenessReport> {
    propagate_excluding(outline, origin, &HashSet::new())
}

/// Like [`propagate`], but leaves the fields in `exclude` untouched.
///
/// Chain regeneration uses this so members still to be regenerated are not
/// flagged by their predecessors.
pub fn propagate_excluding(
    outline: &mut Outline,
    origin: &FieldId,
    exclude: &HashSet<FieldId>,
) -> Result<StalenessReport> {
    let dependents = outline.transitive_dependents(origin)?;
    let targets = dependents.into_iter().filter(|id| !exclude.contains(id));
    let (marked, skipped) = mark(outline, targets);

    if !marked.is_empty() {
        debug!("Field {origin} changed; {} dependent(s) now stale", marked.len());
    }
    Ok(StalenessReport {
        origin: origin.clone(),
        marked,
        skipped,
    })
}

/// Flags the given fields stale unless they are pending or generating.
/// Unknown ids are ignored.
pub(crate) fn mark(
    outline: &mut Outline,
    ids: impl IntoIterator<Item = FieldId>,
) -> (Vec<FieldId>, Vec<FieldId>) {
    let mut marked = Vec::new();
    let mut skipped = Vec::new();
    for id in ids {
        let Some(field) = outline.field_mut(&id) else {
            continue;
        };
        match field.status {
            FieldStatus::Pending | FieldStatus::Generating => skipped.push(id),
            FieldStatus::Completed | FieldStatus::Error => {
                field.context_stale = true;
                marked.push(id);
            }
        }
    }
    (marked, skipped)
}
