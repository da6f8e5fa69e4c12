//! Display implementations for generation and propagation reports.

use std::fmt;

use crate::{
    generator::ClarificationRequest,
    outline::PatchSummary,
    staleness::StalenessReport,
    workflow::{
        ChainReport, ChainStop, RegenerateReport, RunReport, SchedulerState, StepOutcome,
        StopReason,
    },
};

fn id_list<T: AsRef<str>>(ids: &[T]) -> String {
    ids.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for ClarificationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Clarification needed for field '{}' (ID: {}):",
            self.field_name, self.field_id
        )?;
        writeln!(f)?;
        writeln!(f, "> {}", self.question)
    }
}

impl fmt::Display for StalenessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.marked.is_empty() {
            writeln!(f, "No dependents of {} became stale.", self.origin)
        } else {
            writeln!(
                f,
                "Marked {} field(s) stale after {} changed: {}",
                self.marked.len(),
                self.origin,
                id_list(&self.marked)
            )
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Generated {
                field_id,
                remaining,
            } => writeln!(f, "Generated field {field_id}; {remaining} pending."),
            StepOutcome::Idle => writeln!(f, "No pending fields."),
            StepOutcome::Paused { field_id } => {
                writeln!(f, "Paused before generating field {field_id}.")
            }
            StepOutcome::AwaitingClarification(clarification) => write!(f, "{clarification}"),
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generated.is_empty() {
            writeln!(f, "No fields generated.")?;
        } else {
            writeln!(
                f,
                "Generated {} field(s): {}",
                self.generated.len(),
                id_list(&self.generated)
            )?;
        }
        match &self.stop {
            StopReason::Completed => writeln!(f, "All fields processed."),
            StopReason::Paused => {
                writeln!(f, "Paused with {} field(s) pending.", self.remaining)
            }
            StopReason::AwaitingClarification { clarification } => {
                writeln!(f)?;
                write!(f, "{clarification}")
            }
        }
    }
}

impl fmt::Display for ChainReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Regenerated {}/{} field(s) in the chain at {}",
            self.regenerated_count(),
            self.total_in_chain,
            self.head
        )?;
        match &self.stop {
            ChainStop::Completed => Ok(()),
            ChainStop::Paused => writeln!(f, "Paused before the next member."),
            ChainStop::AwaitingClarification { clarification } => {
                writeln!(f)?;
                write!(f, "{clarification}")
            }
            ChainStop::Failed { field_id, reason } => {
                writeln!(f, "Stopped: field {field_id} failed: {reason}")
            }
        }
    }
}

impl fmt::Display for RegenerateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(clarification) = &self.clarification {
            return write!(f, "{clarification}");
        }
        writeln!(
            f,
            "Regenerated field {}; {} downstream field(s) now stale.",
            self.field_id, self.downstream_stale_count
        )
    }
}

impl fmt::Display for PatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Outline replaced: {} added, {} removed, {} preserved.",
            self.added.len(),
            self.removed.len(),
            self.preserved
        )?;
        if !self.stale_marked.is_empty() {
            writeln!(f, "- Fields now stale: {}", id_list(&self.stale_marked))?;
        }
        Ok(())
    }
}

/// One-line scheduler status for a workflow.
pub struct SchedulerLine<'a>(pub &'a SchedulerState);

impl fmt::Display for SchedulerLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            SchedulerState::AwaitingClarification { clarification } => write!(
                f,
                "Scheduler: awaiting clarification for {} ({})",
                clarification.field_name, clarification.field_id
            ),
            state => write!(f, "Scheduler: {state}"),
        }
    }
}
