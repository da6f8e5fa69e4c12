//! Regeneration of a field and everything downstream of it.

use std::collections::HashSet;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::{SchedulerState, Workflow, WorkflowEvent};
use crate::{
    error::{OrchestratorError, Result},
    generator::{ClarificationRequest, FieldGenerator, GenerationOutcome},
    models::FieldId,
    staleness,
};

/// Why a chain regeneration stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stop", rename_all = "snake_case")]
pub enum ChainStop {
    /// Every member was regenerated
    Completed,
    /// A pause request was honored between members
    Paused,
    /// The generator asked a question about a member
    AwaitingClarification { clarification: ClarificationRequest },
    /// A member failed; later members were left untouched
    Failed { field_id: FieldId, reason: String },
}

/// Progress of a chain regeneration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
    pub head: FieldId,
    /// Members regenerated successfully, in order
    pub regenerated: Vec<FieldId>,
    /// Head plus its transitive dependents
    pub total_in_chain: usize,
    pub stop: ChainStop,
}

impl ChainReport {
    pub fn regenerated_count(&self) -> usize {
        self.regenerated.len()
    }

    pub fn is_complete(&self) -> bool {
        self.stop == ChainStop::Completed
    }
}

/// Result of regenerating a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegenerateReport {
    pub field_id: FieldId,
    /// Dependents flagged stale by the new content
    pub downstream_stale_count: usize,
    /// Set when the generator asked a question instead of producing content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification: Option<ClarificationRequest>,
}

impl<G: FieldGenerator> Workflow<G> {
    /// Regenerates `head` and its transitive dependents in document order.
    ///
    /// Members still to be regenerated are not flagged stale by their
    /// predecessors; fields outside the chain are. A failure stops the chain
    /// and is reported in [`ChainReport::stop`] rather than as an error.
    /// When a pause or a question stops the chain, the completed members it
    /// did not reach are flagged stale.
    ///
    /// # Errors
    ///
    /// - `Conflict` unless `confirmed`, since completed content is overwritten
    /// - `FieldNotFound` for an unknown head
    /// - `InvalidState` while a clarification is pending
    /// - `AlreadyRunning` if another generation is in flight
    pub async fn regenerate_chain(&mut self, head: &FieldId, confirmed: bool) -> Result<ChainReport> {
        if !confirmed {
            return Err(OrchestratorError::conflict(format!(
                "regenerating the chain at '{head}' overwrites completed content; confirm to proceed"
            )));
        }
        self.ensure_not_awaiting("regenerate a chain")?;
        let members = self.outline.chain_members(head)?;
        let _guard = self.control.try_acquire()?;
        self.control.resume();
        self.outline.reset_generating();
        self.set_state(SchedulerState::Running);

        let total = members.len();
        let in_chain: HashSet<FieldId> = members.iter().cloned().collect();
        info!("Regenerating chain at {head} ({total} fields)");

        let mut regenerated = Vec::new();
        let mut stop = ChainStop::Completed;
        for member in &members {
            if self.control.is_paused() {
                stop = ChainStop::Paused;
                break;
            }

            match self.regenerate_one(member).await? {
                RegenerateStep::Completed(content) => {
                    self.complete_field(member, content, &in_chain)?;
                    regenerated.push(member.clone());
                    self.emit(WorkflowEvent::ChainProgress {
                        head: head.clone(),
                        regenerated: regenerated.len(),
                        total,
                    });
                }
                RegenerateStep::Clarification(clarification) => {
                    self.await_clarification(clarification.clone())?;
                    stop = ChainStop::AwaitingClarification { clarification };
                    break;
                }
                RegenerateStep::Failed(reason) => {
                    // Surfaced through the report instead of an error.
                    self.fail_field(member, reason.clone())?;
                    stop = ChainStop::Failed {
                        field_id: member.clone(),
                        reason,
                    };
                    break;
                }
            }
        }

        if matches!(stop, ChainStop::Paused | ChainStop::AwaitingClarification { .. }) {
            self.flag_unprocessed_members(head, &members, &regenerated);
        }

        match &stop {
            ChainStop::Completed => self.set_state(SchedulerState::Idle),
            ChainStop::Paused => self.set_state(SchedulerState::Paused),
            ChainStop::AwaitingClarification { .. } | ChainStop::Failed { .. } => {}
        }
        info!(
            "Chain at {head}: {}/{total} regenerated",
            regenerated.len()
        );
        Ok(ChainReport {
            head: head.clone(),
            regenerated,
            total_in_chain: total,
            stop,
        })
    }

    /// Regenerates one field and flags all of its dependents stale.
    ///
    /// # Errors
    ///
    /// - `FieldNotFound` for an unknown id
    /// - `InvalidState` while a clarification is pending
    /// - `AlreadyRunning` if another generation is in flight
    /// - `GenerationFailure` if the generator fails; the field is marked
    ///   `error`
    pub async fn regenerate_field(&mut self, field_id: &FieldId) -> Result<RegenerateReport> {
        self.ensure_not_awaiting("regenerate a field")?;
        self.outline.require_field(field_id)?;
        let _guard = self.control.try_acquire()?;
        self.outline.reset_generating();

        let outcome = self.regenerate_one(field_id).await?;
        let report = match outcome {
            RegenerateStep::Completed(content) => {
                let stale = self.complete_field(field_id, content, &HashSet::new())?;
                self.set_state(SchedulerState::Idle);
                RegenerateReport {
                    field_id: field_id.clone(),
                    downstream_stale_count: stale.count(),
                    clarification: None,
                }
            }
            RegenerateStep::Clarification(clarification) => {
                self.await_clarification(clarification.clone())?;
                RegenerateReport {
                    field_id: field_id.clone(),
                    downstream_stale_count: 0,
                    clarification: Some(clarification),
                }
            }
            RegenerateStep::Failed(reason) => return Err(self.fail_field(field_id, reason)?),
        };
        Ok(report)
    }

    /// Flags the members a stopped chain did not reach. They were built from
    /// the head's old content and a later run will not pick them up again.
    fn flag_unprocessed_members(
        &mut self,
        head: &FieldId,
        members: &[FieldId],
        regenerated: &[FieldId],
    ) {
        if regenerated.is_empty() {
            return;
        }
        let done: HashSet<&FieldId> = regenerated.iter().collect();
        let rest = members.iter().filter(|m| !done.contains(m)).cloned();
        let (marked, _) = staleness::mark(&mut self.outline, rest);
        if !marked.is_empty() {
            debug!("Chain at {head} stopped early; {} member(s) left stale", marked.len());
            self.emit(WorkflowEvent::FieldsStale {
                origin: head.clone(),
                fields: marked,
            });
        }
    }

    /// Clears the field's staleness, marks it `generating` and calls the
    /// generator with the regeneration flag set.
    async fn regenerate_one(&mut self, field_id: &FieldId) -> Result<RegenerateStep> {
        self.outline.clear_stale(field_id)?;
        self.outline.mark_generating(field_id)?;
        self.emit(WorkflowEvent::FieldStarted {
            field_id: field_id.clone(),
        });

        if let Some(clarification) = self.unanswered_prompt(field_id) {
            return Ok(RegenerateStep::Clarification(clarification));
        }

        let request = self.build_request(field_id, true)?;
        debug!("Regenerating field {field_id}");
        Ok(match self.call_generator(request).await {
            GenerationOutcome::Completed { content } => RegenerateStep::Completed(content),
            GenerationOutcome::NeedsClarification { clarification } => {
                RegenerateStep::Clarification(self.bind_clarification(field_id, clarification))
            }
            GenerationOutcome::Failed { reason } => RegenerateStep::Failed(reason),
        })
    }
}

enum RegenerateStep {
    Completed(String),
    Clarification(ClarificationRequest),
    Failed(String),
}
