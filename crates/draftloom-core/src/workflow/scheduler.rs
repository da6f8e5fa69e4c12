//! Sequential generation of pending fields.
//!
//! The scheduler picks the first `pending` field in document order, marks it
//! `generating`, checks for a pause, then hands it to the generator. Document
//! order is the operator's ordering; dependencies only drive staleness.
//!
//! ```text
//! Idle ──run──▶ Running ──no pending──▶ Idle
//!                 │  ▲
//!          pause  │  │ resume
//!                 ▼  │
//!               Paused
//!
//! Running ──needs clarification──▶ AwaitingClarification ──answer──▶ Running
//! ```

use std::collections::HashSet;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::{SchedulerState, Workflow, WorkflowEvent};
use crate::{
    error::{OrchestratorError, Result},
    generator::{ClarificationRequest, FieldGenerator, GenerationOutcome},
    models::{FieldId, FieldStatus},
    staleness::{self, StalenessReport},
};

/// Result of a single scheduler step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// A field was generated
    Generated { field_id: FieldId, remaining: usize },
    /// No pending fields remain
    Idle,
    /// A pause request was observed before the generator was called
    Paused { field_id: FieldId },
    /// The field needs an answer before it can be generated
    AwaitingClarification(ClarificationRequest),
}

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    /// Every field has been processed
    Completed,
    /// A pause request was honored
    Paused,
    /// The generator asked a question
    AwaitingClarification { clarification: ClarificationRequest },
}

/// Summary of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Fields generated during the run, in order
    pub generated: Vec<FieldId>,
    /// Pending fields left when the run stopped
    pub remaining: usize,
    pub stop: StopReason,
}

impl<G: FieldGenerator> Workflow<G> {
    /// Generates the next pending field.
    ///
    /// A pause requested while idle or running is honored before the call
    /// and leaves the workflow `Paused`. Stepping from `Paused` clears the
    /// request, so the following call generates one field.
    ///
    /// # Errors
    ///
    /// - `InvalidState` while a clarification is pending
    /// - `AlreadyRunning` if another generation is in flight
    /// - `GenerationFailure` if the generator fails; the field is marked
    ///   `error`
    pub async fn generate_next(&mut self) -> Result<StepOutcome> {
        self.ensure_not_awaiting("generate")?;
        let _guard = self.control.try_acquire()?;
        if self.state == SchedulerState::Paused {
            self.control.resume();
        }
        self.set_state(SchedulerState::Running);

        let outcome = match self.step(None).await {
            Ok(outcome) => outcome,
            Err(e) => {
                if self.state == SchedulerState::Running {
                    self.set_state(SchedulerState::Idle);
                }
                return Err(e);
            }
        };
        if let StepOutcome::Generated { remaining, .. } = &outcome {
            let next = if self.control.is_paused() {
                SchedulerState::Paused
            } else if *remaining == 0 {
                SchedulerState::Idle
            } else {
                SchedulerState::Running
            };
            self.set_state(next);
        }
        Ok(outcome)
    }

    /// Generates pending fields until none remain, a pause is requested, the
    /// generator asks a question or a generation fails.
    ///
    /// Starting a run clears any earlier pause request.
    ///
    /// # Errors
    ///
    /// Same as [`Workflow::generate_next`].
    pub async fn run(&mut self) -> Result<RunReport> {
        self.ensure_not_awaiting("run")?;
        self.run_from(None).await
    }

    /// Resumes a paused run.
    pub async fn resume(&mut self) -> Result<RunReport> {
        if self.state != SchedulerState::Paused {
            debug!("Resume requested while {}; starting a run", self.state);
        }
        self.run().await
    }

    /// Runs the loop, generating `first` before anything else when given.
    pub(crate) async fn run_from(&mut self, first: Option<FieldId>) -> Result<RunReport> {
        let _guard = self.control.try_acquire()?;
        self.control.resume();
        self.set_state(SchedulerState::Running);

        let mut generated = Vec::new();
        let mut target = first;
        let stop = loop {
            match self.step(target.take()).await? {
                StepOutcome::Generated { field_id, remaining } => {
                    generated.push(field_id);
                    if self.control.is_paused() {
                        self.set_state(SchedulerState::Paused);
                        break StopReason::Paused;
                    }
                    if remaining == 0 {
                        self.set_state(SchedulerState::Idle);
                        break StopReason::Completed;
                    }
                }
                StepOutcome::Idle => break StopReason::Completed,
                StepOutcome::Paused { .. } => break StopReason::Paused,
                StepOutcome::AwaitingClarification(clarification) => {
                    break StopReason::AwaitingClarification { clarification };
                }
            }
        };

        let remaining = self.outline.pending_count();
        info!(
            "Run stopped ({}): {} generated, {remaining} pending",
            match &stop {
                StopReason::Completed => "completed",
                StopReason::Paused => "paused",
                StopReason::AwaitingClarification { .. } => "awaiting clarification",
            },
            generated.len()
        );
        Ok(RunReport {
            generated,
            remaining,
            stop,
        })
    }

    /// One pass of the scheduling contract. The caller holds the flight guard.
    async fn step(&mut self, target: Option<FieldId>) -> Result<StepOutcome> {
        // Nothing is in flight, so any generating mark is a leftover
        // optimistic mark from a paused step.
        let reverted = self.outline.reset_generating();
        if reverted > 0 {
            debug!("Reverted {reverted} leftover generating mark(s) to pending");
        }

        let next = match target {
            Some(id) => Some(self.outline.require_field(&id)?.id.clone()),
            None => self.outline.first_pending().map(|f| f.id.clone()),
        };
        let Some(field_id) = next else {
            self.set_state(SchedulerState::Idle);
            return Ok(StepOutcome::Idle);
        };

        self.outline.mark_generating(&field_id)?;
        self.emit(WorkflowEvent::FieldStarted {
            field_id: field_id.clone(),
        });

        if self.control.is_paused() {
            self.set_state(SchedulerState::Paused);
            return Ok(StepOutcome::Paused { field_id });
        }

        if let Some(clarification) = self.unanswered_prompt(&field_id) {
            return self.await_clarification(clarification);
        }

        let request = self.build_request(&field_id, false)?;
        debug!("Generating field {field_id}");
        match self.call_generator(request).await {
            GenerationOutcome::Completed { content } => {
                self.complete_field(&field_id, content, &HashSet::new())?;
                Ok(StepOutcome::Generated {
                    field_id,
                    remaining: self.outline.pending_count(),
                })
            }
            GenerationOutcome::NeedsClarification { clarification } => {
                let clarification = self.bind_clarification(&field_id, clarification);
                self.await_clarification(clarification)
            }
            GenerationOutcome::Failed { reason } => Err(self.fail_field(&field_id, reason)?),
        }
    }

    /// Stores generated content and flags the field's dependents stale,
    /// except those in `exclude`.
    pub(crate) fn complete_field(
        &mut self,
        field_id: &FieldId,
        content: String,
        exclude: &HashSet<FieldId>,
    ) -> Result<StalenessReport> {
        self.outline.mark_completed(field_id, content)?;
        let report = staleness::propagate_excluding(&mut self.outline, field_id, exclude)?;
        self.emit(WorkflowEvent::FieldCompleted {
            field_id: field_id.clone(),
        });
        if !report.marked.is_empty() {
            self.emit(WorkflowEvent::FieldsStale {
                origin: field_id.clone(),
                fields: report.marked.clone(),
            });
        }
        Ok(report)
    }

    /// Marks the field `error`, stops and returns the failure to surface.
    ///
    /// # Errors
    ///
    /// `FieldNotFound` if the status cannot be written.
    pub(crate) fn fail_field(
        &mut self,
        field_id: &FieldId,
        reason: String,
    ) -> Result<OrchestratorError> {
        self.outline.mark_status(field_id, FieldStatus::Error)?;
        self.emit(WorkflowEvent::FieldFailed {
            field_id: field_id.clone(),
            reason: reason.clone(),
        });
        self.set_state(SchedulerState::Idle);
        Ok(OrchestratorError::GenerationFailure {
            field_id: field_id.clone(),
            reason,
        })
    }

    /// Returns the field to `pending` and parks the scheduler on a question.
    pub(crate) fn await_clarification(
        &mut self,
        clarification: ClarificationRequest,
    ) -> Result<StepOutcome> {
        self.outline
            .mark_status(&clarification.field_id, FieldStatus::Pending)?;
        info!(
            "Field {} needs clarification: {}",
            clarification.field_id, clarification.question
        );
        self.emit(WorkflowEvent::ClarificationRequested {
            clarification: clarification.clone(),
        });
        self.set_state(SchedulerState::AwaitingClarification {
            clarification: clarification.clone(),
        });
        Ok(StepOutcome::AwaitingClarification(clarification))
    }
}
