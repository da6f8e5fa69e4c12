//! Answering or skipping the generator's questions.

use log::{info, warn};

use super::{RunReport, SchedulerState, Workflow};
use crate::{
    error::{OrchestratorError, Result},
    generator::{ClarificationRequest, FieldGenerator},
    models::{FieldId, FieldStatus},
    outline::Outline,
};

/// Whether `clarification` still refers to a pending field of `outline`.
pub(crate) fn still_awaited(outline: &Outline, clarification: &ClarificationRequest) -> bool {
    outline
        .field(&clarification.field_id)
        .is_some_and(|field| field.status == FieldStatus::Pending)
}

impl<G: FieldGenerator> Workflow<G> {
    /// The question the scheduler is waiting on, if any.
    pub fn pending_clarification(&self) -> Option<&ClarificationRequest> {
        self.state.clarification()
    }

    /// Drops the pending question once its field was removed or is no longer
    /// pending, returning the scheduler to `Idle`. Returns the dropped
    /// question.
    ///
    /// The editing methods on [`Workflow`] call this; edits made through
    /// [`Workflow::outline_mut`] should be followed by it.
    pub fn reconcile_clarification(&mut self) -> Option<ClarificationRequest> {
        let clarification = self.state.clarification()?;
        if still_awaited(&self.outline, clarification) {
            return None;
        }
        let dropped = clarification.clone();
        warn!(
            "Dropping clarification for field {}: the field was removed or edited",
            dropped.field_id
        );
        self.set_state(SchedulerState::Idle);
        Some(dropped)
    }

    /// Answers the pending question for `field_id` and resumes generation,
    /// retrying that field before continuing in document order.
    ///
    /// # Errors
    ///
    /// - `Validation` if the answer is blank or no question is pending for
    ///   exactly this field id
    /// - `FieldNotFound` if the field was removed while the question was open
    /// - `GenerationFailure` if the answer cannot be delivered or the retried
    ///   generation fails
    pub async fn submit_answer(&mut self, field_id: &FieldId, answer: &str) -> Result<RunReport> {
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(OrchestratorError::validation("answer").with_reason("answer must not be blank"));
        }
        match self.state.clarification() {
            Some(pending) if &pending.field_id == field_id => {}
            Some(pending) => {
                return Err(OrchestratorError::validation("field_id").with_reason(format!(
                    "the pending question is for field '{}', not '{field_id}'",
                    pending.field_id
                )));
            }
            None => {
                return Err(OrchestratorError::validation("field_id")
                    .with_reason(format!("no clarification is pending for field '{field_id}'")));
            }
        }
        let field = self.outline.require_field(field_id)?;
        if field.status != FieldStatus::Pending {
            return Err(OrchestratorError::invalid_state(
                "answer a clarification for a field that is",
                field.status,
            ));
        }

        self.generator
            .submit_clarification(field_id, answer)
            .await
            .map_err(|e| OrchestratorError::GenerationFailure {
                field_id: field_id.clone(),
                reason: format!("clarification was not delivered: {e}"),
            })?;
        self.outline
            .set_clarification_answer(field_id, answer.to_string())?;
        info!("Clarification answered for field {field_id}");

        self.set_state(SchedulerState::Running);
        self.run_from(Some(field_id.clone())).await
    }

    /// Abandons the pending question. The field stays `pending` and the
    /// scheduler goes idle without resuming.
    ///
    /// # Errors
    ///
    /// `InvalidState` if no question is pending.
    pub fn skip_clarification(&mut self) -> Result<ClarificationRequest> {
        let Some(clarification) = self.state.clarification().cloned() else {
            return Err(OrchestratorError::invalid_state("skip a clarification", &self.state));
        };
        info!("Clarification skipped for field {}", clarification.field_id);
        self.set_state(SchedulerState::Idle);
        Ok(clarification)
    }
}
