//! The generation workflow: an outline plus the machinery that fills it.
//!
//! A [`Workflow`] owns its [`Outline`], its [`FieldGenerator`] and the
//! scheduler state. Every operation that writes field status or content takes
//! `&mut self`, so the workflow is the only writer of generation state. Two
//! things are shared with other tasks:
//!
//! - the [`GenerationControl`] handle, through which a pause can be requested
//!   while a generation call is in flight
//! - the event channel, see [`Workflow::subscribe`]
//!
//! ## Submodules
//!
//! - [`builder`]: configuration and construction
//! - [`scheduler`]: one-at-a-time generation of pending fields
//! - [`clarification`]: answering or skipping generator questions
//! - [`editing`]: outline edits that keep the scheduler state consistent
//! - [`chain`]: regeneration of a field and its dependents
//!
//! # Examples
//!
//! ```rust
//! use async_trait::async_trait;
//! use draftloom_core::{
//!     generator::{FieldGenerator, GenerationOutcome, GenerationRequest, GeneratorError},
//!     models::FieldDefinition,
//!     workflow::{StopReason, WorkflowBuilder},
//! };
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl FieldGenerator for Echo {
//!     async fn generate_field(
//!         &self,
//!         request: GenerationRequest,
//!     ) -> Result<GenerationOutcome, GeneratorError> {
//!         Ok(GenerationOutcome::Completed {
//!             content: format!("About {}", request.field_name),
//!         })
//!     }
//! }
//!
//! # async fn example() -> draftloom_core::Result<()> {
//! let mut workflow = WorkflowBuilder::new().build(Echo)?;
//! let section = workflow.outline_mut().add_section("Intro", "");
//! workflow
//!     .outline_mut()
//!     .add_fields(&section.id, vec![FieldDefinition::new("title")])?;
//!
//! let report = workflow.run().await?;
//! assert_eq!(report.generated.len(), 1);
//! assert_eq!(report.stop, StopReason::Completed);
//! # Ok(())
//! # }
//! ```

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{
    error::{OrchestratorError, Result},
    generator::{
        ClarificationRequest, DependencyContent, FieldGenerator, GenerationOutcome,
        GenerationRequest,
    },
    models::{FieldId, FieldStatus, WorkflowId},
    outline::Outline,
};

pub mod builder;
pub mod chain;
pub mod clarification;
pub mod editing;
pub mod scheduler;

#[cfg(test)]
mod tests;

pub use builder::{WorkflowBuilder, WorkflowConfig};
pub use chain::{ChainReport, ChainStop, RegenerateReport};
pub use scheduler::{RunReport, StepOutcome, StopReason};

/// State of the generation scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SchedulerState {
    /// Nothing is running
    #[default]
    Idle,
    /// A run is working through pending fields
    Running,
    /// A pause request stopped the run before the next call
    Paused,
    /// The generator asked a question that must be answered first
    AwaitingClarification { clarification: ClarificationRequest },
}

impl SchedulerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Running => "running",
            SchedulerState::Paused => "paused",
            SchedulerState::AwaitingClarification { .. } => "awaiting clarification",
        }
    }

    /// The pending question, if any.
    pub fn clarification(&self) -> Option<&ClarificationRequest> {
        match self {
            SchedulerState::AwaitingClarification { clarification } => Some(clarification),
            _ => None,
        }
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress notifications published by a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkflowEvent {
    StateChanged { state: SchedulerState },
    FieldStarted { field_id: FieldId },
    FieldCompleted { field_id: FieldId },
    FieldFailed { field_id: FieldId, reason: String },
    ClarificationRequested { clarification: ClarificationRequest },
    FieldsStale { origin: FieldId, fields: Vec<FieldId> },
    ChainProgress { head: FieldId, regenerated: usize, total: usize },
}

#[derive(Debug, Default)]
struct ControlFlags {
    paused: AtomicBool,
    busy: AtomicBool,
}

/// Cloneable handle for pausing a workflow from another task.
///
/// Pausing is cooperative: the flag is read right before each generation
/// call and right after each call returns. A call already dispatched always
/// completes.
#[derive(Debug, Clone, Default)]
pub struct GenerationControl {
    flags: Arc<ControlFlags>,
}

impl GenerationControl {
    /// Requests a pause at the next checkpoint.
    pub fn pause(&self) {
        self.flags.paused.store(true, Ordering::SeqCst);
    }

    /// Clears a pause request.
    pub fn resume(&self) {
        self.flags.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.flags.paused.load(Ordering::SeqCst)
    }

    /// Whether a run, single-field regeneration or chain is in flight.
    pub fn is_busy(&self) -> bool {
        self.flags.busy.load(Ordering::SeqCst)
    }

    /// Claims the single generation slot.
    pub(crate) fn try_acquire(&self) -> Result<FlightGuard> {
        self.flags
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| OrchestratorError::AlreadyRunning)?;
        Ok(FlightGuard {
            flags: Arc::clone(&self.flags),
        })
    }
}

/// Releases the generation slot when dropped.
pub(crate) struct FlightGuard {
    flags: Arc<ControlFlags>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.flags.busy.store(false, Ordering::SeqCst);
    }
}

/// Serializable state of one workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub workflow_id: WorkflowId,
    pub outline: Outline,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_clarification: Option<ClarificationRequest>,
}

impl WorkflowSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a snapshot, validating the outline invariants.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// An outline being generated field by field.
pub struct Workflow<G> {
    id: WorkflowId,
    outline: Outline,
    state: SchedulerState,
    generator: G,
    control: GenerationControl,
    config: WorkflowConfig,
    events: broadcast::Sender<WorkflowEvent>,
}

impl<G> fmt::Debug for Workflow<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("fields", &self.outline.field_count())
            .finish_non_exhaustive()
    }
}

impl<G: FieldGenerator> Workflow<G> {
    pub fn id(&self) -> &WorkflowId {
        &self.id
    }

    pub fn outline(&self) -> &Outline {
        &self.outline
    }

    /// Mutable access for structural editing.
    ///
    /// Removing or rewriting a field here does not update a pending
    /// clarification; prefer [`Workflow::remove_field`] and friends, or call
    /// [`Workflow::reconcile_clarification`] afterwards.
    pub fn outline_mut(&mut self) -> &mut Outline {
        &mut self.outline
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Handle for requesting a pause from another task.
    pub fn control(&self) -> GenerationControl {
        self.control.clone()
    }

    /// Subscribes to progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    /// Requests a pause at the next checkpoint.
    pub fn pause(&self) {
        self.control.pause();
    }

    /// Captures the outline and any pending question. A question whose field
    /// is no longer pending is left out.
    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            workflow_id: self.id.clone(),
            outline: self.outline.clone(),
            pending_clarification: self
                .state
                .clarification()
                .filter(|c| clarification::still_awaited(&self.outline, c))
                .cloned(),
        }
    }

    pub(crate) fn emit(&self, event: WorkflowEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub(crate) fn set_state(&mut self, state: SchedulerState) {
        if self.state != state {
            debug!("Workflow {} is now {}", self.id, state);
            self.state = state.clone();
            self.emit(WorkflowEvent::StateChanged { state });
        }
    }

    /// Rejects starting work while a question is open.
    pub(crate) fn ensure_not_awaiting(&self, operation: &'static str) -> Result<()> {
        if self.state.clarification().is_some() {
            return Err(OrchestratorError::invalid_state(operation, &self.state));
        }
        Ok(())
    }

    /// Builds the generator request for a field from the current outline.
    pub(crate) fn build_request(
        &self,
        field_id: &FieldId,
        regenerate: bool,
    ) -> Result<GenerationRequest> {
        let field = self.outline.require_field(field_id)?;
        let section = self.outline.require_section(&field.section_id)?;

        let mut dependencies = Vec::new();
        let mut unmet = Vec::new();
        for dep in &field.depends_on {
            match self.outline.field(dep) {
                Some(d) if d.status == FieldStatus::Completed => {
                    dependencies.push(DependencyContent {
                        field_id: d.id.clone(),
                        name: d.name.clone(),
                        content: d.content.clone().unwrap_or_default(),
                    });
                }
                _ => unmet.push(dep.as_str()),
            }
        }
        if !unmet.is_empty() && self.config.warn_on_dependency_order {
            warn!(
                "Generating field {} before its dependencies are completed: {}",
                field.id,
                unmet.join(", ")
            );
        }

        Ok(GenerationRequest::for_field(
            &self.id,
            field,
            &section.name,
            dependencies,
            regenerate,
        ))
    }

    /// Calls the generator, folding transport errors into a failed outcome.
    pub(crate) async fn call_generator(&self, request: GenerationRequest) -> GenerationOutcome {
        let field_id = request.field_id.clone();
        match self.generator.generate_field(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Generator error for field {field_id}: {e}");
                GenerationOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// The field's own clarification prompt, if it has not been answered.
    /// Raised without calling the generator.
    pub(crate) fn unanswered_prompt(&self, field_id: &FieldId) -> Option<ClarificationRequest> {
        let field = self.outline.field(field_id)?;
        if !field.needs_clarification() {
            return None;
        }
        Some(ClarificationRequest {
            field_id: field.id.clone(),
            field_name: field.name.clone(),
            question: field.clarification_prompt.clone().unwrap_or_default(),
        })
    }

    /// Binds a generator question to the field that was actually asked for.
    pub(crate) fn bind_clarification(
        &self,
        field_id: &FieldId,
        reported: ClarificationRequest,
    ) -> ClarificationRequest {
        if &reported.field_id != field_id {
            warn!(
                "Generator asked about field {} while generating {field_id}; binding to {field_id}",
                reported.field_id
            );
        }
        let field_name = self
            .outline
            .field(field_id)
            .map(|f| f.name.clone())
            .unwrap_or(reported.field_name);
        ClarificationRequest {
            field_id: field_id.clone(),
            field_name,
            question: reported.question,
        }
    }
}
