//! Builder for creating and configuring Workflow instances.

use jiff::Timestamp;
use log::{info, warn};
use tokio::sync::broadcast;

use super::{
    clarification::still_awaited, GenerationControl, SchedulerState, Workflow, WorkflowSnapshot,
};
use crate::{
    error::{OrchestratorError, Result},
    generator::{ClarificationRequest, FieldGenerator},
    models::WorkflowId,
    outline::Outline,
};

/// Tunables for a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Buffered events per subscriber before the oldest are dropped
    pub event_capacity: usize,
    /// Log a warning when a field is generated before its dependencies
    pub warn_on_dependency_order: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            event_capacity: 64,
            warn_on_dependency_order: true,
        }
    }
}

/// Builder for creating and configuring Workflow instances.
#[derive(Debug, Clone, Default)]
pub struct WorkflowBuilder {
    id: Option<WorkflowId>,
    outline: Option<Outline>,
    pending_clarification: Option<ClarificationRequest>,
    config: WorkflowConfig,
}

impl WorkflowBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the workflow id. Defaults to one derived from the current time.
    pub fn with_id(mut self, id: impl Into<WorkflowId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Starts from an existing outline instead of an empty one.
    pub fn with_outline(mut self, outline: Outline) -> Self {
        self.outline = Some(outline);
        self
    }

    /// Restores a previously captured snapshot.
    pub fn with_snapshot(mut self, snapshot: WorkflowSnapshot) -> Self {
        self.id = Some(snapshot.workflow_id);
        self.outline = Some(snapshot.outline);
        self.pending_clarification = snapshot.pending_clarification;
        self
    }

    pub fn with_config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    pub fn warn_on_dependency_order(mut self, enabled: bool) -> Self {
        self.config.warn_on_dependency_order = enabled;
        self
    }

    /// Builds the workflow around `generator`.
    ///
    /// # Errors
    ///
    /// `Configuration` if the event capacity is zero. A restored
    /// clarification whose field is missing or no longer pending is dropped
    /// with a warning.
    pub fn build<G: FieldGenerator>(self, generator: G) -> Result<Workflow<G>> {
        if self.config.event_capacity == 0 {
            return Err(OrchestratorError::Configuration {
                message: "event capacity must be at least 1".to_string(),
            });
        }

        let mut outline = self.outline.unwrap_or_default();
        outline.reset_generating();

        let state = match self.pending_clarification {
            Some(clarification) if still_awaited(&outline, &clarification) => {
                SchedulerState::AwaitingClarification { clarification }
            }
            Some(clarification) => {
                warn!(
                    "Dropping stored clarification for field {}: it is no longer pending",
                    clarification.field_id
                );
                SchedulerState::Idle
            }
            None => SchedulerState::Idle,
        };

        let id = self
            .id
            .unwrap_or_else(|| WorkflowId::new(format!("workflow_{}", Timestamp::now().as_second())));
        let (events, _) = broadcast::channel(self.config.event_capacity);

        info!(
            "Opened workflow {id} with {} fields ({})",
            outline.field_count(),
            state
        );
        Ok(Workflow {
            id,
            outline,
            state,
            generator,
            control: GenerationControl::default(),
            config: self.config,
            events,
        })
    }
}
