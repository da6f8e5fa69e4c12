#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    path::Path,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use draftloom_core::{
    generator::{ClarificationRequest, GenerationOutcome, GenerationRequest, GeneratorError},
    models::{FieldDefinition, FieldId},
    FieldGenerator, Workflow, WorkflowBuilder, WorkflowSnapshot,
};
use tokio::sync::Notify;

/// Blocks the generation call for one field until released.
pub struct Gate {
    pub field_name: String,
    pub started: Arc<Notify>,
    pub release: Arc<Notify>,
}

/// Generator driven by per-field scripts. Unscripted calls succeed with
/// `"<name> v<n>"`, where `n` counts the calls made for that field.
#[derive(Default)]
pub struct ScriptedGenerator {
    script: Mutex<HashMap<String, VecDeque<GenerationOutcome>>>,
    calls: Mutex<Vec<GenerationRequest>>,
    answers: Mutex<Vec<(FieldId, String)>>,
    gate: Mutex<Option<Gate>>,
}

impl ScriptedGenerator {
    pub fn fail_on(&self, field_name: &str, reason: &str) {
        self.push(
            field_name,
            GenerationOutcome::Failed {
                reason: reason.to_string(),
            },
        );
    }

    pub fn ask_on(&self, field_id: &FieldId, field_name: &str, question: &str) {
        self.push(
            field_name,
            GenerationOutcome::NeedsClarification {
                clarification: ClarificationRequest {
                    field_id: field_id.clone(),
                    field_name: field_name.to_string(),
                    question: question.to_string(),
                },
            },
        );
    }

    /// Returns (started, release) notifiers for the next call for `field_name`.
    pub fn gate(&self, field_name: &str) -> (Arc<Notify>, Arc<Notify>) {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Gate {
            field_name: field_name.to_string(),
            started: Arc::clone(&started),
            release: Arc::clone(&release),
        });
        (started, release)
    }

    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called_names(&self) -> Vec<String> {
        self.calls().into_iter().map(|r| r.field_name).collect()
    }

    pub fn answers(&self) -> Vec<(FieldId, String)> {
        self.answers.lock().unwrap().clone()
    }

    fn push(&self, field_name: &str, outcome: GenerationOutcome) {
        self.script
            .lock()
            .unwrap()
            .entry(field_name.to_string())
            .or_default()
            .push_back(outcome);
    }
}

#[async_trait]
impl FieldGenerator for ScriptedGenerator {
    async fn generate_field(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationOutcome, GeneratorError> {
        let gate = {
            let mut slot = self.gate.lock().unwrap();
            let hit = slot
                .as_ref()
                .is_some_and(|g| g.field_name == request.field_name);
            if hit {
                slot.take()
            } else {
                None
            }
        };
        if let Some(gate) = gate {
            gate.started.notify_one();
            gate.release.notified().await;
        }

        let scripted = self
            .script
            .lock()
            .unwrap()
            .get_mut(&request.field_name)
            .and_then(VecDeque::pop_front);
        let count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(request.clone());
            calls
                .iter()
                .filter(|r| r.field_name == request.field_name)
                .count()
        };
        Ok(scripted.unwrap_or_else(|| GenerationOutcome::Completed {
            content: format!("{} v{count}", request.field_name),
        }))
    }

    async fn submit_clarification(
        &self,
        field_id: &FieldId,
        answer: &str,
    ) -> Result<(), GeneratorError> {
        self.answers
            .lock()
            .unwrap()
            .push((field_id.clone(), answer.to_string()));
        Ok(())
    }
}

pub type TestWorkflow = Workflow<Arc<ScriptedGenerator>>;

/// Helper function to create a workflow with an A → B → C outline.
pub fn create_abc_workflow() -> (TestWorkflow, Arc<ScriptedGenerator>, Vec<FieldId>) {
    let generator = Arc::new(ScriptedGenerator::default());
    let mut workflow = WorkflowBuilder::new()
        .with_id("integration")
        .build(Arc::clone(&generator))
        .expect("Failed to build workflow");
    let section = workflow.outline_mut().add_section("Body", "");
    let ids = workflow
        .outline_mut()
        .add_fields(
            &section.id,
            vec![
                FieldDefinition::new("a"),
                FieldDefinition::new("b").depends_on(["a"]),
                FieldDefinition::new("c").depends_on(["b"]),
            ],
        )
        .expect("Failed to add fields")
        .into_iter()
        .map(|f| f.id)
        .collect();
    (workflow, generator, ids)
}

/// Writes a snapshot to `dir` and reads it back.
pub fn persist_and_reload(dir: &Path, snapshot: &WorkflowSnapshot) -> WorkflowSnapshot {
    let path = dir.join("workflow.json");
    std::fs::write(&path, snapshot.to_json().expect("Failed to serialize"))
        .expect("Failed to write snapshot");
    let json = std::fs::read_to_string(&path).expect("Failed to read snapshot");
    WorkflowSnapshot::from_json(&json).expect("Failed to parse snapshot")
}
