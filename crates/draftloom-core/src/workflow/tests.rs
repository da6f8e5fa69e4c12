use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

use async_trait::async_trait;

use super::*;
use crate::{
    generator::{GenerationOutcome, GenerationRequest, GeneratorError},
    models::{FieldDefinition, FieldUpdate},
};

/// Generator that answers from a per-field script and records every call.
#[derive(Default)]
struct Scripted {
    script: Mutex<HashMap<String, VecDeque<GenerationOutcome>>>,
    calls: Mutex<Vec<GenerationRequest>>,
    answers: Mutex<Vec<(FieldId, String)>>,
    pause_on: Mutex<Option<(String, GenerationControl)>>,
}

impl Scripted {
    fn then(&self, name: &str, outcome: GenerationOutcome) {
        self.script
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .push_back(outcome);
    }

    fn pause_while_generating(&self, name: &str, control: GenerationControl) {
        *self.pause_on.lock().unwrap() = Some((name.to_string(), control));
    }

    fn called(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.field_name.clone())
            .collect()
    }
}

#[async_trait]
impl FieldGenerator for Scripted {
    async fn generate_field(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GenerationOutcome, GeneratorError> {
        if let Some((name, control)) = self.pause_on.lock().unwrap().as_ref() {
            if name == &request.field_name {
                control.pause();
            }
        }
        let scripted = self
            .script
            .lock()
            .unwrap()
            .get_mut(&request.field_name)
            .and_then(VecDeque::pop_front);
        let calls = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(request.clone());
            calls.len()
        };
        Ok(scripted.unwrap_or_else(|| GenerationOutcome::Completed {
            content: format!("{} #{calls}", request.field_name),
        }))
    }

    async fn submit_clarification(
        &self,
        field_id: &FieldId,
        answer: &str,
    ) -> std::result::Result<(), GeneratorError> {
        self.answers
            .lock()
            .unwrap()
            .push((field_id.clone(), answer.to_string()));
        Ok(())
    }
}

/// A → B → C in one section.
fn abc() -> (Workflow<Scripted>, Vec<FieldId>) {
    let mut workflow = WorkflowBuilder::new()
        .with_id("test")
        .build(Scripted::default())
        .unwrap();
    let section = workflow.outline_mut().add_section("Body", "");
    let fields = workflow
        .outline_mut()
        .add_fields(
            &section.id,
            vec![
                FieldDefinition::new("a"),
                FieldDefinition::new("b").depends_on(["a"]),
                FieldDefinition::new("c").depends_on(["b"]),
            ],
        )
        .unwrap();
    let ids = fields.into_iter().map(|f| f.id).collect();
    (workflow, ids)
}

fn status(workflow: &Workflow<Scripted>, id: &FieldId) -> FieldStatus {
    workflow.outline().field(id).unwrap().status
}

fn clarification_for(id: &FieldId, name: &str) -> GenerationOutcome {
    GenerationOutcome::NeedsClarification {
        clarification: ClarificationRequest {
            field_id: id.clone(),
            field_name: name.to_string(),
            question: format!("What should {name} cover?"),
        },
    }
}

#[tokio::test]
async fn test_run_generates_in_document_order() {
    let (mut workflow, ids) = abc();

    let report = workflow.run().await.unwrap();

    assert_eq!(report.generated, ids);
    assert_eq!(report.stop, StopReason::Completed);
    assert_eq!(report.remaining, 0);
    assert_eq!(workflow.state(), &SchedulerState::Idle);
    assert_eq!(workflow.generator().called(), vec!["a", "b", "c"]);
    assert!(workflow.outline().stale_fields().is_empty());
    assert_eq!(workflow.outline().progress().percentage(), 100);
}

#[tokio::test]
async fn test_dependency_content_is_passed_to_generator() {
    let (mut workflow, ids) = abc();
    workflow.run().await.unwrap();

    let calls = workflow.generator().calls.lock().unwrap().clone();
    assert!(calls[0].dependencies.is_empty());
    assert_eq!(calls[1].dependencies.len(), 1);
    assert_eq!(calls[1].dependencies[0].field_id, ids[0]);
    assert_eq!(calls[1].dependencies[0].content, "a #1");
}

#[tokio::test]
async fn test_edit_after_generation_marks_downstream_stale() {
    let (mut workflow, ids) = abc();
    workflow.run().await.unwrap();

    workflow
        .outline_mut()
        .update_field(&ids[0], FieldUpdate::content("hand written"))
        .unwrap();

    let stale: Vec<_> = workflow
        .outline()
        .stale_fields()
        .iter()
        .map(|f| f.id.clone())
        .collect();
    assert_eq!(stale, vec![ids[1].clone(), ids[2].clone()]);
}

#[tokio::test]
async fn test_pause_during_call_stops_after_it_returns() {
    let (mut workflow, ids) = abc();
    let control = workflow.control();
    workflow.generator().pause_while_generating("a", control);

    let report = workflow.run().await.unwrap();

    assert_eq!(report.generated, vec![ids[0].clone()]);
    assert_eq!(report.stop, StopReason::Paused);
    assert_eq!(workflow.state(), &SchedulerState::Paused);
    assert_eq!(status(&workflow, &ids[0]), FieldStatus::Completed);
    assert!(workflow.outline().generating_fields().is_empty());

    *workflow.generator().pause_on.lock().unwrap() = None;
    let report = workflow.resume().await.unwrap();
    assert_eq!(report.generated, vec![ids[1].clone(), ids[2].clone()]);
    assert_eq!(workflow.generator().called(), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_pause_before_call_leaves_single_optimistic_mark() {
    let (mut workflow, ids) = abc();
    workflow.pause();

    let outcome = workflow.generate_next().await.unwrap();

    assert_eq!(
        outcome,
        StepOutcome::Paused {
            field_id: ids[0].clone()
        }
    );
    assert_eq!(workflow.outline().generating_fields().len(), 1);
    assert!(workflow.generator().called().is_empty());

    let report = workflow.resume().await.unwrap();
    assert_eq!(report.generated, ids);
    assert!(workflow.outline().generating_fields().is_empty());
}

#[tokio::test]
async fn test_step_after_pause_generates_next_field() {
    let (mut workflow, ids) = abc();
    workflow.pause();
    let paused = workflow.generate_next().await.unwrap();
    assert!(matches!(paused, StepOutcome::Paused { .. }));
    assert_eq!(workflow.state(), &SchedulerState::Paused);

    let outcome = workflow.generate_next().await.unwrap();

    assert_eq!(
        outcome,
        StepOutcome::Generated {
            field_id: ids[0].clone(),
            remaining: 2
        }
    );
    assert_eq!(workflow.state(), &SchedulerState::Running);
    assert!(!workflow.control().is_paused());
    assert_eq!(workflow.generator().called(), vec!["a"]);
}

#[tokio::test]
async fn test_step_reports_running_to_subscribers() {
    let (mut workflow, _) = abc();
    let mut events = workflow.subscribe();

    workflow.generate_next().await.unwrap();

    let mut states = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let WorkflowEvent::StateChanged { state } = event {
            states.push(state);
        }
    }
    assert_eq!(states.first(), Some(&SchedulerState::Running));
}

#[tokio::test]
async fn test_clarification_retries_the_same_field() {
    let (mut workflow, ids) = abc();
    workflow
        .generator()
        .then("b", clarification_for(&ids[1], "b"));

    let report = workflow.run().await.unwrap();

    match &report.stop {
        StopReason::AwaitingClarification { clarification } => {
            assert_eq!(clarification.field_id, ids[1]);
        }
        other => panic!("unexpected stop {other:?}"),
    }
    assert_eq!(status(&workflow, &ids[1]), FieldStatus::Pending);
    assert!(workflow.pending_clarification().is_some());

    let report = workflow.submit_answer(&ids[1], "answer").await.unwrap();

    assert_eq!(report.generated, vec![ids[1].clone(), ids[2].clone()]);
    assert_eq!(workflow.generator().called(), vec!["a", "b", "b", "c"]);
    let answers = workflow.generator().answers.lock().unwrap().clone();
    assert_eq!(answers, vec![(ids[1].clone(), "answer".to_string())]);
    let calls = workflow.generator().calls.lock().unwrap().clone();
    assert_eq!(calls[2].clarification_answer.as_deref(), Some("answer"));
}

#[tokio::test]
async fn test_clarification_is_bound_to_the_requested_field() {
    let (mut workflow, ids) = abc();
    // Reports a different id than the one being generated.
    workflow
        .generator()
        .then("b", clarification_for(&ids[2], "c"));

    workflow.run().await.unwrap();

    let pending = workflow.pending_clarification().unwrap();
    assert_eq!(pending.field_id, ids[1]);
    assert_eq!(pending.field_name, "b");
}

#[tokio::test]
async fn test_submit_answer_validation() {
    let (mut workflow, ids) = abc();
    workflow
        .generator()
        .then("b", clarification_for(&ids[1], "b"));
    workflow.run().await.unwrap();

    let blank = workflow.submit_answer(&ids[1], "   ").await;
    assert!(matches!(blank, Err(OrchestratorError::Validation { .. })));

    let wrong = workflow.submit_answer(&ids[2], "answer").await;
    assert!(matches!(wrong, Err(OrchestratorError::Validation { .. })));

    assert!(workflow.pending_clarification().is_some());
    assert!(workflow.generator().answers.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_run_rejected_while_awaiting_clarification() {
    let (mut workflow, ids) = abc();
    workflow
        .generator()
        .then("a", clarification_for(&ids[0], "a"));
    workflow.run().await.unwrap();

    let result = workflow.run().await;
    assert!(matches!(result, Err(OrchestratorError::InvalidState { .. })));
}

#[tokio::test]
async fn test_skip_returns_to_idle_without_resuming() {
    let (mut workflow, ids) = abc();
    workflow
        .generator()
        .then("b", clarification_for(&ids[1], "b"));
    workflow.run().await.unwrap();

    let skipped = workflow.skip_clarification().unwrap();

    assert_eq!(skipped.field_id, ids[1]);
    assert_eq!(workflow.state(), &SchedulerState::Idle);
    assert_eq!(status(&workflow, &ids[1]), FieldStatus::Pending);
    assert_eq!(workflow.generator().called(), vec!["a", "b"]);
    assert!(workflow.skip_clarification().is_err());
}

#[tokio::test]
async fn test_prompt_without_answer_asks_before_calling_generator() {
    let mut workflow = WorkflowBuilder::new().build(Scripted::default()).unwrap();
    let section = workflow.outline_mut().add_section("Intro", "");
    let fields = workflow
        .outline_mut()
        .add_fields(
            &section.id,
            vec![FieldDefinition::new("audience").with_clarification_prompt("Who reads this?")],
        )
        .unwrap();

    let report = workflow.run().await.unwrap();

    match report.stop {
        StopReason::AwaitingClarification { clarification } => {
            assert_eq!(clarification.question, "Who reads this?");
        }
        other => panic!("unexpected stop {other:?}"),
    }
    assert!(workflow.generator().called().is_empty());

    workflow
        .submit_answer(&fields[0].id, "Operators")
        .await
        .unwrap();
    assert_eq!(workflow.generator().called(), vec!["audience"]);
}

#[tokio::test]
async fn test_failure_halts_and_marks_error() {
    let (mut workflow, ids) = abc();
    workflow.generator().then(
        "b",
        GenerationOutcome::Failed {
            reason: "quota".to_string(),
        },
    );

    let err = workflow.run().await.unwrap_err();

    match err {
        OrchestratorError::GenerationFailure { field_id, reason } => {
            assert_eq!(field_id, ids[1]);
            assert_eq!(reason, "quota");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(status(&workflow, &ids[1]), FieldStatus::Error);
    assert_eq!(status(&workflow, &ids[2]), FieldStatus::Pending);
    assert_eq!(workflow.state(), &SchedulerState::Idle);
    assert!(!workflow.control().is_busy());
}

#[tokio::test]
async fn test_second_start_is_rejected_while_busy() {
    let (mut workflow, _) = abc();
    let _guard = workflow.control().try_acquire().unwrap();

    assert!(matches!(
        workflow.run().await,
        Err(OrchestratorError::AlreadyRunning)
    ));
    assert!(matches!(
        workflow.generate_next().await,
        Err(OrchestratorError::AlreadyRunning)
    ));
}

#[tokio::test]
async fn test_chain_regenerates_members_in_order() {
    let (mut workflow, ids) = abc();
    let section = workflow.outline().sections()[0].id.clone();
    workflow
        .outline_mut()
        .add_fields(&section, vec![FieldDefinition::new("d").depends_on(["b"])])
        .unwrap();
    workflow.run().await.unwrap();
    workflow
        .outline_mut()
        .update_field(&ids[0], FieldUpdate::content("edited"))
        .unwrap();

    let report = workflow.regenerate_chain(&ids[0], true).await.unwrap();

    // d depends on b and is part of a's chain too.
    assert_eq!(report.total_in_chain, 4);
    assert_eq!(report.regenerated_count(), 4);
    assert!(report.is_complete());
    assert!(workflow.outline().stale_fields().is_empty());
    let calls = workflow.generator().calls.lock().unwrap().clone();
    assert!(calls[4..].iter().all(|c| c.regenerate));
    assert_eq!(calls[4].previous_content.as_deref(), Some("edited"));
}

#[tokio::test]
async fn test_chain_spans_sections() {
    let (mut workflow, ids) = abc();
    let other = workflow.outline_mut().add_section("Appendix", "");
    let extra = workflow
        .outline_mut()
        .add_fields(&other.id, vec![FieldDefinition::new("notes").depends_on([ids[1].as_str()])])
        .unwrap();
    workflow.run().await.unwrap();

    let report = workflow.regenerate_chain(&ids[1], true).await.unwrap();

    assert_eq!(report.regenerated, vec![ids[1].clone(), ids[2].clone(), extra[0].id.clone()]);
    assert!(!workflow.outline().field(&ids[0]).unwrap().context_stale);
}

#[tokio::test]
async fn test_chain_failure_reports_partial_count() {
    let (mut workflow, ids) = abc();
    workflow.run().await.unwrap();
    let c_before = workflow.outline().field(&ids[2]).unwrap().clone();
    workflow.generator().then(
        "b",
        GenerationOutcome::Failed {
            reason: "timeout".to_string(),
        },
    );

    let report = workflow.regenerate_chain(&ids[0], true).await.unwrap();

    assert_eq!(report.regenerated_count(), 1);
    assert_eq!(report.total_in_chain, 3);
    assert!(matches!(report.stop, ChainStop::Failed { ref field_id, .. } if field_id == &ids[1]));
    assert_eq!(status(&workflow, &ids[1]), FieldStatus::Error);
    assert_eq!(workflow.outline().field(&ids[2]).unwrap(), &c_before);
}

#[tokio::test]
async fn test_chain_requires_confirmation() {
    let (mut workflow, ids) = abc();
    workflow.run().await.unwrap();

    let result = workflow.regenerate_chain(&ids[0], false).await;

    assert!(matches!(result, Err(OrchestratorError::Conflict { .. })));
    assert_eq!(workflow.generator().called().len(), 3);
}

#[tokio::test]
async fn test_chain_honors_pause_between_members() {
    let (mut workflow, ids) = abc();
    workflow.run().await.unwrap();
    let control = workflow.control();
    workflow.generator().pause_while_generating("a", control);

    let report = workflow.regenerate_chain(&ids[0], true).await.unwrap();

    assert_eq!(report.stop, ChainStop::Paused);
    assert_eq!(report.regenerated, vec![ids[0].clone()]);
    assert_eq!(workflow.state(), &SchedulerState::Paused);
    let stale: Vec<&FieldId> = workflow
        .outline()
        .stale_fields()
        .into_iter()
        .map(|f| &f.id)
        .collect();
    assert_eq!(stale, vec![&ids[1], &ids[2]]);

    // Resuming has no pending work, so the unreached members stay flagged.
    workflow.resume().await.unwrap();
    assert_eq!(workflow.generator().called(), vec!["a", "b", "c", "a"]);
    assert!(workflow.outline().field(&ids[1]).unwrap().context_stale);
    assert!(workflow.outline().field(&ids[2]).unwrap().context_stale);
}

#[tokio::test]
async fn test_chain_stopped_by_question_flags_later_members() {
    let (mut workflow, ids) = abc();
    workflow.run().await.unwrap();
    workflow
        .generator()
        .then("b", clarification_for(&ids[1], "b"));

    let report = workflow.regenerate_chain(&ids[0], true).await.unwrap();

    assert!(matches!(report.stop, ChainStop::AwaitingClarification { .. }));
    assert_eq!(status(&workflow, &ids[1]), FieldStatus::Pending);
    assert!(workflow.outline().field(&ids[2]).unwrap().context_stale);
}

#[test]
fn test_chain_failure_report_keeps_reason_in_json() {
    let report = ChainReport {
        head: FieldId::from("field_1"),
        regenerated: vec![FieldId::from("field_1")],
        total_in_chain: 3,
        stop: ChainStop::Failed {
            field_id: FieldId::from("field_2"),
            reason: "timeout".to_string(),
        },
    };

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["stop"]["stop"], "failed");
    assert_eq!(json["stop"]["reason"], "timeout");

    let parsed: ChainReport = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, report);
}

#[tokio::test]
async fn test_regenerate_field_counts_downstream_stale() {
    let (mut workflow, ids) = abc();
    workflow.run().await.unwrap();

    let report = workflow.regenerate_field(&ids[0]).await.unwrap();

    assert_eq!(report.downstream_stale_count, 2);
    assert!(report.clarification.is_none());
    assert!(!workflow.outline().field(&ids[0]).unwrap().context_stale);
}

#[tokio::test]
async fn test_snapshot_restores_pending_clarification() {
    let (mut workflow, ids) = abc();
    workflow
        .generator()
        .then("b", clarification_for(&ids[1], "b"));
    workflow.run().await.unwrap();

    let json = workflow.snapshot().to_json().unwrap();
    let snapshot = WorkflowSnapshot::from_json(&json).unwrap();
    let restored = WorkflowBuilder::new()
        .with_snapshot(snapshot)
        .build(Scripted::default())
        .unwrap();

    assert_eq!(restored.id(), &WorkflowId::from("test"));
    assert_eq!(
        restored.pending_clarification().map(|c| c.field_id.clone()),
        Some(ids[1].clone())
    );
    assert_eq!(restored.outline(), workflow.outline());
}

#[tokio::test]
async fn test_events_are_published() {
    let (mut workflow, ids) = abc();
    let mut events = workflow.subscribe();

    workflow.generate_next().await.unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(seen.contains(&WorkflowEvent::FieldStarted {
        field_id: ids[0].clone()
    }));
    assert!(seen.contains(&WorkflowEvent::FieldCompleted {
        field_id: ids[0].clone()
    }));
}

#[test]
fn test_zero_event_capacity_is_rejected() {
    let result = WorkflowBuilder::new()
        .with_event_capacity(0)
        .build(Scripted::default());
    assert!(matches!(
        result,
        Err(OrchestratorError::Configuration { .. })
    ));
}

#[test]
fn test_fail_field_propagates_status_write_error() {
    let (mut workflow, ids) = abc();

    let missing = workflow.fail_field(&FieldId::from("field_99"), "gone".to_string());
    assert!(matches!(missing, Err(OrchestratorError::FieldNotFound { .. })));

    let failure = workflow.fail_field(&ids[0], "timeout".to_string()).unwrap();
    assert!(matches!(
        failure,
        OrchestratorError::GenerationFailure { ref reason, .. } if reason == "timeout"
    ));
    assert_eq!(status(&workflow, &ids[0]), FieldStatus::Error);
}

#[tokio::test]
async fn test_removing_awaited_field_drops_clarification() {
    let (mut workflow, ids) = abc();
    workflow
        .generator()
        .then("b", clarification_for(&ids[1], "b"));
    workflow.run().await.unwrap();
    let section = workflow.outline().sections()[0].id.clone();

    workflow.remove_field(&section, &ids[1], true).unwrap();

    assert!(workflow.pending_clarification().is_none());
    assert_eq!(workflow.state(), &SchedulerState::Idle);
    assert!(workflow.snapshot().pending_clarification.is_none());
    let report = workflow.run().await.unwrap();
    assert_eq!(report.generated, vec![ids[2].clone()]);
}

#[tokio::test]
async fn test_writing_awaited_field_drops_clarification() {
    let (mut workflow, ids) = abc();
    workflow
        .generator()
        .then("b", clarification_for(&ids[1], "b"));
    workflow.run().await.unwrap();

    workflow
        .update_field(&ids[1], FieldUpdate::content("by hand"))
        .unwrap();

    assert_eq!(workflow.state(), &SchedulerState::Idle);
    assert_eq!(status(&workflow, &ids[1]), FieldStatus::Completed);
}

#[tokio::test]
async fn test_renaming_awaited_field_keeps_clarification() {
    let (mut workflow, ids) = abc();
    workflow
        .generator()
        .then("b", clarification_for(&ids[1], "b"));
    workflow.run().await.unwrap();

    workflow
        .update_field(
            &ids[1],
            FieldUpdate {
                display_name: Some("Bee".to_string()),
                ..FieldUpdate::default()
            },
        )
        .unwrap();

    assert_eq!(
        workflow.pending_clarification().map(|c| c.field_id.clone()),
        Some(ids[1].clone())
    );
}

#[tokio::test]
async fn test_build_drops_clarification_for_missing_field() {
    let (mut workflow, ids) = abc();
    workflow
        .generator()
        .then("b", clarification_for(&ids[1], "b"));
    workflow.run().await.unwrap();
    let pending = workflow.pending_clarification().cloned();
    let section = workflow.outline().sections()[0].id.clone();
    workflow
        .outline_mut()
        .remove_field(&section, &ids[1], true)
        .unwrap();
    let snapshot = WorkflowSnapshot {
        workflow_id: workflow.id().clone(),
        outline: workflow.outline().clone(),
        pending_clarification: pending,
    };

    let restored = WorkflowBuilder::new()
        .with_snapshot(snapshot)
        .build(Scripted::default())
        .unwrap();

    assert_eq!(restored.state(), &SchedulerState::Idle);
    assert!(restored.pending_clarification().is_none());
}
