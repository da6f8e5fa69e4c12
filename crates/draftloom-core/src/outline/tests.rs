use super::*;
use crate::models::{FieldDefinition, FieldUpdate};

fn id(value: &str) -> FieldId {
    FieldId::from(value)
}

/// One section with `a <- b <- c`, all completed.
fn completed_chain() -> Outline {
    let mut outline = Outline::new();
    let section = outline.add_section("Body", "");
    outline
        .add_fields(
            &section.id,
            vec![
                FieldDefinition::new("a"),
                FieldDefinition::new("b").depends_on(["a"]),
                FieldDefinition::new("c").depends_on(["b"]),
            ],
        )
        .unwrap();
    for field in ["field_1", "field_2", "field_3"] {
        outline.mark_completed(&id(field), format!("{field} text")).unwrap();
    }
    outline
}

#[test]
fn test_add_section_allocates_ids_and_orders() {
    let mut outline = Outline::new();
    let first = outline.add_section("Intro", "Opening");
    let second = outline.add_section("Body", "");

    assert_eq!(first.id, SectionId::from("section_1"));
    assert_eq!(second.id, SectionId::from("section_2"));
    assert_eq!(second.order, 1);
    assert_eq!(outline.sections().len(), 2);
}

#[test]
fn test_add_fields_resolves_names_and_sets_chain_head() {
    let mut outline = Outline::new();
    let section = outline.add_section("Body", "");
    outline
        .add_fields(&section.id, vec![FieldDefinition::new("title")])
        .unwrap();

    // "title" resolves to the existing field, "intro" to its batch sibling.
    let fields = outline
        .add_fields(
            &section.id,
            vec![
                FieldDefinition::new("body").depends_on(["intro", "title"]).with_order(2),
                FieldDefinition::new("intro").depends_on(["field_1"]).with_order(1),
            ],
        )
        .unwrap();

    assert_eq!(fields[0].name, "intro");
    assert_eq!(fields[0].depends_on, vec![id("field_1")]);
    assert_eq!(fields[1].name, "body");
    assert_eq!(fields[1].depends_on, vec![fields[0].id.clone(), id("field_1")]);

    let head = outline.require_field(&id("field_1")).unwrap();
    assert!(head.is_chain_head);
    assert!(outline
        .fields()
        .all(|f| f.chain_id.as_ref() == Some(&id("field_1"))));
    let orders: Vec<u32> = outline.fields().map(|f| f.order).collect();
    assert_eq!(orders, vec![0, 1, 2]);
}

#[test]
fn test_add_fields_rejects_whole_batch() {
    let mut outline = completed_chain();
    let section_id = SectionId::from("section_1");
    let before = outline.clone();

    let duplicate = outline.add_fields(
        &section_id,
        vec![FieldDefinition::new("d"), FieldDefinition::new("b")],
    );
    assert!(matches!(duplicate, Err(OrchestratorError::Validation { .. })));

    let unknown = outline.add_fields(
        &section_id,
        vec![FieldDefinition::new("d").depends_on(["nowhere"])],
    );
    assert!(matches!(unknown, Err(OrchestratorError::Validation { .. })));

    let self_ref = outline.add_fields(&section_id, vec![FieldDefinition::new("d").depends_on(["d"])]);
    assert!(matches!(self_ref, Err(OrchestratorError::Cycle { .. })));

    assert_eq!(outline, before);
}

#[test]
fn test_add_fields_unknown_section() {
    let mut outline = Outline::new();
    let result = outline.add_fields(&SectionId::from("section_9"), vec![FieldDefinition::new("x")]);
    assert!(matches!(result, Err(OrchestratorError::SectionNotFound { .. })));
}

#[test]
fn test_update_dependencies_rejects_cycles() {
    let mut outline = completed_chain();
    let before = outline.clone();

    let cycle = outline.update_field(&id("field_1"), FieldUpdate::depends_on(vec![id("field_3")]));
    match cycle.unwrap_err() {
        OrchestratorError::Cycle { field, .. } => assert_eq!(field, id("field_1")),
        other => panic!("Expected Cycle error, got {other:?}"),
    }

    let self_dep = outline.update_field(&id("field_2"), FieldUpdate::depends_on(vec![id("field_2")]));
    assert!(matches!(self_dep, Err(OrchestratorError::Cycle { .. })));

    let unknown = outline.update_field(&id("field_2"), FieldUpdate::depends_on(vec![id("field_9")]));
    assert!(matches!(unknown, Err(OrchestratorError::Validation { .. })));

    assert_eq!(outline, before);
}

#[test]
fn test_update_dependencies_rebuilds_chains() {
    let mut outline = completed_chain();
    outline
        .update_field(&id("field_3"), FieldUpdate::depends_on(Vec::new()))
        .unwrap();

    let c = outline.require_field(&id("field_3")).unwrap();
    assert!(c.depends_on.is_empty());
    assert!(c.chain_id.is_none());
    assert_eq!(outline.chain_members(&id("field_1")).unwrap().len(), 2);
}

#[test]
fn test_empty_update_rejected() {
    let mut outline = completed_chain();
    let result = outline.update_field(&id("field_1"), FieldUpdate::default());
    assert!(matches!(result, Err(OrchestratorError::Validation { .. })));
}

#[test]
fn test_remove_completed_field_requires_confirmation() {
    let mut outline = completed_chain();
    let section_id = SectionId::from("section_1");

    let result = outline.remove_field(&section_id, &id("field_2"), false);
    assert!(matches!(result, Err(OrchestratorError::Conflict { .. })));
    assert!(outline.field(&id("field_2")).is_some());

    let removed = outline.remove_field(&section_id, &id("field_2"), true).unwrap();
    assert_eq!(removed.purged_from, vec![id("field_3")]);
    assert_eq!(removed.stale_marked, vec![id("field_3")]);

    assert!(outline.field(&id("field_2")).is_none());
    assert!(outline.fields().all(|f| !f.depends_on.contains(&id("field_2"))));
    let c = outline.require_field(&id("field_3")).unwrap();
    assert!(c.context_stale);
    assert_eq!(c.order, 1);
}

#[test]
fn test_remove_pending_field_without_confirmation() {
    let mut outline = Outline::new();
    let section = outline.add_section("Body", "");
    outline
        .add_fields(&section.id, vec![FieldDefinition::new("draft")])
        .unwrap();

    let removed = outline.remove_field(&section.id, &id("field_1"), false).unwrap();
    assert_eq!(removed.field.name, "draft");
    assert_eq!(outline.field_count(), 0);
}

#[test]
fn test_remove_section_marks_dependents_elsewhere() {
    let mut outline = completed_chain();
    let other = outline.add_section("Appendix", "");
    outline
        .add_fields(&other.id, vec![FieldDefinition::new("notes").depends_on(["field_3"])])
        .unwrap();
    outline.mark_completed(&id("field_4"), "notes".to_string()).unwrap();

    let result = outline.remove_section(&SectionId::from("section_1"), false);
    assert!(matches!(result, Err(OrchestratorError::Conflict { .. })));

    let removed = outline.remove_section(&SectionId::from("section_1"), true).unwrap();
    assert_eq!(removed.removed_fields, 3);
    assert_eq!(removed.completed_fields, 3);
    assert_eq!(removed.stale_marked, vec![id("field_4")]);

    let notes = outline.require_field(&id("field_4")).unwrap();
    assert!(notes.depends_on.is_empty());
    assert!(notes.context_stale);
    assert_eq!(outline.sections()[0].order, 0);
}

#[test]
fn test_new_ids_skip_live_ids() {
    let mut outline = completed_chain();
    outline
        .remove_field(&SectionId::from("section_1"), &id("field_1"), true)
        .unwrap();

    let fields = outline
        .add_fields(&SectionId::from("section_1"), vec![FieldDefinition::new("fresh")])
        .unwrap();
    assert!(!["field_2", "field_3"].contains(&fields[0].id.as_str()));
}

#[test]
fn test_reorder_fields_and_sections() {
    let mut outline = completed_chain();
    let section_id = SectionId::from("section_1");

    let partial = outline.reorder_fields(&section_id, &[id("field_3"), id("field_1")]);
    assert!(matches!(partial, Err(OrchestratorError::Validation { .. })));

    outline
        .reorder_fields(&section_id, &[id("field_3"), id("field_1"), id("field_2")])
        .unwrap();
    let order: Vec<&str> = outline.fields().map(|f| f.id.as_str()).collect();
    assert_eq!(order, vec!["field_3", "field_1", "field_2"]);
    assert_eq!(outline.require_field(&id("field_3")).unwrap().order, 0);

    let appendix = outline.add_section("Appendix", "");
    outline
        .reorder_sections(&[appendix.id.clone(), section_id.clone()])
        .unwrap();
    assert_eq!(outline.sections()[0].id, appendix.id);
    assert_eq!(outline.require_section(&section_id).unwrap().order, 1);

    let duplicate = outline.reorder_sections(&[section_id.clone(), section_id]);
    assert!(matches!(duplicate, Err(OrchestratorError::Validation { .. })));
}

#[test]
fn test_first_head_in_document_order_wins() {
    let mut outline = completed_chain();
    outline.set_chain_head(&id("field_2"), true).unwrap();

    // field_3 is reachable from both heads.
    let c = outline.require_field(&id("field_3")).unwrap();
    assert_eq!(c.chain_id, Some(id("field_1")));

    outline.set_chain_head(&id("field_1"), false).unwrap();
    let c = outline.require_field(&id("field_3")).unwrap();
    assert_eq!(c.chain_id, Some(id("field_2")));
    assert!(outline.require_field(&id("field_1")).unwrap().chain_id.is_none());
}

#[test]
fn test_deserialize_validates_invariants() {
    let outline = completed_chain();
    let mut json = serde_json::to_value(&outline).unwrap();
    json["sections"][0]["fields"][0]["depends_on"] = serde_json::json!(["field_3"]);

    let result: std::result::Result<Outline, _> = serde_json::from_value(json);
    assert!(result.unwrap_err().to_string().contains("cycle"));

    let json = serde_json::to_string(&outline).unwrap();
    let restored: Outline = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, outline);
}

#[test]
fn test_reset_generating() {
    let mut outline = completed_chain();
    outline
        .add_fields(&SectionId::from("section_1"), vec![FieldDefinition::new("d")])
        .unwrap();
    outline.mark_generating(&id("field_4")).unwrap();
    assert_eq!(outline.generating_fields().len(), 1);

    // Only one field may be generating.
    assert!(matches!(
        outline.mark_generating(&id("field_1")),
        Err(OrchestratorError::AlreadyRunning)
    ));

    assert_eq!(outline.reset_generating(), 1);
    assert_eq!(outline.first_pending().map(|f| f.id.clone()), Some(id("field_4")));
}

#[test]
fn test_patch_preserves_surviving_fields() {
    let mut outline = completed_chain();
    let mut patch = OutlinePatch::from(&outline);
    patch.sections[0].fields[2].description = "Closing remarks".to_string();
    patch.sections[0].fields.push(FieldPatch {
        id: None,
        name: "d".to_string(),
        display_name: None,
        description: String::new(),
        field_type: Default::default(),
        required: true,
        ai_hint: String::new(),
        clarification_prompt: None,
        depends_on: vec![id("field_3")],
        is_chain_head: false,
    });

    let summary = outline.apply_patch(patch, true, false).unwrap();
    assert_eq!(summary.preserved, 3);
    assert_eq!(summary.added, vec![id("field_4")]);
    assert!(summary.removed.is_empty());

    let c = outline.require_field(&id("field_3")).unwrap();
    assert_eq!(c.content.as_deref(), Some("field_3 text"));
    assert_eq!(c.description, "Closing remarks");
    assert!(outline.is_confirmed());
    assert_eq!(outline.require_field(&id("field_4")).unwrap().status, FieldStatus::Pending);
}

#[test]
fn test_patch_dropping_completed_field() {
    let mut outline = completed_chain();
    let mut patch = OutlinePatch::from(&outline);
    patch.sections[0].fields.remove(1);
    patch.sections[0].fields[1].depends_on.clear();

    let before = outline.clone();
    let result = outline.apply_patch(patch.clone(), false, false);
    assert!(matches!(result, Err(OrchestratorError::Conflict { .. })));
    assert_eq!(outline, before);

    let summary = outline.apply_patch(patch, false, true).unwrap();
    assert_eq!(summary.removed, vec![id("field_2")]);
    assert_eq!(summary.stale_marked, vec![id("field_3")]);
    assert!(outline.require_field(&id("field_3")).unwrap().context_stale);
}
