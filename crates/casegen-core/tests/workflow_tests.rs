use casegen_core::workflow::{allowed_transitions, validate_transition};
use casegen_core::{
    GenerationSession, PipelineError, StreamEvent, WorkflowRegistry, WorkflowStage, WorkflowUpdate,
};
use casegen_llm::SharedClient;
use casegen_test_utils::{orchestrator, sample_document, FailingClient, ScriptedClient};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

fn any_stage() -> impl Strategy<Value = WorkflowStage> {
    prop::sample::select(WorkflowStage::ALL.to_vec())
}

proptest! {
    #[test]
    fn prop_validation_matches_table(from in any_stage(), to in any_stage()) {
        let allowed = allowed_transitions(from);
        prop_assert_eq!(validate_transition(from, to).is_ok(), allowed.contains(&to));
    }
}

#[test]
fn registry_keeps_stage_and_progress_together() {
    let registry = WorkflowRegistry::new();
    registry.create(Some("wf"), None);
    registry
        .transition("wf", WorkflowStage::FileReady, Some("uploaded spec.docx"))
        .unwrap();
    let progress = registry.progress("wf").unwrap();
    assert_eq!(progress.stage, WorkflowStage::FileReady);
    assert_eq!(progress.progress, 10);
    assert_eq!(progress.message, "uploaded spec.docx");

    let task = registry
        .update_fields("wf", WorkflowUpdate::new().with_artifact_ref("out/cases.xlsx"))
        .unwrap();
    assert_eq!(task.stage, WorkflowStage::FileReady);
    assert_eq!(task.artifact_ref.as_deref(), Some("out/cases.xlsx"));
}

#[tokio::test]
async fn session_runs_document_to_generated() {
    let scripted = ScriptedClient::default().with_responder(|prompt| {
        if prompt.contains("quality") {
            Ok(json!({"summary": {"quality": 88, "comment": "clear"}, "risks": ["slippage"]}))
        } else if prompt.contains("Generate test cases") {
            Ok(json!([{"case_name": "case", "steps": ["do"], "expected": "done"}]))
        } else {
            Ok(json!([{"name": "generated point"}]))
        }
    });
    let client: SharedClient = Arc::new(scripted);
    let session = GenerationSession::new(WorkflowRegistry::new(), orchestrator(client));

    session
        .attach_document("wf", &sample_document(), Some("market order"))
        .unwrap();
    let report = session.analyze("wf").await.unwrap();
    assert_eq!(report.mandatory_items, vec!["market order"]);

    let handle = session.generate("wf", None).await.unwrap();
    let (events, summary) = handle.collect().await;
    let summary = summary.unwrap();

    assert!(matches!(events.first(), Some(StreamEvent::Meta { .. })));
    assert!(matches!(events.last(), Some(StreamEvent::Done { .. })));
    assert_eq!(summary.cases.len(), summary.test_points.len());

    let task = session.registry().get("wf").unwrap();
    assert!(task.is_done());
    assert_eq!(task.total_cases, summary.cases.len());
    assert_eq!(task.focus_hit_cases, summary.focus.focus_cases);
    assert_eq!(task.analysis.unwrap().risks, vec!["slippage"]);
}

#[tokio::test]
async fn session_failure_lands_in_error_stage() {
    let client: SharedClient = Arc::new(FailingClient::transport());
    let session = GenerationSession::new(WorkflowRegistry::new(), orchestrator(client));
    session
        .attach_document("wf", &sample_document(), None)
        .unwrap();

    let err = session.generate("wf", None).await.unwrap_err();
    assert!(matches!(err, PipelineError::Generation(_)));
    let task = session.registry().get("wf").unwrap();
    assert!(task.is_error());
    assert!(task.message.contains("connection reset"));

    // error is recoverable by re-attaching
    session
        .attach_document("wf", &sample_document(), None)
        .unwrap();
    assert_eq!(
        session.registry().get("wf").unwrap().stage,
        WorkflowStage::FileReady
    );
}
