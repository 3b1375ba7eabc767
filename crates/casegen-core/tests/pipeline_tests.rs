use casegen_core::{
    CoverageStatus, Orchestrator, PipelineConfig, PipelineError, RunRequest, StreamEvent,
    MAX_CASES_TIMEOUT_SECS, NO_PRECONDITION,
};
use casegen_llm::{GenerationError, SharedClient};
use casegen_test_utils::{
    mandatory_point, orchestrator, orchestrator_with, sample_requirement, test_point, FailingClient,
    HangingClient, ScriptedClient,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn cases(events: &[StreamEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, StreamEvent::Case { .. }))
        .count()
}

#[tokio::test]
async fn failing_generator_still_yields_three_cases_per_point() {
    let failing = Arc::new(FailingClient::transport());
    let client: SharedClient = failing.clone();
    let handle = orchestrator(client).run(RunRequest::new(sample_requirement()));
    let (events, summary) = handle.collect().await;
    let summary = summary.unwrap();

    assert!(!summary.test_points.is_empty());
    assert_eq!(summary.cases.len(), summary.test_points.len() * 3);
    assert_eq!(cases(&events), summary.cases.len());
    assert!(summary
        .cases
        .iter()
        .all(|c| !c.precondition.is_empty() && !c.steps.is_empty()));
    assert!(matches!(events.last(), Some(StreamEvent::Done { .. })));
    assert!(failing.calls() > 0);
}

#[tokio::test]
async fn cases_for_one_point_are_not_interleaved() {
    let client: SharedClient = Arc::new(FailingClient::transport());
    let points = vec![test_point("alpha", "A"), test_point("beta", "B")];
    let ids: Vec<String> = points.iter().map(|p| p.id.clone()).collect();
    let (events, _) = orchestrator(client)
        .run(RunRequest::new("two points").with_test_points(points))
        .collect()
        .await;

    let order: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Case { case, .. } => case.test_point_id.clone(),
            _ => None,
        })
        .collect();
    assert_eq!(order.len(), 6);
    assert!(order[..3].iter().all(|id| *id == ids[0]));
    assert!(order[3..].iter().all(|id| *id == ids[1]));
}

#[tokio::test(start_paused = true)]
async fn hung_generator_hits_the_stage_deadline() {
    let hanging = Arc::new(HangingClient::new());
    let client: SharedClient = hanging.clone();
    let config = PipelineConfig::default().with_cases_timeout(60);
    let points = vec![
        test_point("first", "A"),
        test_point("second", "A"),
        test_point("third", "B"),
    ];

    let (events, summary) = orchestrator_with(client, config)
        .run(RunRequest::new("slow service").with_test_points(points))
        .collect()
        .await;
    let summary = summary.unwrap();

    assert_eq!(summary.cases.len(), 9);
    assert_eq!(cases(&events), 9);
    // only the first point reached the generator before the deadline
    assert_eq!(hanging.calls(), 1);
}

#[tokio::test]
async fn mandatory_topics_are_reported() {
    let scripted = ScriptedClient::new(vec![Ok(json!([
        {"case_name": "market order fills", "precondition": "", "steps": "submit"}
    ]))])
    .shared();
    let client: SharedClient = scripted.clone();
    let points = vec![
        mandatory_point("market order happy path", "market order"),
        test_point("limit order rests", "Orders"),
    ];

    let summary = orchestrator(client)
        .run(
            RunRequest::new("orders")
                .with_focus("market order, stop loss")
                .with_test_points(points),
        )
        .finish()
        .await
        .unwrap();

    assert_eq!(summary.coverage.is_covered("market order"), Some(true));
    assert_eq!(summary.coverage.is_covered("stop loss"), Some(false));
    assert_eq!(summary.status, CoverageStatus::PartiallyCovered);
    assert_eq!(summary.cases[0].precondition, NO_PRECONDITION);
    assert_eq!(summary.cases[0].steps, vec!["submit"]);
    assert_eq!(summary.focus.focus_cases, 1);
    assert_eq!(summary.focus.total_cases, 4);
    assert!(scripted.prompts()[0].contains("happy-path-only cases are forbidden"));
}

#[tokio::test]
async fn done_event_serializes_coverage() {
    let client: SharedClient = Arc::new(FailingClient::transport());
    let (events, _) = orchestrator(client)
        .run(RunRequest::new("book a flight").with_focus("payment failure"))
        .collect()
        .await;
    let done = serde_json::to_value(events.last().unwrap()).unwrap();
    assert_eq!(done["type"], "done");
    assert_eq!(done["data"]["status"], "Completed");
    assert_eq!(done["data"]["coverage"]["payment failure"], true);
}

#[tokio::test]
async fn setup_errors_are_classified() {
    let client: SharedClient = Arc::new(FailingClient::new(GenerationError::MissingConfig(
        "OPENAI_API_KEY".into(),
    )));
    let orchestrator = orchestrator(client);
    let err = orchestrator
        .analyze(&sample_requirement(), None)
        .await
        .unwrap_err();
    assert!(err.is_setup());
    assert!(matches!(err, PipelineError::Generation(_)));
}

#[tokio::test(start_paused = true)]
async fn cancel_after_modules_stops_plan_expansion() {
    let requirements: Vec<String> = (0..10).map(|i| format!("requirement {i}")).collect();
    let scripted = ScriptedClient::new(vec![Ok(json!({
        "modules": [{"module": "Orders", "requirements": requirements}],
        "mandatory_coverage": []
    }))])
    .with_delay(Duration::from_millis(50))
    .shared();
    let client: SharedClient = scripted.clone();
    let mut handle = orchestrator(client).run(RunRequest::new(sample_requirement()));

    while let Some(event) = handle.events.next_event().await {
        if matches!(event, StreamEvent::Modules { .. }) {
            break;
        }
    }
    handle.events.cancel();
    let result = handle.finish().await;

    assert!(matches!(result, Err(PipelineError::Cancelled)));
    // the modules call plus at most the plan call already in flight
    assert!(scripted.calls() <= 2, "calls after cancel: {}", scripted.calls());
}

#[tokio::test]
async fn oversized_cases_timeout_is_a_config_error() {
    let client: SharedClient = Arc::new(FailingClient::transport());
    let config = PipelineConfig::default().with_cases_timeout(u64::MAX);
    assert!(matches!(
        Orchestrator::new(client, config),
        Err(PipelineError::Config(_))
    ));
}

#[tokio::test]
async fn longest_accepted_cases_timeout_still_finishes() {
    let client: SharedClient = Arc::new(FailingClient::transport());
    let config = PipelineConfig::default().with_cases_timeout(MAX_CASES_TIMEOUT_SECS);
    let (events, summary) = orchestrator_with(client, config)
        .run(RunRequest::new("book a flight"))
        .collect()
        .await;
    assert!(summary.is_ok());
    assert!(matches!(events.last(), Some(StreamEvent::Done { .. })));
}
