use std::collections::BTreeSet;

use stagegate::workflows::{ErrorKind, StageStatus, WorkflowError, WorkflowStatus};

mod fixtures;
use fixtures::{active_scenario, approver, scenario_definition, stage, test_engine};

fn names(ids: &[&str]) -> BTreeSet<stagegate::ApproverId> {
    ids.iter().map(|id| approver(id)).collect()
}

#[tokio::test]
async fn test_two_stage_quorum_runs_to_approval() {
    let t = test_engine();
    let id = active_scenario(&t.engine).await;

    assert_eq!(t.engine.eligible_approvers(&id).await.unwrap(), names(&["Alice", "Bob"]));

    let wf = t
        .engine
        .record_approval(&id, &stage("review"), &approver("Alice"))
        .await
        .unwrap();
    assert_eq!(wf.stages[0].status, StageStatus::Pending);
    assert_eq!(t.engine.progress(&id).await.unwrap(), 0.0);
    assert_eq!(t.engine.eligible_approvers(&id).await.unwrap(), names(&["Bob"]));

    let wf = t
        .engine
        .record_approval(&id, &stage("review"), &approver("Bob"))
        .await
        .unwrap();
    assert_eq!(wf.stages[0].status, StageStatus::Approved);
    assert_eq!(wf.current_stage_index, 1);
    assert_eq!(t.engine.progress(&id).await.unwrap(), 50.0);
    assert_eq!(t.engine.eligible_approvers(&id).await.unwrap(), names(&["Carol"]));

    let wf = t
        .engine
        .record_approval(&id, &stage("signoff"), &approver("Carol"))
        .await
        .unwrap();
    assert_eq!(wf.status, WorkflowStatus::Approved);
    assert_eq!(wf.current_stage_index, 1);
    assert!(wf.completed_at.is_some());
    assert_eq!(t.engine.progress(&id).await.unwrap(), 100.0);
    assert!(t.engine.eligible_approvers(&id).await.unwrap().is_empty());

    assert_eq!(
        t.events.names(),
        vec![
            "workflow-activated",
            "approval-recorded",
            "approval-recorded",
            "stage-approved",
            "approval-recorded",
            "stage-approved",
            "workflow-approved",
        ]
    );
}

#[tokio::test]
async fn test_rejection_halts_the_workflow() {
    let t = test_engine();
    let id = active_scenario(&t.engine).await;

    t.engine
        .record_approval(&id, &stage("review"), &approver("Alice"))
        .await
        .unwrap();
    let before = t.engine.progress(&id).await.unwrap();
    t.events.clear();

    let wf = t
        .engine
        .record_rejection(&id, &stage("review"), &approver("Bob"), "scope unclear")
        .await
        .unwrap();

    assert_eq!(wf.status, WorkflowStatus::Rejected);
    assert_eq!(wf.final_decision.as_deref(), Some("scope unclear"));
    assert_eq!(wf.stages[0].status, StageStatus::Rejected);
    assert_eq!(wf.stages[0].comments.as_deref(), Some("scope unclear"));
    assert_eq!(wf.stages[1].status, StageStatus::Pending);
    assert_eq!(wf.current_stage_index, 0);
    assert_eq!(t.engine.progress(&id).await.unwrap(), before);
    assert_eq!(t.events.names(), vec!["stage-rejected", "workflow-rejected"]);

    let snapshot = t.engine.get_workflow(&id).await.unwrap();
    let refusals = [
        t.engine
            .record_approval(&id, &stage("signoff"), &approver("Carol"))
            .await
            .unwrap_err(),
        t.engine
            .record_rejection(&id, &stage("signoff"), &approver("Carol"), "again")
            .await
            .unwrap_err(),
        t.engine.activate_workflow(&id).await.unwrap_err(),
        t.engine.cancel_workflow(&id, "Sarah").await.unwrap_err(),
    ];
    for err in refusals {
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }
    assert_eq!(t.engine.get_workflow(&id).await.unwrap(), snapshot);
}

#[tokio::test]
async fn test_rejection_at_final_stage_keeps_earlier_progress() {
    let t = test_engine();
    let id = active_scenario(&t.engine).await;
    for name in ["Alice", "Bob"] {
        t.engine
            .record_approval(&id, &stage("review"), &approver(name))
            .await
            .unwrap();
    }

    // Bob does not sit on the sign-off stage
    let err = t
        .engine
        .record_rejection(&id, &stage("signoff"), &approver("Bob"), "scope unclear")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotEligible);

    let wf = t
        .engine
        .record_rejection(&id, &stage("signoff"), &approver("Carol"), "scope unclear")
        .await
        .unwrap();
    assert_eq!(wf.status, WorkflowStatus::Rejected);
    assert_eq!(wf.final_decision.as_deref(), Some("scope unclear"));
    assert_eq!(t.engine.progress(&id).await.unwrap(), 50.0);
}

#[tokio::test]
async fn test_unreachable_quorum_is_refused_and_not_stored() {
    let t = test_engine();
    let mut definition = scenario_definition();
    definition.stages[0].required_approvals = 3;

    let err = t.engine.create_workflow(definition).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidDefinition);
    assert!(t.store.is_empty().await);
    assert!(t.engine.list_workflows(None).await.unwrap().is_empty());
    assert!(t.events.events().is_empty());
}

#[tokio::test]
async fn test_outsider_approval_changes_nothing() {
    let t = test_engine();
    let id = active_scenario(&t.engine).await;
    let before = t.engine.get_workflow(&id).await.unwrap();
    t.events.clear();

    let err = t
        .engine
        .record_approval(&id, &stage("review"), &approver("Mallory"))
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::NotEligible { .. }));
    assert_eq!(t.engine.get_workflow(&id).await.unwrap(), before);
    assert!(t.events.events().is_empty());
    assert!(!t.engine.can_approve(&id, &approver("Mallory")).await.unwrap());
}

#[tokio::test]
async fn test_stage_addressing_errors() {
    let t = test_engine();
    let id = active_scenario(&t.engine).await;

    let err = t
        .engine
        .record_approval(&id, &stage("signoff"), &approver("Carol"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WrongStage);

    let err = t
        .engine
        .record_approval(&id, &stage("audit"), &approver("Alice"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_draft_accepts_no_decisions() {
    let t = test_engine();
    let id = t.engine.create_workflow(scenario_definition()).await.unwrap();

    let wf = t.engine.get_workflow(&id).await.unwrap();
    assert_eq!(wf.status, WorkflowStatus::Draft);
    assert!(t.engine.eligible_approvers(&id).await.unwrap().is_empty());
    assert!(!t.engine.can_approve(&id, &approver("Alice")).await.unwrap());

    let err = t
        .engine
        .record_approval(&id, &stage("review"), &approver("Alice"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn test_cancel_from_draft_and_in_progress() {
    let t = test_engine();

    let draft = t.engine.create_workflow(scenario_definition()).await.unwrap();
    let wf = t.engine.cancel_workflow(&draft, "Sarah").await.unwrap();
    assert_eq!(wf.status, WorkflowStatus::Cancelled);
    assert_eq!(wf.cancelled_by.as_deref(), Some("Sarah"));
    assert_eq!(wf.completed_at, Some(fixtures::start_time()));

    let running = active_scenario(&t.engine).await;
    t.engine
        .record_approval(&running, &stage("review"), &approver("Alice"))
        .await
        .unwrap();
    let wf = t.engine.cancel_workflow(&running, "Sarah").await.unwrap();
    assert_eq!(wf.status, WorkflowStatus::Cancelled);
    assert!(wf.stages[0].current_approvals.contains(&approver("Alice")));

    let err = t
        .engine
        .record_approval(&running, &stage("review"), &approver("Bob"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn test_list_filters_by_subject_oldest_first() {
    let t = test_engine();
    let first = t.engine.create_workflow(scenario_definition()).await.unwrap();
    t.clock.advance(chrono::Duration::minutes(5));
    let other = t
        .engine
        .create_workflow(fixtures::single_stage_definition(&["Emma"], 1))
        .await
        .unwrap();
    t.clock.advance(chrono::Duration::minutes(5));
    let second = t.engine.create_workflow(scenario_definition()).await.unwrap();

    let all: Vec<_> = t
        .engine
        .list_workflows(None)
        .await
        .unwrap()
        .into_iter()
        .map(|wf| wf.id)
        .collect();
    assert_eq!(all, vec![first.clone(), other, second.clone()]);

    let p001: Vec<_> = t
        .engine
        .list_workflows(Some("P001"))
        .await
        .unwrap()
        .into_iter()
        .map(|wf| wf.id)
        .collect();
    assert_eq!(p001, vec![first, second]);
}

#[tokio::test]
async fn test_summary_reports_overdue_stage() {
    let t = test_engine();
    let id = active_scenario(&t.engine).await;
    for name in ["Alice", "Bob"] {
        t.engine
            .record_approval(&id, &stage("review"), &approver(name))
            .await
            .unwrap();
    }

    let summary = t.engine.summarize(&id).await.unwrap();
    assert_eq!(summary.current_stage.as_deref(), Some("Final Sign-off"));
    assert!(!summary.overdue);

    t.clock.set(chrono::DateTime::parse_from_rfc3339("2030-02-01T00:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc));
    let summary = t.engine.summarize(&id).await.unwrap();
    assert!(summary.overdue);
    assert_eq!(summary.pending_approvers, names(&["Carol"]));
}
