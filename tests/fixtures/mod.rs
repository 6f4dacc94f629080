// Shared builders for engine integration tests
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::sync::{Arc, Mutex};

use stagegate::store::InMemoryWorkflowStore;
use stagegate::workflows::{
    ApproverId, EventSink, ManualClock, StageDefinition, StageId, WorkflowDefinition,
    WorkflowEngine, WorkflowEvent, WorkflowId,
};

/// Two stages: Alice and Bob must both approve, then Carol alone
pub fn scenario_definition() -> WorkflowDefinition {
    let json_data = include_str!("scenario_definition.json");
    serde_json::from_str(json_data).expect("Failed to parse scenario definition fixture")
}

pub fn single_stage_definition(approvers: &[&str], required_approvals: usize) -> WorkflowDefinition {
    WorkflowDefinition {
        subject_id: "P003".to_string(),
        name: "Employee Leave Request".to_string(),
        description: String::new(),
        initiated_by: "David".to_string(),
        stages: vec![StageDefinition {
            id: StageId::from("manager"),
            name: "Manager Approval".to_string(),
            description: String::new(),
            approvers: approvers.iter().map(|a| ApproverId::from(*a)).collect(),
            required_approvals,
            due_date: None,
        }],
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()
}

pub fn stage(id: &str) -> StageId {
    StageId::from(id)
}

pub fn approver(id: &str) -> ApproverId {
    ApproverId::from(id)
}

/// Keeps every published event for later assertions
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<WorkflowEvent>>,
}

impl RecordingEventSink {
    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(WorkflowEvent::name).collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl EventSink for RecordingEventSink {
    fn publish(&self, event: &WorkflowEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub struct TestEngine {
    pub engine: WorkflowEngine,
    pub store: Arc<InMemoryWorkflowStore>,
    pub events: Arc<RecordingEventSink>,
    pub clock: Arc<ManualClock>,
}

/// Engine over an in-memory store with recorded events and a manual clock
pub fn test_engine() -> TestEngine {
    let store = Arc::new(InMemoryWorkflowStore::new());
    let events = Arc::new(RecordingEventSink::default());
    let clock = Arc::new(ManualClock::new(start_time()));

    let engine = WorkflowEngine::new(store.clone())
        .with_event_sink(events.clone())
        .with_clock(clock.clone());

    TestEngine {
        engine,
        store,
        events,
        clock,
    }
}

/// Created and activated scenario workflow
pub async fn active_scenario(engine: &WorkflowEngine) -> WorkflowId {
    let id = engine
        .create_workflow(scenario_definition())
        .await
        .expect("scenario definition is valid");
    engine
        .activate_workflow(&id)
        .await
        .expect("draft workflow activates");
    id
}
