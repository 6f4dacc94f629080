// Outbound transition events for the notification layer.
// The engine only emits; delivery is the collaborator's concern.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::info;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use super::types::{ApproverId, StageId, WorkflowId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum WorkflowEvent {
    WorkflowActivated {
        workflow_id: WorkflowId,
    },
    ApprovalRecorded {
        workflow_id: WorkflowId,
        stage_id: StageId,
        approver_id: ApproverId,
    },
    StageApproved {
        workflow_id: WorkflowId,
        stage_id: StageId,
    },
    WorkflowApproved {
        workflow_id: WorkflowId,
    },
    StageRejected {
        workflow_id: WorkflowId,
        stage_id: StageId,
        reason: String,
    },
    WorkflowRejected {
        workflow_id: WorkflowId,
        reason: String,
    },
    WorkflowCancelled {
        workflow_id: WorkflowId,
        cancelled_by: String,
    },
}

impl WorkflowEvent {
    pub fn workflow_id(&self) -> &WorkflowId {
        match self {
            WorkflowEvent::WorkflowActivated { workflow_id }
            | WorkflowEvent::ApprovalRecorded { workflow_id, .. }
            | WorkflowEvent::StageApproved { workflow_id, .. }
            | WorkflowEvent::WorkflowApproved { workflow_id }
            | WorkflowEvent::StageRejected { workflow_id, .. }
            | WorkflowEvent::WorkflowRejected { workflow_id, .. }
            | WorkflowEvent::WorkflowCancelled { workflow_id, .. } => workflow_id,
        }
    }

    /// Kebab-case name matching the serialized `type` tag
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowEvent::WorkflowActivated { .. } => "workflow-activated",
            WorkflowEvent::ApprovalRecorded { .. } => "approval-recorded",
            WorkflowEvent::StageApproved { .. } => "stage-approved",
            WorkflowEvent::WorkflowApproved { .. } => "workflow-approved",
            WorkflowEvent::StageRejected { .. } => "stage-rejected",
            WorkflowEvent::WorkflowRejected { .. } => "workflow-rejected",
            WorkflowEvent::WorkflowCancelled { .. } => "workflow-cancelled",
        }
    }
}

/// Receives events after the state that produced them has been saved
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &WorkflowEvent);
}

/// Writes each event as a structured log record
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEventSink;

impl EventSink for LoggingEventSink {
    fn publish(&self, event: &WorkflowEvent) {
        info!(
            event = event.name(),
            workflow.id = %event.workflow_id(),
            payload = ?event,
            "Workflow event emitted"
        );
    }
}

/// In-process pub/sub over a broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    sender: broadcast::Sender<WorkflowEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for BroadcastEventSink {
    fn publish(&self, event: &WorkflowEvent) {
        // No subscribers is not an error
        let _ = self.sender.send(event.clone());
    }
}

/// Fan out to several sinks in order
pub struct CompositeEventSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl CompositeEventSink {
    pub fn new(sinks: Vec<Box<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for CompositeEventSink {
    fn publish(&self, event: &WorkflowEvent) {
        for sink in &self.sinks {
            sink.publish(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected() -> WorkflowEvent {
        WorkflowEvent::WorkflowRejected {
            workflow_id: WorkflowId::from("wf1"),
            reason: "scope unclear".to_string(),
        }
    }

    #[test]
    fn test_event_serializes_with_kebab_case_tag() {
        let json = serde_json::to_value(rejected()).unwrap();
        assert_eq!(json["type"], "workflow-rejected");
        assert_eq!(json["workflowId"], "wf1");
        assert!(json.get("workflow_id").is_none());
        assert_eq!(json["reason"], "scope unclear");
        assert_eq!(rejected().name(), "workflow-rejected");
    }

    #[test]
    fn test_event_fields_match_record_casing() {
        let event = WorkflowEvent::ApprovalRecorded {
            workflow_id: WorkflowId::from("wf1"),
            stage_id: StageId::from("review"),
            approver_id: ApproverId::from("Alice"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["stageId"], "review");
        assert_eq!(json["approverId"], "Alice");

        let back: WorkflowEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[tokio::test]
    async fn test_broadcast_sink_delivers_to_subscribers() {
        let sink = BroadcastEventSink::new(8);
        let mut receiver = sink.subscribe();

        sink.publish(&rejected());

        assert_eq!(receiver.recv().await.unwrap(), rejected());
    }

    #[test]
    fn test_broadcast_sink_without_subscribers_is_silent() {
        let sink = BroadcastEventSink::new(1);
        sink.publish(&rejected());
    }

    #[test]
    fn test_composite_sink_fans_out() {
        let mut first = MockEventSink::new();
        first.expect_publish().times(1).return_const(());
        let mut second = MockEventSink::new();
        second
            .expect_publish()
            .withf(|event| event.name() == "workflow-rejected")
            .times(1)
            .return_const(());

        let sink = CompositeEventSink::new(vec![Box::new(first), Box::new(second)]);
        sink.publish(&rejected());
    }
}
