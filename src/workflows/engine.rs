//! Workflow engine
//!
//! Owns the command/query surface. Every mutating command against a workflow
//! runs under that workflow's own lock: load, apply the transition to a
//! working copy, save, then publish events. Commands on different workflows
//! never wait on each other.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn, Instrument};

use super::clock::{Clock, SystemClock};
use super::error::WorkflowError;
use super::events::{EventSink, LoggingEventSink, WorkflowEvent};
use super::quorum;
use super::report::{summarize, WorkflowSummary};
use super::state_machine::{apply_transition, StateTransition};
use super::types::{ApproverId, StageId, Workflow, WorkflowDefinition, WorkflowId, WorkflowSnapshot};
use super::validation::{validate_definition, ValidationLimits};
use crate::observability::{EngineMetrics, OperationTimer};
use crate::store::WorkflowStore;
use crate::telemetry::{create_workflow_span, generate_correlation_id};

/// One async mutex per workflow id, created on demand
#[derive(Debug, Default)]
struct WorkflowLocks {
    locks: std::sync::Mutex<HashMap<WorkflowId, Arc<Mutex<()>>>>,
}

impl WorkflowLocks {
    fn registry(&self) -> std::sync::MutexGuard<'_, HashMap<WorkflowId, Arc<Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn acquire(&self, id: &WorkflowId) -> WorkflowLease<'_> {
        let lock = self.registry().entry(id.clone()).or_default().clone();
        let mut lease = WorkflowLease {
            locks: self,
            id: id.clone(),
            lock: lock.clone(),
            guard: None,
        };
        lease.guard = Some(lock.lock_owned().await);
        lease
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.registry().len()
    }
}

/// Holds a workflow's mutex. On drop, however the command ended, the
/// registry entry is forgotten once nobody else holds or waits on it.
struct WorkflowLease<'a> {
    locks: &'a WorkflowLocks,
    id: WorkflowId,
    lock: Arc<Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for WorkflowLease<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut registry = self.locks.registry();
        // Clones are only handed out under the registry lock, so two
        // references (registry and this lease) mean no other holder
        let unused = registry
            .get(&self.id)
            .is_some_and(|lock| Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 2);
        if unused {
            registry.remove(&self.id);
        }
    }
}

pub struct WorkflowEngine {
    store: Arc<dyn WorkflowStore>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    limits: ValidationLimits,
    locks: WorkflowLocks,
    metrics: EngineMetrics,
}

impl std::fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngine")
            .field("limits", &self.limits)
            .field("metrics", &self.metrics.get_stats())
            .finish()
    }
}

impl WorkflowEngine {
    /// Engine with default limits, system time and log-only event delivery
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        Self {
            store,
            events: Arc::new(LoggingEventSink),
            clock: Arc::new(SystemClock),
            limits: ValidationLimits::default(),
            locks: WorkflowLocks::default(),
            metrics: EngineMetrics::new(),
        }
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_limits(mut self, limits: ValidationLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Validate and store a new workflow in `draft`
    pub async fn create_workflow(
        &self,
        definition: WorkflowDefinition,
    ) -> Result<WorkflowId, WorkflowError> {
        let correlation_id = generate_correlation_id();
        let span = create_workflow_span("create", None, &correlation_id);

        async {
            if let Err(e) = validate_definition(&definition, &self.limits) {
                self.metrics.record_refused();
                warn!(error = %e, subject = %definition.subject_id, "Workflow definition refused");
                return Err(e);
            }

            let id = WorkflowId::generate();
            let workflow = Workflow::from_definition(id.clone(), definition, self.clock.now());
            self.store.save(&workflow).await?;

            self.metrics.record_created();
            info!(
                workflow.id = %id,
                subject = %workflow.subject_id,
                stages = workflow.stages.len(),
                "Workflow created"
            );
            Ok(id)
        }
        .instrument(span)
        .await
    }

    pub async fn activate_workflow(&self, id: &WorkflowId) -> Result<WorkflowSnapshot, WorkflowError> {
        self.execute_atomic_transition(id, StateTransition::Activate)
            .await
    }

    pub async fn record_approval(
        &self,
        id: &WorkflowId,
        stage_id: &StageId,
        approver_id: &ApproverId,
    ) -> Result<WorkflowSnapshot, WorkflowError> {
        self.execute_atomic_transition(
            id,
            StateTransition::Approve {
                stage_id: stage_id.clone(),
                approver_id: approver_id.clone(),
            },
        )
        .await
    }

    pub async fn record_rejection(
        &self,
        id: &WorkflowId,
        stage_id: &StageId,
        approver_id: &ApproverId,
        reason: &str,
    ) -> Result<WorkflowSnapshot, WorkflowError> {
        self.execute_atomic_transition(
            id,
            StateTransition::Reject {
                stage_id: stage_id.clone(),
                approver_id: approver_id.clone(),
                reason: reason.to_string(),
            },
        )
        .await
    }

    pub async fn cancel_workflow(
        &self,
        id: &WorkflowId,
        cancelled_by: &str,
    ) -> Result<WorkflowSnapshot, WorkflowError> {
        self.execute_atomic_transition(
            id,
            StateTransition::Cancel {
                cancelled_by: cancelled_by.to_string(),
            },
        )
        .await
    }

    /// Either the whole transition is saved and announced, or nothing changes
    pub async fn execute_atomic_transition(
        &self,
        id: &WorkflowId,
        transition: StateTransition,
    ) -> Result<WorkflowSnapshot, WorkflowError> {
        let correlation_id = generate_correlation_id();
        let span = create_workflow_span(transition.operation(), Some(id.as_str()), &correlation_id);

        async {
            let timer = OperationTimer::new(transition.operation());
            let lease = self.locks.acquire(id).await;
            let outcome = self.transition_locked(id, &transition).await;
            drop(lease);
            timer.finish();

            match &outcome {
                Ok(_) => self.metrics.record_applied(),
                Err(e) => {
                    self.metrics.record_refused();
                    warn!(error = %e, operation = transition.operation(), "Workflow command refused");
                }
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn transition_locked(
        &self,
        id: &WorkflowId,
        transition: &StateTransition,
    ) -> Result<WorkflowSnapshot, WorkflowError> {
        // Other processes sharing the store are kept out until the save lands
        let _record = self.store.lock(id).await?;
        let mut workflow = self.load_existing(id).await?;
        let result = apply_transition(&mut workflow, transition, self.clock.now())?;
        self.store.save(&workflow).await?;

        for event in &result.events {
            self.count_event(event);
            self.events.publish(event);
        }

        Ok(workflow)
    }

    fn count_event(&self, event: &WorkflowEvent) {
        match event {
            WorkflowEvent::ApprovalRecorded { .. } => self.metrics.record_approval(),
            WorkflowEvent::WorkflowApproved { .. } => self.metrics.record_workflow_approved(),
            WorkflowEvent::WorkflowRejected { .. } => self.metrics.record_rejection(),
            WorkflowEvent::WorkflowCancelled { .. } => self.metrics.record_cancellation(),
            _ => {}
        }
    }

    async fn load_existing(&self, id: &WorkflowId) -> Result<Workflow, WorkflowError> {
        self.store
            .load(id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound {
                workflow_id: id.clone(),
            })
    }

    pub async fn get_workflow(&self, id: &WorkflowId) -> Result<WorkflowSnapshot, WorkflowError> {
        self.load_existing(id).await
    }

    pub async fn progress(&self, id: &WorkflowId) -> Result<f64, WorkflowError> {
        Ok(quorum::progress(&self.load_existing(id).await?))
    }

    pub async fn eligible_approvers(
        &self,
        id: &WorkflowId,
    ) -> Result<BTreeSet<ApproverId>, WorkflowError> {
        Ok(quorum::eligible_approvers(&self.load_existing(id).await?))
    }

    pub async fn can_approve(
        &self,
        id: &WorkflowId,
        approver_id: &ApproverId,
    ) -> Result<bool, WorkflowError> {
        Ok(quorum::can_approve(
            &self.load_existing(id).await?,
            approver_id,
        ))
    }

    /// Workflows under review for `subject_id`, or all of them, oldest first
    pub async fn list_workflows(
        &self,
        subject_id: Option<&str>,
    ) -> Result<Vec<WorkflowSnapshot>, WorkflowError> {
        let mut workflows: Vec<_> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|wf| subject_id.map_or(true, |subject| wf.subject_id == subject))
            .collect();
        workflows.sort_by(|a, b| {
            a.initiated_at
                .cmp(&b.initiated_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(workflows)
    }

    pub async fn summarize(&self, id: &WorkflowId) -> Result<WorkflowSummary, WorkflowError> {
        let workflow = self.load_existing(id).await?;
        Ok(summarize(&workflow, self.clock.now()))
    }
}
