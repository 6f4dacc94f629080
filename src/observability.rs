use tracing::info;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Engine command counters
#[derive(Debug, Default)]
pub struct EngineMetrics {
    pub commands_applied: AtomicU64,
    pub commands_refused: AtomicU64,
    pub workflows_created: AtomicU64,
    pub approvals_recorded: AtomicU64,
    pub rejections_recorded: AtomicU64,
    pub workflows_approved: AtomicU64,
    pub workflows_cancelled: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_applied(&self) {
        self.commands_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refused(&self) {
        self.commands_refused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_created(&self) {
        self.workflows_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_approval(&self) {
        self.approvals_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self) {
        self.rejections_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_workflow_approved(&self) {
        self.workflows_approved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancellation(&self) {
        self.workflows_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> EngineStats {
        EngineStats {
            commands_applied: self.commands_applied.load(Ordering::Relaxed),
            commands_refused: self.commands_refused.load(Ordering::Relaxed),
            workflows_created: self.workflows_created.load(Ordering::Relaxed),
            approvals_recorded: self.approvals_recorded.load(Ordering::Relaxed),
            rejections_recorded: self.rejections_recorded.load(Ordering::Relaxed),
            workflows_approved: self.workflows_approved.load(Ordering::Relaxed),
            workflows_cancelled: self.workflows_cancelled.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            applied = stats.commands_applied,
            refused = stats.commands_refused,
            created = stats.workflows_created,
            approvals = stats.approvals_recorded,
            rejections = stats.rejections_recorded,
            completed = stats.workflows_approved,
            cancelled = stats.workflows_cancelled,
            "Workflow engine metrics"
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineStats {
    pub commands_applied: u64,
    pub commands_refused: u64,
    pub workflows_created: u64,
    pub approvals_recorded: u64,
    pub rejections_recorded: u64,
    pub workflows_approved: u64,
    pub workflows_cancelled: u64,
}

/// Time an operation and log its duration when finished
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis() as u64,
            "Operation completed"
        );
    }
}
