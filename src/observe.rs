//! Observability for task execution
//!
//! Handles report lifecycle moments as [`TaskEvent`]s to an injected
//! [`EventSink`] instead of logging directly. The default sink forwards to
//! `tracing`; tests swap in [`MemorySink`] to assert on the exact event
//! sequence, and benchmarks use [`NullSink`] to measure without diagnostics.

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error};
use uuid::Uuid;

/// One lifecycle moment of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskEvent {
    /// Id of the handle that emitted the event.
    pub task_id: Uuid,
    /// What happened.
    pub kind: TaskEventKind,
}

impl TaskEvent {
    /// Create an event for the given task.
    pub fn new(task_id: Uuid, kind: TaskEventKind) -> Self {
        Self { task_id, kind }
    }
}

/// The lifecycle moments a sink can observe.
///
/// Per task the worker-side order is `Started`, then `Succeeded` or
/// `Failed`; the collect-side events follow whenever the owner collects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TaskEventKind {
    /// The worker was spawned.
    Started,
    /// The callable returned a value; it is now held for collection.
    Succeeded,
    /// The callable failed or panicked; the failure is now captured.
    Failed {
        /// Failure classification.
        kind: String,
        /// Failure message.
        message: String,
    },
    /// A collect call handed the stored value to the owner.
    ValueDelivered,
    /// A collect call handed the captured failure to the owner.
    FailureDelivered {
        /// Classification of the delivered failure.
        kind: String,
    },
    /// A bounded collect gave up before the worker finished.
    CollectTimedOut,
}

/// Records task lifecycle events.
///
/// Injected per handle or per runner rather than global, so tests can
/// capture diagnostics deterministically. Implementations must not block.
pub trait EventSink: Send + Sync {
    /// Record one event.
    fn record(&self, event: TaskEvent);
}

/// Default sink: forwards events to the `tracing` macros.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: TaskEvent) {
        match &event.kind {
            TaskEventKind::Started => {
                debug!(task_id = %event.task_id, "task started")
            }
            TaskEventKind::Succeeded => {
                debug!(task_id = %event.task_id, "task succeeded")
            }
            TaskEventKind::Failed { kind, message } => {
                error!(task_id = %event.task_id, kind = %kind, message = %message, "task failed")
            }
            TaskEventKind::ValueDelivered => {
                debug!(task_id = %event.task_id, "value delivered")
            }
            TaskEventKind::FailureDelivered { kind } => {
                debug!(task_id = %event.task_id, kind = %kind, "failure delivered")
            }
            TaskEventKind::CollectTimedOut => {
                debug!(task_id = %event.task_id, "collect timed out before worker finished")
            }
        }
    }
}

/// Buffers events in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<TaskEvent>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<TaskEvent> {
        self.events.lock().clone()
    }

    /// Just the event kinds, in arrival order.
    pub fn kinds(&self) -> Vec<TaskEventKind> {
        self.events.lock().iter().map(|e| e.kind.clone()).collect()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: TaskEvent) {
        self.events.lock().push(event);
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _event: TaskEvent) {}
}
