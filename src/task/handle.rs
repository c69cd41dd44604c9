//! Task handle: one callable, one worker, one captured outcome
//!
//! A [`TaskHandle`] owns a single callable together with its arguments. When
//! started, the callable runs on a dedicated blocking worker so the caller
//! never shares its thread of execution. Whatever the callable produces, a
//! value or a failure, is captured on the worker and handed over when the
//! owner collects.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use uuid::Uuid;

use crate::observe::{EventSink, TaskEvent, TaskEventKind, TracingSink};
use crate::task::{Args, Kwargs, TaskFn};

/// A failure captured from a callable while it ran on its worker.
///
/// Failures carry a `kind` (an exception-style class name such as
/// `"ValueError"`, or `"Panic"` for a caught panic) and a human-readable
/// message. Both survive the trip across the worker boundary unmodified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct TaskFailure {
    /// Failure classification, typically an error type name.
    pub kind: String,
    /// Human-readable description of what went wrong.
    pub message: String,
}

impl TaskFailure {
    /// Create a failure with the given kind and message.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Normalize a worker join error into a task failure.
    ///
    /// A panicking callable becomes a `"Panic"` failure carrying the panic
    /// message; an externally aborted worker becomes `"Cancelled"`.
    pub(crate) fn from_join_error(error: JoinError) -> Self {
        if error.is_panic() {
            Self {
                kind: "Panic".to_string(),
                message: panic_message(error.into_panic()),
            }
        } else {
            Self {
                kind: "Cancelled".to_string(),
                message: error.to_string(),
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic payload of unknown type".to_string()
    }
}

/// Lifecycle misuse of a [`TaskHandle`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    /// Collect was called before the worker was ever started.
    #[error("worker was never started")]
    NotStarted,

    /// Start was called on a handle whose worker already ran.
    #[error("worker was already started")]
    AlreadyStarted,

    /// The handle has no outcome left to deliver.
    #[error("outcome was already collected")]
    AlreadyCollected,
}

/// Where the worker's outcome lives between completion and collection.
///
/// Success stays readable forever; a failure is handed out exactly once and
/// then degrades to `FailedRead`.
#[derive(Debug)]
enum Outcome<T> {
    /// No outcome captured yet.
    Pending,
    /// The callable produced a value.
    Succeeded(T),
    /// The callable failed; nobody has been told yet.
    FailedUnread(TaskFailure),
    /// The failure was delivered once and cleared.
    FailedRead,
}

/// The callable and arguments waiting for their worker.
struct WorkUnit<T> {
    callable: TaskFn<T>,
    args: Args,
    kwargs: Kwargs,
}

/// A single unit of work bound to its own concurrent worker.
///
/// The handle moves through three phases: constructed (callable held, no
/// worker), started (worker running), and collected (outcome delivered).
/// Collecting a success is idempotent; collecting a failure consumes it, so
/// the same failure is never reported twice.
///
/// The `&mut self` receivers make the single-owner contract explicit:
/// exactly one caller drives start and collect.
pub struct TaskHandle<T> {
    id: Uuid,
    unit: Option<WorkUnit<T>>,
    worker: Option<JoinHandle<std::result::Result<T, TaskFailure>>>,
    outcome: Outcome<T>,
    sink: Arc<dyn EventSink>,
}

impl<T: Send + 'static> TaskHandle<T> {
    /// Wrap a callable and its arguments into an unstarted handle.
    pub fn new(callable: TaskFn<T>, args: Args, kwargs: Kwargs) -> Self {
        Self {
            id: Uuid::new_v4(),
            unit: Some(WorkUnit {
                callable,
                args,
                kwargs,
            }),
            worker: None,
            outcome: Outcome::Pending,
            sink: Arc::new(TracingSink),
        }
    }

    /// Replace the default tracing sink with a custom event sink.
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Unique id of this handle, assigned at construction.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Spawn the worker and return immediately.
    ///
    /// Must be called from within a Tokio runtime. Calling start twice is an
    /// error; the callable runs at most once.
    pub fn start(&mut self) -> crate::Result<()> {
        self.spawn_worker(None)
    }

    /// Spawn the worker behind an admission gate.
    ///
    /// The worker starts immediately but the callable itself waits for a
    /// permit from `gate` before executing. Handles sharing one gate execute
    /// at most as many callables at once as the gate has permits.
    pub fn start_gated(&mut self, gate: Arc<Semaphore>) -> crate::Result<()> {
        self.spawn_worker(Some(gate))
    }

    fn spawn_worker(&mut self, gate: Option<Arc<Semaphore>>) -> crate::Result<()> {
        let unit = self.unit.take().ok_or(HandleError::AlreadyStarted)?;
        let id = self.id;
        let sink = Arc::clone(&self.sink);

        sink.record(TaskEvent::new(id, TaskEventKind::Started));

        let worker = tokio::spawn(async move {
            let _permit = match gate {
                Some(gate) => match gate.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(closed) => {
                        let failure = TaskFailure::new("GateClosed", closed.to_string());
                        sink.record(TaskEvent::new(
                            id,
                            TaskEventKind::Failed {
                                kind: failure.kind.clone(),
                                message: failure.message.clone(),
                            },
                        ));
                        return Err(failure);
                    }
                },
                None => None,
            };

            let WorkUnit {
                callable,
                args,
                kwargs,
            } = unit;

            // The callable is synchronous; it gets a dedicated blocking
            // thread rather than a slot on the async executor.
            let joined = tokio::task::spawn_blocking(move || callable(args, kwargs)).await;
            let result = match joined {
                Ok(result) => result,
                Err(join_error) => Err(TaskFailure::from_join_error(join_error)),
            };

            match &result {
                Ok(_) => sink.record(TaskEvent::new(id, TaskEventKind::Succeeded)),
                Err(failure) => sink.record(TaskEvent::new(
                    id,
                    TaskEventKind::Failed {
                        kind: failure.kind.clone(),
                        message: failure.message.clone(),
                    },
                )),
            }

            result
        });

        self.worker = Some(worker);
        Ok(())
    }

    /// Wait for the worker and deliver its outcome.
    ///
    /// With `timeout: None` this blocks until the worker finishes. With a
    /// timeout, an unfinished worker yields `Ok(None)` and keeps running;
    /// a later collect can still pick up its outcome.
    ///
    /// Delivery is asymmetric:
    /// - a successful value is returned as `Ok(Some(value))` on this and
    ///   every subsequent call;
    /// - a captured failure is returned as `Err` exactly once, after which
    ///   the handle reports `Ok(None)`.
    ///
    /// Collecting a handle that was never started is a [`HandleError`].
    pub async fn collect(&mut self, timeout: Option<Duration>) -> crate::Result<Option<T>>
    where
        T: Clone,
    {
        if self.unit.is_some() {
            return Err(HandleError::NotStarted.into());
        }

        if let Some(worker) = self.worker.as_mut() {
            let joined = match timeout {
                Some(limit) => match tokio::time::timeout(limit, &mut *worker).await {
                    Ok(joined) => joined,
                    Err(_elapsed) => {
                        self.sink
                            .record(TaskEvent::new(self.id, TaskEventKind::CollectTimedOut));
                        return Ok(None);
                    }
                },
                None => worker.await,
            };

            self.worker = None;
            self.outcome = match joined {
                Ok(Ok(value)) => Outcome::Succeeded(value),
                Ok(Err(failure)) => Outcome::FailedUnread(failure),
                Err(join_error) => Outcome::FailedUnread(TaskFailure::from_join_error(join_error)),
            };
        }

        match std::mem::replace(&mut self.outcome, Outcome::Pending) {
            Outcome::Pending => Ok(None),
            Outcome::Succeeded(value) => {
                let delivered = value.clone();
                self.outcome = Outcome::Succeeded(value);
                self.sink
                    .record(TaskEvent::new(self.id, TaskEventKind::ValueDelivered));
                Ok(Some(delivered))
            }
            Outcome::FailedUnread(failure) => {
                self.outcome = Outcome::FailedRead;
                self.sink.record(TaskEvent::new(
                    self.id,
                    TaskEventKind::FailureDelivered {
                        kind: failure.kind.clone(),
                    },
                ));
                Err(failure.into())
            }
            Outcome::FailedRead => {
                self.outcome = Outcome::FailedRead;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::task_fn;
    use crate::TaskfanError;
    use serde_json::{json, Value};

    fn value_handle(value: Value) -> TaskHandle<Value> {
        TaskHandle::new(
            task_fn(move |_args, _kwargs| Ok(value)),
            Args::new(),
            Kwargs::new(),
        )
    }

    fn failing_handle(kind: &str, message: &str) -> TaskHandle<Value> {
        let failure = TaskFailure::new(kind, message);
        TaskHandle::new(
            task_fn(move |_args, _kwargs| Err::<Value, _>(failure)),
            Args::new(),
            Kwargs::new(),
        )
    }

    #[tokio::test]
    async fn test_collect_returns_value() {
        let mut handle = value_handle(json!(7));
        handle.start().unwrap();

        let value = handle.collect(None).await.unwrap();
        assert_eq!(value, Some(json!(7)));
    }

    #[tokio::test]
    async fn test_success_collects_repeatedly() {
        let mut handle = value_handle(json!("stable"));
        handle.start().unwrap();

        assert_eq!(handle.collect(None).await.unwrap(), Some(json!("stable")));
        assert_eq!(handle.collect(None).await.unwrap(), Some(json!("stable")));
        assert_eq!(handle.collect(None).await.unwrap(), Some(json!("stable")));
    }

    #[tokio::test]
    async fn test_failure_delivered_exactly_once() {
        let mut handle = failing_handle("ValueError", "boom");
        handle.start().unwrap();

        let error = handle.collect(None).await.unwrap_err();
        match error {
            TaskfanError::Task(failure) => {
                assert_eq!(failure, TaskFailure::new("ValueError", "boom"));
            }
            other => panic!("unexpected error: {other}"),
        }

        // Second collect has nothing left to report
        assert_eq!(handle.collect(None).await.unwrap(), None);
        assert_eq!(handle.collect(None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_panic_is_captured_as_failure() {
        let mut handle: TaskHandle<Value> = TaskHandle::new(
            task_fn(|_args, _kwargs| -> Result<Value, TaskFailure> { panic!("kaboom") }),
            Args::new(),
            Kwargs::new(),
        );
        handle.start().unwrap();

        let error = handle.collect(None).await.unwrap_err();
        match error {
            TaskfanError::Task(failure) => {
                assert_eq!(failure.kind, "Panic");
                assert_eq!(failure.message, "kaboom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_collect_before_start_is_rejected() {
        let mut handle = value_handle(json!(0));

        let error = handle.collect(None).await.unwrap_err();
        assert!(matches!(
            error,
            TaskfanError::Handle(HandleError::NotStarted)
        ));
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let mut handle = value_handle(json!(1));
        handle.start().unwrap();

        let error = handle.start().unwrap_err();
        assert!(matches!(
            error,
            TaskfanError::Handle(HandleError::AlreadyStarted)
        ));

        // The first worker is unaffected
        assert_eq!(handle.collect(None).await.unwrap(), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_timeout_leaves_worker_collectable() {
        let mut handle: TaskHandle<Value> = TaskHandle::new(
            task_fn(|_args, _kwargs| {
                std::thread::sleep(Duration::from_millis(100));
                Ok(json!("slow"))
            }),
            Args::new(),
            Kwargs::new(),
        );
        handle.start().unwrap();

        // Too early: no outcome yet, worker keeps running
        let early = handle.collect(Some(Duration::from_millis(5))).await.unwrap();
        assert_eq!(early, None);

        // Unbounded collect picks the value up afterwards
        let value = handle.collect(None).await.unwrap();
        assert_eq!(value, Some(json!("slow")));
    }

    #[tokio::test]
    async fn test_gated_start_executes() {
        let gate = Arc::new(Semaphore::new(1));
        let mut handle = value_handle(json!("gated"));
        handle.start_gated(gate).unwrap();

        assert_eq!(handle.collect(None).await.unwrap(), Some(json!("gated")));
    }

    #[tokio::test]
    async fn test_failure_state_transitions() {
        let mut handle = failing_handle("RuntimeError", "once only");
        handle.start().unwrap();

        assert!(handle.collect(None).await.is_err());
        assert!(matches!(handle.outcome, Outcome::FailedRead));
    }

    #[test]
    fn test_failure_fields_and_display() {
        let failure = TaskFailure::new("TypeError", "not a number");

        assert_eq!(failure.kind, "TypeError");
        assert_eq!(failure.message, "not a number");
        assert_eq!(failure.to_string(), "TypeError: not a number");
    }
}
