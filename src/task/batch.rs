//! Batch runner: fan a batch of callables out, collect values in order
//!
//! Every callable gets its own worker and every worker is started before any
//! result is awaited, so the batch runs with full overlap. Collection then
//! walks the handles strictly in input order and stops at the first failure
//! it meets; later workers keep running to completion on their own.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::observe::{EventSink, TracingSink};
use crate::task::handle::{HandleError, TaskHandle};
use crate::task::{Args, Kwargs, TaskFn};
use crate::{Result, TaskfanError};

/// Runs batches of callables with fan-out/fan-in semantics.
///
/// The runner itself is cheap configuration: an optional concurrency cap and
/// the event sink handed to every handle it creates.
pub struct BatchRunner {
    /// Maximum callables executing at once; `None` means unbounded.
    max_concurrency: Option<usize>,
    /// Sink receiving lifecycle events from all handles in a batch.
    sink: Arc<dyn EventSink>,
}

impl BatchRunner {
    /// Create a runner with unbounded concurrency and the tracing sink.
    pub fn new() -> Self {
        Self {
            max_concurrency: None,
            sink: Arc::new(TracingSink),
        }
    }

    /// Cap how many callables may execute at once.
    ///
    /// Workers are still all started up front; the cap gates execution, not
    /// spawning, so ordered collection is unaffected.
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit.max(1));
        self
    }

    /// Replace the default tracing sink for all handles this runner creates.
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Run one batch: start every callable, then collect in input order.
    ///
    /// `args` and `kwargs` are optional per-callable argument vectors; when
    /// given, each must have exactly one entry per callable. A missing vector
    /// means empty arguments for every callable.
    ///
    /// On success the returned values are index-aligned with `callables`.
    /// The first failure, in input order, aborts collection and is returned
    /// as the batch error; values collected before it are discarded.
    #[instrument(skip(self, callables, args, kwargs), fields(batch_size = callables.len()))]
    pub async fn run<T>(
        &self,
        callables: Vec<TaskFn<T>>,
        args: Option<Vec<Args>>,
        kwargs: Option<Vec<Kwargs>>,
    ) -> Result<Vec<T>>
    where
        T: Clone + Send + 'static,
    {
        let expected = callables.len();

        // Argument vectors must line up before anything is allowed to run
        if let Some(ref args) = args {
            if args.len() != expected {
                return Err(TaskfanError::LengthMismatch {
                    argument: "args",
                    expected,
                    actual: args.len(),
                });
            }
        }
        if let Some(ref kwargs) = kwargs {
            if kwargs.len() != expected {
                return Err(TaskfanError::LengthMismatch {
                    argument: "kwargs",
                    expected,
                    actual: kwargs.len(),
                });
            }
        }

        if callables.is_empty() {
            debug!("empty batch, nothing to run");
            return Ok(Vec::new());
        }

        let args = args.unwrap_or_else(|| vec![Args::new(); expected]);
        let kwargs = kwargs.unwrap_or_else(|| vec![Kwargs::new(); expected]);

        info!(
            batch_size = expected,
            max_concurrency = ?self.max_concurrency,
            "starting batch"
        );

        let gate = self
            .max_concurrency
            .map(|limit| Arc::new(Semaphore::new(limit)));

        let mut handles: Vec<TaskHandle<T>> = callables
            .into_iter()
            .zip(args)
            .zip(kwargs)
            .map(|((callable, args), kwargs)| {
                TaskHandle::new(callable, args, kwargs).with_event_sink(Arc::clone(&self.sink))
            })
            .collect();

        // Fan-out: every worker starts before any result is awaited
        for handle in &mut handles {
            match &gate {
                Some(gate) => handle.start_gated(Arc::clone(gate))?,
                None => handle.start()?,
            }
        }

        // Fan-in: strict input order, first failure aborts
        let mut values = Vec::with_capacity(expected);
        for (index, handle) in handles.iter_mut().enumerate() {
            match handle.collect(None).await {
                Ok(Some(value)) => values.push(value),
                Ok(None) => return Err(HandleError::AlreadyCollected.into()),
                Err(error) => {
                    warn!(
                        index,
                        task_id = %handle.id(),
                        error = %error,
                        "batch aborted at failed slot"
                    );
                    return Err(error);
                }
            }
        }

        info!(batch_size = expected, "batch completed");
        Ok(values)
    }
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a batch with default settings.
///
/// Convenience wrapper over [`BatchRunner::run`] for the common case of
/// unbounded concurrency and tracing observability.
pub async fn run_batch<T>(
    callables: Vec<TaskFn<T>>,
    args: Option<Vec<Args>>,
    kwargs: Option<Vec<Kwargs>>,
) -> Result<Vec<T>>
where
    T: Clone + Send + 'static,
{
    BatchRunner::new().run(callables, args, kwargs).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::task_fn;
    use serde_json::{json, Value};

    #[test]
    fn test_runner_defaults() {
        let runner = BatchRunner::new();
        assert!(runner.max_concurrency.is_none());
    }

    #[test]
    fn test_runner_configuration() {
        let runner = BatchRunner::new().with_max_concurrency(4);
        assert_eq!(runner.max_concurrency, Some(4));
    }

    #[test]
    fn test_zero_concurrency_clamps_to_one() {
        let runner = BatchRunner::new().with_max_concurrency(0);
        assert_eq!(runner.max_concurrency, Some(1));
    }

    #[tokio::test]
    async fn test_empty_batch_yields_no_values() {
        let values = run_batch::<Value>(Vec::new(), None, None).await.unwrap();
        assert!(values.is_empty());
    }

    #[tokio::test]
    async fn test_missing_argument_vectors_default_to_empty() {
        let callables: Vec<TaskFn<Value>> = vec![
            task_fn(|args, kwargs| Ok(json!([args.len(), kwargs.len()]))),
            task_fn(|args, kwargs| Ok(json!([args.len(), kwargs.len()]))),
        ];

        let values = run_batch(callables, None, None).await.unwrap();
        assert_eq!(values, vec![json!([0, 0]), json!([0, 0])]);
    }

    #[tokio::test]
    async fn test_args_length_checked_before_any_run() {
        let callables: Vec<TaskFn<Value>> = vec![
            task_fn(|_args, _kwargs| Ok(json!(1))),
            task_fn(|_args, _kwargs| Ok(json!(2))),
        ];

        let error = run_batch(callables, Some(vec![vec![json!(0)]]), None)
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            TaskfanError::LengthMismatch {
                argument: "args",
                expected: 2,
                actual: 1,
            }
        ));
    }

    #[tokio::test]
    async fn test_kwargs_length_checked_even_for_empty_batch() {
        let error = run_batch::<Value>(Vec::new(), None, Some(vec![Kwargs::new()]))
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            TaskfanError::LengthMismatch {
                argument: "kwargs",
                expected: 0,
                actual: 1,
            }
        ));
    }
}
