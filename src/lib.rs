//! # Taskfan
//!
//! Fan-out/fan-in execution of independent callables: each unit of work runs
//! on its own concurrent worker, and results are collected back in the exact
//! order the work was submitted.
//!
//! ## Overview
//!
//! Taskfan pairs two primitives. A [`task::TaskHandle`] wraps one callable
//! with its arguments, runs it on a dedicated worker, and captures either the
//! produced value or the failure for later retrieval. A [`task::BatchRunner`]
//! fans a whole batch of callables out onto workers, then collects their
//! values strictly in input order, surfacing the first failure it meets.
//!
//! ## Quick Start
//!
//! ```rust
//! use taskfan::task::{run_batch, task_fn, TaskFn};
//! use serde_json::{json, Value};
//!
//! # async fn example() -> taskfan::Result<()> {
//! // Two callables, each with its own positional arguments
//! let callables: Vec<TaskFn<Value>> = vec![
//!     task_fn(|args, _kwargs| Ok(json!(args[0].as_i64().unwrap_or(0) * 2))),
//!     task_fn(|args, _kwargs| Ok(json!(args[0].as_str().unwrap_or("").to_uppercase()))),
//! ];
//! let args = vec![vec![json!(21)], vec![json!("ready")]];
//!
//! // Both run concurrently; values come back in submission order
//! let values = run_batch(callables, Some(args), None).await?;
//! assert_eq!(values, vec![json!(42), json!("READY")]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Features
//!
//! - **One worker per callable**: every unit of work gets its own thread of
//!   execution, never a shared queue slot
//! - **Ordered collection**: batch results always match submission order, no
//!   matter which worker finishes first
//! - **Failure capture**: panics and explicit failures are caught on the
//!   worker and re-surfaced at collection time
//! - **Bounded concurrency**: an optional admission gate caps how many
//!   callables execute at once
//! - **Injected observability**: task lifecycle events go to a pluggable
//!   sink, with structured `tracing` output by default
//!
//! ## Modules
//!
//! - [`task`]: task handles, batch running, argument conventions
//! - [`observe`]: event sinks for task lifecycle diagnostics
//! - [`link`]: validated directed links between dataset records

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

use thiserror::Error;

/// Result type for taskfan operations
pub type Result<T> = std::result::Result<T, TaskfanError>;

/// Main error type for taskfan operations
#[derive(Error, Debug)]
pub enum TaskfanError {
    /// A failure captured from a callable, delivered unmodified at collection
    #[error(transparent)]
    Task(#[from] task::TaskFailure),

    /// A per-task argument vector did not match the callable count
    #[error("{argument} length mismatch: expected {expected} entries, got {actual}")]
    LengthMismatch {
        /// Which argument vector was wrong ("args" or "kwargs")
        argument: &'static str,
        /// Number of callables in the batch
        expected: usize,
        /// Length of the vector actually supplied
        actual: usize,
    },

    /// Task handle lifecycle misuse
    #[error("Task handle error: {0}")]
    Handle(#[from] task::HandleError),

    /// Link identifier validation error
    #[error("Validation error: {0}")]
    Validation(#[from] link::ValidationError),
}

/// Task handles and batch execution
pub mod task;

/// Observability sinks for task lifecycle events
pub mod observe;

/// Validated directed links between dataset records
pub mod link;
