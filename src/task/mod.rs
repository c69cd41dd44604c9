//! Task execution primitives for taskfan
//!
//! This module provides the task handle, which runs one callable on its own
//! worker, and the batch runner, which fans many callables out and collects
//! their values in input order. It also defines the argument conventions
//! shared by both.

use std::collections::HashMap;

use serde_json::Value;

pub mod batch;
pub mod handle;

pub use batch::{run_batch, BatchRunner};
pub use handle::{HandleError, TaskFailure, TaskHandle};

/// Positional arguments handed to a callable.
pub type Args = Vec<Value>;

/// Keyword arguments handed to a callable.
pub type Kwargs = HashMap<String, Value>;

/// A unit of work: consumes its arguments once and produces either a value
/// or a [`TaskFailure`].
pub type TaskFn<T> = Box<dyn FnOnce(Args, Kwargs) -> std::result::Result<T, TaskFailure> + Send + 'static>;

/// Box a closure as a [`TaskFn`].
pub fn task_fn<T, F>(f: F) -> TaskFn<T>
where
    F: FnOnce(Args, Kwargs) -> std::result::Result<T, TaskFailure> + Send + 'static,
{
    Box::new(f)
}
