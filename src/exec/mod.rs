// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`backend`] defines the `TaskExecutor` trait the orchestrator talks to,
//!   plus a closure adapter.
//! - [`dispatcher`] fans one wave out to the executor with bounded
//!   concurrency and per-task timeouts.
//! - [`command`] is the production executor: one shell command per agent
//!   type, run with `tokio::process::Command`.

pub mod backend;
pub mod command;
pub mod dispatcher;

pub use backend::{ExecFuture, ExecutorError, FnExecutor, TaskExecutor, TaskOutput, executor_fn};
pub use command::CommandExecutor;
pub use dispatcher::{Dispatcher, WaveDispatch};
