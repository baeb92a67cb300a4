// src/exec/mod.rs

//! Task unit execution layer.
//!
//! Runs the units handed out by the scheduler on background Tokio tasks and
//! reports back to the runtime via `RuntimeEvent`s.
//!
//! - [`executor_loop`] owns the loop that starts and cancels units.
//! - [`task_runner`] runs one unit and converts errors/panics into failures.
//! - [`backend`] provides the `ExecutorBackend` trait and the
//!   `RealExecutorBackend` used in production; tests swap in fakes.

pub mod backend;
pub mod executor_loop;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::{spawn_executor, ExecCommand};
