// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of a raw mpsc sender.
//! This makes it easy to swap in a fake executor in tests while keeping the
//! production executor loop in [`executor_loop`](super::executor_loop).

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::engine::RuntimeEvent;
use crate::errors::{Result, StagelineError};
use crate::pipeline::ScheduledUnit;

use super::executor_loop::{spawn_executor, ExecCommand};

/// Trait abstracting how scheduled units are executed.
///
/// Implementations report back through `RuntimeEvent::UnitCompleted`.
pub trait ExecutorBackend: Send {
    /// Start running `unit` in the background.
    fn spawn_unit(
        &mut self,
        unit: ScheduledUnit,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Abort the unit currently executing, if any. An aborted unit must not
    /// report a completion.
    fn cancel_running(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Real executor backend used in production.
///
/// Forwards commands to the background loop started by [`spawn_executor`].
pub struct RealExecutorBackend {
    tx: mpsc::Sender<ExecCommand>,
}

impl RealExecutorBackend {
    /// Create a new executor backend wired to the given runtime event sender.
    ///
    /// This spawns the background executor loop immediately.
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        let tx = spawn_executor(runtime_tx);
        Self { tx }
    }

    fn send(&self, cmd: ExecCommand) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            tx.send(cmd)
                .await
                .map_err(|_| StagelineError::ChannelClosed("executor loop".to_string()))
        })
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_unit(
        &mut self,
        unit: ScheduledUnit,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.send(ExecCommand::Run(unit))
    }

    fn cancel_running(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.send(ExecCommand::CancelActive)
    }
}
