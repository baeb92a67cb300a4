// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::pipeline::{Dispatcher, ScheduledUnit, UnitTransition};

use super::core::CoreRuntime;
use super::{CoreCommand, RunSummary, RuntimeEvent};

/// Drives the scheduler in response to `RuntimeEvent`s, delegates unit
/// execution to an `ExecutorBackend` and publishes every state change to the
/// [`Dispatcher`].
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    dispatcher: Dispatcher,
    cancel: CancellationToken,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
        dispatcher: Dispatcher,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            core,
            event_rx,
            executor,
            dispatcher,
            cancel,
        }
    }

    /// Main event loop.
    ///
    /// - Starts the first unit.
    /// - Consumes `RuntimeEvent`s from `event_rx`, or a cancellation of the
    ///   owner token.
    /// - Feeds them into the core runtime and executes the returned commands.
    pub async fn run(mut self) -> Result<RunSummary> {
        info!("stageline runtime started");

        let step = self.core.start();
        let mut keep_running = step.keep_running;
        for command in step.commands {
            self.execute_command(command).await?;
        }

        while keep_running {
            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => RuntimeEvent::ShutdownRequested,
                event = self.event_rx.recv() => match event {
                    Some(e) => e,
                    None => {
                        info!("runtime event channel closed; exiting");
                        break;
                    }
                },
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);
            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                keep_running = false;
            }
        }

        info!("runtime exiting");
        Ok(self.core.summary())
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::PublishTransitions(transitions) => self.publish(transitions)?,
            CoreCommand::DispatchUnit(unit) => self.spawn_unit(unit).await?,
            CoreCommand::CancelRunning => self.executor.cancel_running().await?,
            CoreCommand::RequestExit => {
                info!("all units finished");
            }
        }
        Ok(())
    }

    fn publish(&self, transitions: Vec<UnitTransition>) -> Result<()> {
        for t in transitions {
            debug!(index = t.index, state = %t.state, "publishing unit state");
            self.dispatcher.publish(t.index, t.state)?;
        }
        Ok(())
    }

    async fn spawn_unit(&mut self, unit: ScheduledUnit) -> Result<()> {
        debug!(unit = %unit.name, index = unit.index, "dispatching unit to executor");
        self.executor.spawn_unit(unit).await
    }
}
