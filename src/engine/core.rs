// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending `ScheduledUnit`s to the executor
//! - publishing unit states to the dispatcher
//! - reacting to owner cancellation

use crate::engine::event_handlers::{
    handle_shutdown, handle_start, handle_unit_completion, CoreStep,
};
use crate::engine::{RunSummary, RuntimeEvent};
use crate::pipeline::Scheduler;

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    cancelled: bool,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            cancelled: false,
        }
    }

    /// Expose the scheduler (for tests and diagnostics).
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Kick off the run.
    pub fn start(&mut self) -> CoreStep {
        handle_start(&mut self.scheduler)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::UnitCompleted { index, result } => {
                handle_unit_completion(&mut self.scheduler, index, result)
            }
            RuntimeEvent::ShutdownRequested => {
                self.cancelled = !self.scheduler.is_finished();
                handle_shutdown(&self.scheduler)
            }
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            states: self.scheduler.units().map(|u| u.state.clone()).collect(),
            cancelled: self.cancelled,
        }
    }
}
