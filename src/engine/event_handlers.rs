// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::info;

use crate::engine::UnitIndex;
use crate::pipeline::{ScheduledUnit, Scheduler, SchedulerStep, UnitTransition};
use crate::types::TaskResult;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Push these state changes to subscribers, in order.
    PublishTransitions(Vec<UnitTransition>),
    /// Hand this unit to the executor.
    DispatchUnit(ScheduledUnit),
    /// Abort whatever unit is executing; no completion will be reported.
    CancelRunning,
    /// Every unit is terminal; the runtime can stop.
    RequestExit,
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

/// Start the run: schedule the first unit.
pub fn handle_start(scheduler: &mut Scheduler) -> CoreStep {
    let step = scheduler.start();
    core_step_from(step)
}

/// Handle completion of the running unit.
pub fn handle_unit_completion(
    scheduler: &mut Scheduler,
    index: UnitIndex,
    result: TaskResult,
) -> CoreStep {
    let step = scheduler.handle_completion(index, result);
    core_step_from(step)
}

/// Handle owner teardown.
///
/// Units keep whatever state they had; the running one is aborted without a
/// `Finished` transition.
pub fn handle_shutdown(scheduler: &Scheduler) -> CoreStep {
    let mut commands = Vec::new();

    if let Some(running) = scheduler.running() {
        info!(index = running, "shutdown requested; cancelling running unit");
        commands.push(CoreCommand::CancelRunning);
    } else {
        info!("shutdown requested; no unit running");
    }

    CoreStep {
        commands,
        keep_running: false,
    }
}

/// Translate a scheduler step into IO commands.
///
/// Transitions are always published before the next unit is dispatched so
/// that `Finished(i)` reaches subscribers ahead of `Running(i + 1)`.
fn core_step_from(step: SchedulerStep) -> CoreStep {
    let mut commands = Vec::new();

    if !step.transitions.is_empty() {
        commands.push(CoreCommand::PublishTransitions(step.transitions));
    }

    if let Some(unit) = step.newly_scheduled {
        commands.push(CoreCommand::DispatchUnit(unit));
    }

    let keep_running = !step.run_just_finished;
    if step.run_just_finished {
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}
