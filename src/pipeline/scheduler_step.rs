// src/pipeline/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::engine::UnitIndex;
use crate::pipeline::unit_info::ScheduledUnit;
use crate::types::WorkState;

/// A single forward state change of one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitTransition {
    pub index: UnitIndex,
    pub state: WorkState,
}

/// Structured result of a single scheduler "step".
///
/// `transitions` are in the order they happened; a unit finishing and its
/// successor starting appear as `[Finished(i), Running(i + 1)]`.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    pub transitions: Vec<UnitTransition>,
    /// Unit that became ready to run as a result of this step.
    pub newly_scheduled: Option<ScheduledUnit>,
    /// Units that were marked failed without running because an earlier
    /// unit failed.
    pub newly_halted: Vec<UnitIndex>,
    /// Whether this step caused the run to finish.
    pub run_just_finished: bool,
}
