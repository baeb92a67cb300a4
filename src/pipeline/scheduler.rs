// src/pipeline/scheduler.rs

use tracing::{debug, info, warn};

use crate::engine::UnitIndex;
use crate::pipeline::scheduler_step::{SchedulerStep, UnitTransition};
use crate::pipeline::unit_info::{ScheduledUnit, UnitInfo, UnitSpec};
use crate::types::{TaskResult, WorkState};

/// Scheduler holds the ordered units plus their per-run state.
///
/// It is responsible for:
/// - starting the first unit
/// - starting unit `i + 1` only once unit `i` finished successfully
/// - halting every remaining unit once a unit fails (fail-fast)
/// - keeping every state transition forward-only
///
/// It performs no IO; the engine feeds it completions and executes the
/// resulting [`SchedulerStep`]s.
#[derive(Debug)]
pub struct Scheduler {
    units: Vec<UnitInfo>,
    started: bool,
    finished: bool,
}

impl Scheduler {
    pub fn new(specs: Vec<UnitSpec>) -> Self {
        let units = specs
            .into_iter()
            .enumerate()
            .map(|(index, spec)| UnitInfo::from_spec(index, spec))
            .collect();

        Self {
            units,
            started: false,
            finished: false,
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Returns `true` once every unit has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Index of the unit currently running, if any.
    pub fn running(&self) -> Option<UnitIndex> {
        self.units
            .iter()
            .find(|u| u.state == WorkState::Running)
            .map(|u| u.index)
    }

    pub fn state_of(&self, index: UnitIndex) -> Option<&WorkState> {
        self.units.get(index).map(|u| &u.state)
    }

    pub fn unit(&self, index: UnitIndex) -> Option<&UnitInfo> {
        self.units.get(index)
    }

    pub fn units(&self) -> impl Iterator<Item = &UnitInfo> {
        self.units.iter()
    }

    /// Start the run by scheduling the first unit.
    pub fn start(&mut self) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        if self.started {
            warn!("scheduler: start called twice; ignoring");
            return step;
        }
        self.started = true;

        if self.units.is_empty() {
            info!("scheduler: no units submitted; run finished immediately");
            step.run_just_finished = self.maybe_finish_run();
            return step;
        }

        self.schedule(0, &mut step);
        step
    }

    /// Handle completion of the running unit.
    ///
    /// Completions for units that are not currently `Running` (unknown
    /// index, stale or duplicate reports) are ignored.
    pub fn handle_completion(&mut self, index: UnitIndex, result: TaskResult) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        let Some(info) = self.units.get(index) else {
            warn!(index, "completion for unknown unit; ignoring");
            return step;
        };

        if info.state != WorkState::Running {
            warn!(
                unit = %info.name,
                index,
                state = %info.state,
                "completion for unit that is not running; ignoring"
            );
            return step;
        }

        let success = result.is_success();
        if let Some(t) = self.set_state(index, WorkState::Finished(result)) {
            step.transitions.push(t);
        }

        if success {
            debug!(index, "unit completed successfully");
            if index + 1 < self.units.len() {
                self.schedule(index + 1, &mut step);
            }
        } else {
            warn!(index, "unit failed; halting the remaining units in this run");
            self.halt_after(index, &mut step);
        }

        step.run_just_finished = self.maybe_finish_run();
        step
    }

    /// Mark `index` as `Running` and hand it to the executor.
    fn schedule(&mut self, index: UnitIndex, step: &mut SchedulerStep) {
        if let Some(running) = self.running() {
            warn!(
                index,
                running,
                "refusing to schedule a unit while another one is running"
            );
            return;
        }

        if let Some(t) = self.set_state(index, WorkState::Running) {
            step.transitions.push(t);
            let info = &self.units[index];
            info!(unit = %info.name, index, token = %info.token, "scheduling unit");
            step.newly_scheduled = Some(ScheduledUnit::from_unit_info(info));
        }
    }

    /// Fail every still-enqueued unit after `failed`.
    fn halt_after(&mut self, failed: UnitIndex, step: &mut SchedulerStep) {
        for index in failed + 1..self.units.len() {
            if self.units[index].state != WorkState::Enqueued {
                continue;
            }
            if let Some(t) = self.set_state(index, WorkState::Finished(TaskResult::failure())) {
                debug!(
                    unit = %self.units[index].name,
                    index,
                    "marking unit failed due to upstream failure"
                );
                step.transitions.push(t);
                step.newly_halted.push(index);
            }
        }
    }

    /// Apply a forward-only transition. Regressions are rejected.
    fn set_state(&mut self, index: UnitIndex, next: WorkState) -> Option<UnitTransition> {
        let info = self.units.get_mut(index)?;

        if !info.state.can_advance_to(&next) {
            warn!(
                unit = %info.name,
                index,
                from = %info.state,
                to = %next,
                "rejecting non-forward state transition"
            );
            return None;
        }

        info.state = next.clone();
        Some(UnitTransition { index, state: next })
    }

    /// Returns `true` if this call transitioned the run to finished.
    fn maybe_finish_run(&mut self) -> bool {
        if self.finished {
            return false;
        }

        if self.units.iter().all(|u| u.state.is_finished()) {
            info!(units = self.units.len(), "scheduler: all units finished");
            self.finished = true;
            true
        } else {
            false
        }
    }
}
