// src/pipeline/unit_info.rs

//! Unit metadata, per-run state and scheduled unit types.

use std::sync::Arc;

use crate::config::model::Stage;
use crate::engine::UnitIndex;
use crate::pipeline::constraints::Constraints;
use crate::pipeline::task_unit::{SimulatedTask, TaskUnit};
use crate::types::{WorkState, WorkToken};

/// A unit as submitted to the pipeline: what to run, with which token, under
/// which preconditions.
#[derive(Debug, Clone)]
pub struct UnitSpec {
    pub name: String,
    pub token: WorkToken,
    pub unit: Arc<dyn TaskUnit>,
    pub constraints: Constraints,
}

impl UnitSpec {
    pub fn new(
        name: impl Into<String>,
        token: impl Into<WorkToken>,
        unit: impl TaskUnit + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            token: token.into(),
            unit: Arc::new(unit),
            constraints: Constraints::default(),
        }
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Build a [`SimulatedTask`] unit from a validated config stage.
    pub fn from_stage(stage: &Stage) -> Self {
        let unit = SimulatedTask::new(stage.duration).with_output(stage.output.clone());
        Self::new(stage.name.clone(), stage.token.clone(), unit).with_constraints(Constraints {
            require_network: stage.require_network,
        })
    }
}

/// Static unit information plus its state in the current run.
#[derive(Debug, Clone)]
pub struct UnitInfo {
    pub index: UnitIndex,
    pub name: String,
    pub token: WorkToken,
    pub unit: Arc<dyn TaskUnit>,
    pub state: WorkState,
}

impl UnitInfo {
    pub fn from_spec(index: UnitIndex, spec: UnitSpec) -> Self {
        Self {
            index,
            name: spec.name,
            token: spec.token,
            unit: spec.unit,
            state: WorkState::Enqueued,
        }
    }
}

/// A unit the scheduler wants the executor to run now.
#[derive(Debug, Clone)]
pub struct ScheduledUnit {
    pub index: UnitIndex,
    pub name: String,
    pub token: WorkToken,
    pub unit: Arc<dyn TaskUnit>,
}

impl ScheduledUnit {
    pub fn from_unit_info(info: &UnitInfo) -> Self {
        Self {
            index: info.index,
            name: info.name.clone(),
            token: info.token.clone(),
            unit: Arc::clone(&info.unit),
        }
    }
}
