// src/pipeline/mod.rs

//! Sequential pipeline representation and scheduling.
//!
//! - [`task_unit`] defines the `TaskUnit` trait and the simulated unit.
//! - [`constraints`] holds admission preconditions and connectivity probes.
//! - [`unit_info`] provides unit metadata and scheduled unit types.
//! - [`scheduler`] contains the per-run state machine that decides which
//!   unit runs next and halts the chain on failure.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`dispatch`] is the single callback context for unit states.
//! - [`handle`] wires everything up behind `Pipeline::submit`.

pub mod constraints;
pub mod dispatch;
pub mod handle;
pub mod scheduler;
pub mod scheduler_step;
pub mod task_unit;
pub mod unit_info;

pub use constraints::{check_admission, ConnectivityProbe, Constraints, FixedConnectivity, TcpProbe};
pub use dispatch::{Dispatcher, StateCallback, UnitUpdate};
pub use handle::{Pipeline, PipelineHandle, PipelineReport, UnitReport};
pub use scheduler::Scheduler;
pub use scheduler_step::{SchedulerStep, UnitTransition};
pub use task_unit::{SimulatedTask, TaskUnit, UnitFuture};
pub use unit_info::{ScheduledUnit, UnitInfo, UnitSpec};
