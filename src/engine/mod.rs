// src/engine/mod.rs

//! Orchestration engine for stageline.
//!
//! This module ties together:
//! - the sequential scheduler
//! - the executor backend that runs task units
//! - the state dispatcher that pushes unit states to subscribers
//! - the main runtime event loop that reacts to:
//!   - unit completion events
//!   - shutdown (owner cancellation)
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use crate::types::{TaskResult, WorkState};

/// Position of a unit in its pipeline.
pub type UnitIndex = usize;

/// Events flowing into the runtime from the executor and the owner.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A unit finished running with a concrete result.
    UnitCompleted {
        index: UnitIndex,
        result: TaskResult,
    },
    /// The pipeline's owner was torn down.
    ShutdownRequested,
}

/// Final per-unit states of a run, as seen by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub states: Vec<WorkState>,
    /// The run was cancelled before every unit finished.
    pub cancelled: bool,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::Runtime;
