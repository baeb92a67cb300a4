// src/types.rs

//! Core value types shared by the pipeline, the announcers and the bus.

use std::fmt;

use serde::Deserialize;

/// Opaque identifier threaded through the pipeline to correlate a task with
/// its notifications (e.g. `"001"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct WorkToken(String);

impl WorkToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for WorkToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Whether a task unit succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Success,
    Failure,
}

/// Result produced by a task unit when it finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub status: TaskStatus,
    /// Output token derived from the input. Always `None` for failures.
    pub output_token: Option<WorkToken>,
}

impl TaskResult {
    pub fn success(output_token: WorkToken) -> Self {
        Self {
            status: TaskStatus::Success,
            output_token: Some(output_token),
        }
    }

    pub fn failure() -> Self {
        Self {
            status: TaskStatus::Failure,
            output_token: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success
    }
}

/// Per-unit state inside a pipeline run.
///
/// Transitions only ever move forward: `Enqueued -> Running -> Finished`.
/// Units behind a failed unit go straight from `Enqueued` to
/// `Finished(Failure)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkState {
    Enqueued,
    Running,
    Finished(TaskResult),
}

impl WorkState {
    pub fn is_finished(&self) -> bool {
        matches!(self, WorkState::Finished(_))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WorkState::Finished(r) if r.is_success())
    }

    /// Position in the forward-only ordering of states.
    pub fn rank(&self) -> u8 {
        match self {
            WorkState::Enqueued => 0,
            WorkState::Running => 1,
            WorkState::Finished(_) => 2,
        }
    }

    /// Whether moving from `self` to `next` is a legal forward transition.
    pub fn can_advance_to(&self, next: &WorkState) -> bool {
        next.rank() > self.rank()
    }
}

impl fmt::Display for WorkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkState::Enqueued => write!(f, "ENQUEUED"),
            WorkState::Running => write!(f, "RUNNING"),
            WorkState::Finished(r) if r.is_success() => write!(f, "SUCCEEDED"),
            WorkState::Finished(_) => write!(f, "FAILED"),
        }
    }
}

/// Notification identity. A later notification with the same id replaces an
/// earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct NotifId(pub u32);

impl fmt::Display for NotifId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Execution priority requested for an announcer run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityHint {
    /// Sustained elevated priority for the duration of the countdown.
    Foreground,
    /// Ordinary background emission.
    Background,
}
