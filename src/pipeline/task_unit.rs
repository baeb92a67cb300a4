// src/pipeline/task_unit.rs

//! Units of work executed by the pipeline.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::Result;
use tracing::debug;

use crate::types::{TaskResult, WorkToken};

/// Boxed future returned by [`TaskUnit::perform`].
pub type UnitFuture<'a> = Pin<Box<dyn Future<Output = Result<TaskResult>> + Send + 'a>>;

/// A single unit of work.
///
/// Implementations should not touch shared pipeline state; the executor runs
/// each unit on its own background task. Returning `Err` (or panicking) is
/// reported to the scheduler as `Finished(Failure)`.
pub trait TaskUnit: Send + Sync + fmt::Debug {
    fn perform(&self, input: WorkToken) -> UnitFuture<'_>;
}

/// Reference task unit: waits for a fixed duration and succeeds.
///
/// The output token is built from `output_template` by replacing `{token}`
/// with the input token.
#[derive(Debug, Clone)]
pub struct SimulatedTask {
    duration: Duration,
    output_template: String,
}

impl SimulatedTask {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            output_template: "{token}".to_string(),
        }
    }

    pub fn with_output(mut self, template: impl Into<String>) -> Self {
        self.output_template = template.into();
        self
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Output token for a given input.
    pub fn derive_output(&self, input: &WorkToken) -> WorkToken {
        WorkToken::new(self.output_template.replace("{token}", input.as_str()))
    }
}

impl TaskUnit for SimulatedTask {
    fn perform(&self, input: WorkToken) -> UnitFuture<'_> {
        Box::pin(async move {
            debug!(token = %input, duration = ?self.duration, "simulated task started");
            tokio::time::sleep(self.duration).await;
            let output = self.derive_output(&input);
            debug!(token = %input, output = %output, "simulated task finished");
            Ok(TaskResult::success(output))
        })
    }
}
