use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use stageline::engine::RuntimeEvent;
use stageline::errors::Result;
use stageline::exec::ExecutorBackend;
use stageline::pipeline::ScheduledUnit;
use stageline::types::{TaskResult, WorkToken};

/// A fake executor that:
/// - records which units were "run", in order
/// - immediately reports `UnitCompleted` for each scheduled unit: failure for
///   tokens in the failing set, success (output = input token) otherwise.
pub struct FakeExecutor {
    runtime_tx: tokio::sync::mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    failing: BTreeSet<WorkToken>,
    cancels: Arc<Mutex<usize>>,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: tokio::sync::mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: BTreeSet::new(),
            cancels: Arc::new(Mutex::new(0)),
        }
    }

    /// Units with this token report `Failure`.
    pub fn failing(mut self, token: impl Into<WorkToken>) -> Self {
        self.failing.insert(token.into());
        self
    }

    /// Share a counter incremented on every `cancel_running`.
    pub fn count_cancels(mut self, cancels: Arc<Mutex<usize>>) -> Self {
        self.cancels = cancels;
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_unit(
        &mut self,
        unit: ScheduledUnit,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let fails = self.failing.contains(&unit.token);

        Box::pin(async move {
            executed.lock().unwrap().push(unit.name.clone());

            let result = if fails {
                TaskResult::failure()
            } else {
                TaskResult::success(unit.token.clone())
            };

            tx.send(RuntimeEvent::UnitCompleted {
                index: unit.index,
                result,
            })
            .await
            .map_err(anyhow::Error::from)?;
            Ok(())
        })
    }

    fn cancel_running(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let cancels = Arc::clone(&self.cancels);
        Box::pin(async move {
            *cancels.lock().unwrap() += 1;
            Ok(())
        })
    }
}
