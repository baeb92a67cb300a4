// src/pipeline/handle.rs

//! Pipeline submission and the handle returned to callers.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::ConfigFile;
use crate::engine::{CoreRuntime, RunSummary, Runtime, RuntimeEvent, UnitIndex};
use crate::errors::{Error, Result};
use crate::exec::{ExecutorBackend, RealExecutorBackend};
use crate::pipeline::constraints::{check_admission, ConnectivityProbe};
use crate::pipeline::dispatch::{Dispatcher, UnitUpdate};
use crate::pipeline::scheduler::Scheduler;
use crate::pipeline::unit_info::UnitSpec;
use crate::types::{WorkState, WorkToken};

/// An ordered list of units waiting to be submitted.
#[derive(Debug, Default)]
pub struct Pipeline {
    units: Vec<UnitSpec>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a unit; units run in the order they were added.
    pub fn unit(mut self, spec: UnitSpec) -> Self {
        self.units.push(spec);
        self
    }

    /// One simulated unit per configured stage.
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            units: cfg.stages.iter().map(UnitSpec::from_stage).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Submit with the production executor.
    pub async fn submit(self, probe: &dyn ConnectivityProbe) -> Result<PipelineHandle> {
        self.submit_with(probe, RealExecutorBackend::new).await
    }

    /// Submit with a custom executor backend.
    ///
    /// Preconditions are evaluated once, here. If they are unmet this
    /// returns `PreconditionUnmet` and nothing is started.
    pub async fn submit_with<E, F>(
        self,
        probe: &dyn ConnectivityProbe,
        make_executor: F,
    ) -> Result<PipelineHandle>
    where
        E: ExecutorBackend + 'static,
        F: FnOnce(mpsc::Sender<RuntimeEvent>) -> E,
    {
        check_admission(&self.units, probe).await?;

        let labels: Vec<(String, WorkToken)> = self
            .units
            .iter()
            .map(|u| (u.name.clone(), u.token.clone()))
            .collect();

        let (dispatcher, dispatcher_task) = Dispatcher::spawn(labels.clone());
        let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
        let executor = make_executor(rt_tx);
        let cancel = CancellationToken::new();

        let core = CoreRuntime::new(Scheduler::new(self.units));
        let runtime = Runtime::new(core, rt_rx, executor, dispatcher.clone(), cancel.clone());

        info!(units = labels.len(), "pipeline submitted");
        let runtime_task = tokio::spawn(runtime.run());

        Ok(PipelineHandle {
            dispatcher,
            cancel,
            runtime_task,
            dispatcher_task,
            labels,
        })
    }
}

/// Handle to a submitted pipeline.
#[derive(Debug)]
pub struct PipelineHandle {
    dispatcher: Dispatcher,
    cancel: CancellationToken,
    runtime_task: JoinHandle<Result<RunSummary>>,
    dispatcher_task: JoinHandle<()>,
    labels: Vec<(String, WorkToken)>,
}

impl PipelineHandle {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Observe the state of one unit.
    ///
    /// The callback runs on the pipeline's dispatcher task: once right away
    /// with the latest state, then once per transition. It must not hold a
    /// clone of this handle's dispatcher, or [`join`](Self::join) never
    /// returns.
    pub fn subscribe<F>(&self, index: UnitIndex, callback: F) -> Result<()>
    where
        F: FnMut(&UnitUpdate) + Send + 'static,
    {
        self.dispatcher.subscribe(index, callback)
    }

    /// Owner token for the run. Cancelling it aborts the running unit; no
    /// further unit starts.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the run to end and for every queued state callback to be
    /// delivered.
    pub async fn join(self) -> Result<PipelineReport> {
        let PipelineHandle {
            dispatcher,
            runtime_task,
            dispatcher_task,
            labels,
            ..
        } = self;

        let summary = runtime_task.await.map_err(Error::from)??;

        drop(dispatcher);
        dispatcher_task.await.map_err(Error::from)?;

        Ok(PipelineReport::new(labels, summary))
    }
}

/// Final state of one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub name: String,
    pub token: WorkToken,
    pub state: WorkState,
}

/// Outcome of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub units: Vec<UnitReport>,
    pub cancelled: bool,
}

impl PipelineReport {
    fn new(labels: Vec<(String, WorkToken)>, summary: RunSummary) -> Self {
        let units = labels
            .into_iter()
            .zip(summary.states)
            .map(|((name, token), state)| UnitReport { name, token, state })
            .collect();

        Self {
            units,
            cancelled: summary.cancelled,
        }
    }

    /// Every unit finished successfully.
    pub fn succeeded(&self) -> bool {
        !self.cancelled && self.units.iter().all(|u| u.state.is_success())
    }

    /// The unit that stopped the chain, if any.
    pub fn first_failure(&self) -> Option<&UnitReport> {
        self.units
            .iter()
            .find(|u| u.state.is_finished() && !u.state.is_success())
    }
}
