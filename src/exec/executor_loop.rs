// src/exec/executor_loop.rs

//! Main executor loop that manages the running task unit.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::engine::{RuntimeEvent, UnitIndex};
use crate::exec::task_runner::run_unit;
use crate::pipeline::ScheduledUnit;

/// Command accepted by the executor loop.
#[derive(Debug)]
pub enum ExecCommand {
    Run(ScheduledUnit),
    CancelActive,
}

/// Internal handle for the unit currently executing.
///
/// - `cancel` is used to abort the unit (owner teardown).
/// - `handle` is the Tokio task driving [`run_unit`].
struct ActiveUnit {
    index: UnitIndex,
    cancel: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

/// Spawn the background executor loop.
///
/// Each scheduled unit runs in its own Tokio task. The scheduler only
/// dispatches a unit after its predecessor reported completion, so there is
/// at most one unit executing at a time. When the command channel closes the
/// active unit, if any, is cancelled.
pub fn spawn_executor(runtime_tx: mpsc::Sender<RuntimeEvent>) -> mpsc::Sender<ExecCommand> {
    let (tx, mut rx) = mpsc::channel::<ExecCommand>(8);

    tokio::spawn(async move {
        info!("executor loop started");

        let mut active: Option<ActiveUnit> = None;

        while let Some(cmd) = rx.recv().await {
            match cmd {
                ExecCommand::Run(unit) => {
                    handle_scheduled_unit(unit, &mut active, &runtime_tx);
                }
                ExecCommand::CancelActive => cancel_active(&mut active),
            }
        }

        cancel_active(&mut active);
        info!("executor loop finished (channel closed)");
    });

    tx
}

/// Start a newly scheduled unit.
fn handle_scheduled_unit(
    unit: ScheduledUnit,
    active: &mut Option<ActiveUnit>,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) {
    if let Some(previous) = active.as_ref() {
        if !previous.handle.is_finished() {
            // The previous runner already reported completion (that is what
            // got this unit scheduled); it is only winding down.
            debug!(
                previous = previous.index,
                next = unit.index,
                "previous unit runner still winding down"
            );
        }
    }

    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    let rt_tx = runtime_tx.clone();
    let index = unit.index;
    let name = unit.name.clone();

    let handle = tokio::spawn(async move {
        run_unit(unit, rt_tx, cancel_rx).await;
        debug!(unit = %name, index, "unit runner future finished");
    });

    *active = Some(ActiveUnit {
        index,
        cancel: Some(cancel_tx),
        handle,
    });
}

/// Cancel the active unit, if it is still executing.
fn cancel_active(active: &mut Option<ActiveUnit>) {
    let Some(mut unit) = active.take() else {
        debug!("cancel requested with no active unit");
        return;
    };

    if unit.handle.is_finished() {
        debug!(index = unit.index, "active unit already finished; nothing to cancel");
        return;
    }

    info!(index = unit.index, "cancelling active unit");

    if let Some(cancel) = unit.cancel.take() {
        if cancel.send(()).is_err() {
            debug!(
                index = unit.index,
                "unit finished while cancelling"
            );
        }
    }
}
