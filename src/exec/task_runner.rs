// src/exec/task_runner.rs

//! Individual task unit runner.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::engine::RuntimeEvent;
use crate::pipeline::ScheduledUnit;
use crate::types::TaskResult;

/// Run a single unit and emit `UnitCompleted` with its result.
///
/// - The unit body runs on its own Tokio task, so a panic inside it is
///   reported as a failure instead of taking down the runner.
/// - An `Err` from the unit is reported as a failure.
/// - If the cancel channel fires (or its sender is dropped) the unit is
///   aborted and **no** `UnitCompleted` event is sent.
pub async fn run_unit(
    unit: ScheduledUnit,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    info!(
        unit = %unit.name,
        index = unit.index,
        token = %unit.token,
        "starting task unit"
    );

    let work = {
        let body = Arc::clone(&unit.unit);
        let token = unit.token.clone();
        tokio::spawn(async move { body.perform(token).await })
    };
    let abort = work.abort_handle();

    tokio::select! {
        joined = work => {
            let result = match joined {
                Ok(Ok(result)) if result.is_success() => result,
                Ok(Ok(_)) => TaskResult::failure(),
                Ok(Err(err)) => {
                    warn!(
                        unit = %unit.name,
                        index = unit.index,
                        error = %err,
                        "task unit returned an error"
                    );
                    TaskResult::failure()
                }
                Err(err) => {
                    error!(
                        unit = %unit.name,
                        index = unit.index,
                        error = %err,
                        "task unit panicked or was aborted"
                    );
                    TaskResult::failure()
                }
            };

            info!(
                unit = %unit.name,
                index = unit.index,
                success = result.is_success(),
                output = ?result.output_token,
                "task unit finished"
            );

            if runtime_tx
                .send(RuntimeEvent::UnitCompleted { index: unit.index, result })
                .await
                .is_err()
            {
                debug!(
                    unit = %unit.name,
                    index = unit.index,
                    "runtime gone; dropping completion"
                );
            }
        }

        cancel = &mut cancel_rx => {
            match cancel {
                Ok(()) => info!(
                    unit = %unit.name,
                    index = unit.index,
                    "cancellation requested; aborting task unit"
                ),
                Err(_) => debug!(
                    unit = %unit.name,
                    index = unit.index,
                    "cancel channel closed; aborting task unit"
                ),
            }
            abort.abort();
            // Do NOT send UnitCompleted for an aborted unit.
        }
    }
}
