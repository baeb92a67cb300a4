// src/pipeline/dispatch.rs

//! Single callback context for unit state changes.
//!
//! Every state change and every subscription goes through one mpsc channel
//! into one Tokio task. That gives subscribers a total order:
//! - a callback registered before a transition sees it live;
//! - a callback registered after a transition gets it as the replayed
//!   latest state;
//! - no callback ever sees the same transition twice.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::engine::UnitIndex;
use crate::errors::{Result, StagelineError};
use crate::types::{WorkState, WorkToken};

/// What a subscriber receives for each state change of a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitUpdate {
    /// Strictly increasing across all units of one pipeline. This is the
    /// ordering to rely on: `Finished(i)` always has a lower `seq` than
    /// `Running(i + 1)`.
    pub seq: u64,
    pub index: UnitIndex,
    pub name: String,
    pub token: WorkToken,
    pub state: WorkState,
    /// When the runtime published the transition. Only non-decreasing; two
    /// transitions published back to back may share an `Instant`.
    pub at: Instant,
}

/// Subscriber callback. Runs on the dispatcher task; keep it short and
/// spawn anything long-running.
pub type StateCallback = Box<dyn FnMut(&UnitUpdate) + Send + 'static>;

enum DispatchMessage {
    Transition {
        index: UnitIndex,
        state: WorkState,
        at: Instant,
    },
    Subscribe {
        index: UnitIndex,
        callback: StateCallback,
    },
}

/// Cloneable sender side of the dispatcher task.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<DispatchMessage>,
    unit_count: usize,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("unit_count", &self.unit_count)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Spawn the dispatcher task for the given `(name, token)` units.
    ///
    /// Every unit starts out `Enqueued`. The task exits once every
    /// `Dispatcher` clone has been dropped and all queued messages have been
    /// delivered.
    pub fn spawn(units: Vec<(String, WorkToken)>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let unit_count = units.len();
        let state = DispatchLoop::new(units);

        let handle = tokio::spawn(state.run(rx));

        (Self { tx, unit_count }, handle)
    }

    pub fn unit_count(&self) -> usize {
        self.unit_count
    }

    /// Queue a state change for delivery to the unit's subscribers.
    pub fn publish(&self, index: UnitIndex, state: WorkState) -> Result<()> {
        self.check_index(index)?;
        self.tx
            .send(DispatchMessage::Transition {
                index,
                state,
                at: Instant::now(),
            })
            .map_err(|_| StagelineError::ChannelClosed("state dispatcher".to_string()))
    }

    /// Register a callback for `index`.
    ///
    /// The callback is first invoked with the unit's latest state, then once
    /// per subsequent transition.
    pub fn subscribe<F>(&self, index: UnitIndex, callback: F) -> Result<()>
    where
        F: FnMut(&UnitUpdate) + Send + 'static,
    {
        self.check_index(index)?;
        self.tx
            .send(DispatchMessage::Subscribe {
                index,
                callback: Box::new(callback),
            })
            .map_err(|_| StagelineError::ChannelClosed("state dispatcher".to_string()))
    }

    fn check_index(&self, index: UnitIndex) -> Result<()> {
        if index < self.unit_count {
            Ok(())
        } else {
            Err(StagelineError::UnknownUnit(index))
        }
    }
}

struct DispatchLoop {
    latest: Vec<UnitUpdate>,
    subscribers: Vec<Vec<StateCallback>>,
    next_seq: u64,
}

impl DispatchLoop {
    fn new(units: Vec<(String, WorkToken)>) -> Self {
        let now = Instant::now();
        let latest: Vec<UnitUpdate> = units
            .into_iter()
            .enumerate()
            .map(|(index, (name, token))| UnitUpdate {
                seq: index as u64,
                index,
                name,
                token,
                state: WorkState::Enqueued,
                at: now,
            })
            .collect();
        let subscribers = latest.iter().map(|_| Vec::new()).collect();
        let next_seq = latest.len() as u64;

        Self {
            latest,
            subscribers,
            next_seq,
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<DispatchMessage>) {
        debug!(units = self.latest.len(), "state dispatcher started");

        while let Some(msg) = rx.recv().await {
            match msg {
                DispatchMessage::Transition { index, state, at } => {
                    self.deliver(index, state, at);
                }
                DispatchMessage::Subscribe {
                    index,
                    mut callback,
                } => {
                    let replay = self.latest[index].clone();
                    debug!(index, state = %replay.state, "replaying latest state to new subscriber");
                    invoke(&mut callback, &replay);
                    self.subscribers[index].push(callback);
                }
            }
        }

        debug!("state dispatcher finished (channel closed)");
    }

    fn deliver(&mut self, index: UnitIndex, state: WorkState, at: Instant) {
        let update = UnitUpdate {
            seq: self.next_seq,
            index,
            name: self.latest[index].name.clone(),
            token: self.latest[index].token.clone(),
            state,
            at,
        };
        self.next_seq += 1;

        debug!(
            unit = %update.name,
            index,
            seq = update.seq,
            state = %update.state,
            subscribers = self.subscribers[index].len(),
            "delivering unit state"
        );

        for callback in self.subscribers[index].iter_mut() {
            invoke(callback, &update);
        }
        self.latest[index] = update;
    }
}

fn invoke(callback: &mut StateCallback, update: &UnitUpdate) {
    if catch_unwind(AssertUnwindSafe(|| callback(update))).is_err() {
        warn!(
            unit = %update.name,
            index = update.index,
            "state subscriber panicked; continuing with remaining subscribers"
        );
    }
}
