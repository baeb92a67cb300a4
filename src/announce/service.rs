// src/announce/service.rs

//! Owner of the countdowns launched on one channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::bus::CompletionBus;
use crate::types::{PriorityHint, WorkToken};

use super::channel::ChannelSpec;
use super::countdown::Announcer;
use super::notifier::Notifier;
use super::state::AnnounceOutcome;

/// At most one foreground lease can be out at a time.
#[derive(Debug, Clone, Default)]
pub struct ForegroundSlot {
    held: Arc<AtomicBool>,
}

impl ForegroundSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the slot, or `None` if someone else holds it.
    pub fn try_acquire(&self) -> Option<ForegroundLease> {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ForegroundLease {
                held: Arc::clone(&self.held),
            })
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

/// Proof of holding the foreground slot. Released on drop.
#[derive(Debug)]
pub struct ForegroundLease {
    held: Arc<AtomicBool>,
}

impl Drop for ForegroundLease {
    fn drop(&mut self) {
        self.held.store(false, Ordering::Release);
    }
}

/// Launches countdowns for one channel and tracks them until they end.
///
/// Cloning is cheap; every clone shares the same tracker, owner token and
/// foreground slot.
#[derive(Debug, Clone)]
pub struct AnnouncerService {
    inner: Arc<ServiceInner>,
}

#[derive(Debug)]
struct ServiceInner {
    announcer: Announcer,
    channel: Arc<ChannelSpec>,
    tracker: TaskTracker,
    cancel: CancellationToken,
    slot: ForegroundSlot,
}

impl AnnouncerService {
    /// `cancel` is the lifecycle owner: cancelling it stops every in-flight
    /// countdown at its next tick wait.
    pub fn new(
        channel: ChannelSpec,
        notifier: Arc<dyn Notifier>,
        bus: CompletionBus,
        cancel: CancellationToken,
    ) -> Self {
        let channel = Arc::new(channel);
        let announcer = Announcer::new(Arc::clone(&channel), notifier, bus);

        Self {
            inner: Arc::new(ServiceInner {
                announcer,
                channel,
                tracker: TaskTracker::new(),
                cancel,
                slot: ForegroundSlot::new(),
            }),
        }
    }

    pub fn channel(&self) -> &ChannelSpec {
        &self.inner.channel
    }

    pub fn priority_for(&self, token: &WorkToken) -> PriorityHint {
        self.inner.channel.priority_for(token)
    }

    pub fn foreground_held(&self) -> bool {
        self.inner.slot.is_held()
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    /// Start a countdown for `token` in the background.
    ///
    /// Fire-and-forget: the returned handle may be dropped, the service keeps
    /// tracking the task. A `Foreground` request while the slot is taken runs
    /// as `Background`.
    pub fn launch(&self, token: WorkToken, priority: PriorityHint) -> JoinHandle<AnnounceOutcome> {
        let lease = match priority {
            PriorityHint::Foreground => {
                let lease = self.inner.slot.try_acquire();
                if lease.is_none() {
                    warn!(
                        channel = %self.inner.channel.name,
                        token = %token,
                        "foreground slot already held; running in background"
                    );
                }
                lease
            }
            PriorityHint::Background => None,
        };

        debug!(
            channel = %self.inner.channel.name,
            token = %token,
            ?priority,
            "launching announcer"
        );

        let inner = Arc::clone(&self.inner);
        self.inner.tracker.spawn(async move {
            inner.announcer.run(token, lease, &inner.cancel).await
        })
    }

    /// Cancel every in-flight countdown.
    pub fn shutdown(&self) {
        info!(channel = %self.inner.channel.name, "shutting down announcer service");
        self.inner.cancel.cancel();
    }

    /// Wait until every countdown launched so far has ended.
    pub async fn wait_idle(&self) {
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        self.inner.tracker.reopen();
    }

    /// Number of countdowns still running.
    pub fn in_flight(&self) -> usize {
        self.inner.tracker.len()
    }
}
