// src/announce/countdown.rs

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::bus::CompletionBus;
use crate::types::WorkToken;

use super::channel::ChannelSpec;
use super::notifier::{Notification, Notifier};
use super::service::ForegroundLease;
use super::state::{AnnounceOutcome, AnnouncerState};

/// Runs one countdown for one token.
#[derive(Debug, Clone)]
pub struct Announcer {
    channel: Arc<ChannelSpec>,
    notifier: Arc<dyn Notifier>,
    bus: CompletionBus,
}

impl Announcer {
    pub fn new(channel: Arc<ChannelSpec>, notifier: Arc<dyn Notifier>, bus: CompletionBus) -> Self {
        Self {
            channel,
            notifier,
            bus,
        }
    }

    /// Drive the state machine until `Notified` or until `cancel` fires.
    ///
    /// Cancellation is observed before each state and during every tick
    /// wait. A cancelled run emits nothing further and never writes the bus.
    /// The foreground `lease`, if any, is released on entering `Completed`
    /// or when the run is cancelled.
    pub async fn run(
        &self,
        token: WorkToken,
        mut lease: Option<ForegroundLease>,
        cancel: &CancellationToken,
    ) -> AnnounceOutcome {
        let channel = self.channel.name.as_str();
        let id = self.channel.notif_ids.derive(&token);
        let mut state = AnnouncerState::Starting;

        info!(
            channel,
            token = %token,
            notif_id = %id,
            foreground = lease.is_some(),
            "announcer started"
        );

        loop {
            if cancel.is_cancelled() && !state.is_done() {
                info!(channel, token = %token, state = %state, "announcer cancelled");
                return AnnounceOutcome::Cancelled { at: state };
            }

            debug!(channel, token = %token, state = %state, "announcer state");

            match state {
                AnnouncerState::Starting => {
                    self.emit(Notification::started(
                        id,
                        channel,
                        &token,
                        &self.channel.start_text,
                        lease.is_some(),
                    ));
                }
                AnnouncerState::Counting(remaining) => {
                    self.emit(Notification::tick(id, channel, &token, remaining));

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            info!(channel, token = %token, state = %state, "announcer cancelled");
                            return AnnounceOutcome::Cancelled { at: state };
                        }
                        _ = tokio::time::sleep(self.channel.tick_interval) => {}
                    }
                }
                AnnouncerState::Completed => {
                    drop(lease.take());

                    self.emit(Notification::completed(id, channel, &token));
                    self.emit(Notification::alert(
                        id,
                        &self.channel.completion_channel,
                        &token,
                    ));
                    self.bus.publish(token.clone());

                    if self.channel.terminal {
                        self.emit(Notification::all_complete(&self.channel.completion_channel));
                    }
                }
                AnnouncerState::Notified => {
                    info!(channel, token = %token, "announcer finished");
                    return AnnounceOutcome::Notified;
                }
            }

            state = state.next();
        }
    }

    fn emit(&self, notification: Notification) {
        if self.notifier.notifications_permitted() {
            self.notifier.post(notification);
        } else {
            debug!(
                notif_id = %notification.id,
                channel = %notification.channel,
                kind = ?notification.kind,
                "notifications not permitted; skipping"
            );
        }
    }
}
