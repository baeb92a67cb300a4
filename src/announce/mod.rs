// src/announce/mod.rs

//! Countdown-and-notify announcers launched when a stage succeeds.
//!
//! - [`state`] is the announcer state machine.
//! - [`notif_id`] decides which notification id a token gets.
//! - [`channel`] is the resolved per-channel configuration.
//! - [`notifier`] is the notification surface (`Notifier` trait, console
//!   implementation).
//! - [`countdown`] runs one countdown to completion or cancellation.
//! - [`service`] owns the spawned countdowns and the foreground slot.

pub mod channel;
pub mod countdown;
pub mod notif_id;
pub mod notifier;
pub mod service;
pub mod state;

use crate::types::NotifId;

/// Number of progress ticks per countdown (remaining = 5, 4, ..., 0).
pub const COUNTDOWN_TICKS: u8 = 6;

/// Fixed id of the "all processes complete" broadcast.
pub const ALL_COMPLETE_NOTIF_ID: NotifId = NotifId(9999);

pub use channel::ChannelSpec;
pub use countdown::Announcer;
pub use notif_id::NotifIdPolicy;
pub use notifier::{ConsoleNotifier, Notification, NotificationKind, Notifier};
pub use service::{AnnouncerService, ForegroundLease, ForegroundSlot};
pub use state::{AnnounceOutcome, AnnouncerState};
