// src/announce/notifier.rs

//! Notification surface used by the announcers and the coordinator.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

use crate::types::{NotifId, WorkToken};

use super::ALL_COMPLETE_NOTIF_ID;

/// What a notification reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationKind {
    /// First progress update of a countdown.
    Started { foreground: bool },
    /// One countdown tick.
    Tick { remaining: u8 },
    /// Countdown finished; replaces the progress notification.
    Completed,
    /// Popup on the completion channel.
    Alert,
    /// "All processes complete" broadcast from a terminal channel.
    AllComplete,
}

/// One notification post. A later post with the same `id` replaces an
/// earlier one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: NotifId,
    pub channel: String,
    pub kind: NotificationKind,
    pub title: String,
    pub text: String,
}

impl Notification {
    pub fn started(
        id: NotifId,
        channel: &str,
        token: &WorkToken,
        start_text: &str,
        foreground: bool,
    ) -> Self {
        Self {
            id,
            channel: channel.to_string(),
            kind: NotificationKind::Started { foreground },
            title: format!("Worker Task {token} Running"),
            text: start_text.to_string(),
        }
    }

    pub fn tick(id: NotifId, channel: &str, token: &WorkToken, remaining: u8) -> Self {
        Self {
            id,
            channel: channel.to_string(),
            kind: NotificationKind::Tick { remaining },
            title: format!("Worker Task {token} Running"),
            text: format!("Task {token}: {remaining} seconds remaining..."),
        }
    }

    pub fn completed(id: NotifId, channel: &str, token: &WorkToken) -> Self {
        Self {
            id,
            channel: channel.to_string(),
            kind: NotificationKind::Completed,
            title: format!("Worker Task {token} Completed"),
            text: format!("Task {token} finished successfully ✅"),
        }
    }

    pub fn alert(id: NotifId, channel: &str, token: &WorkToken) -> Self {
        Self {
            id,
            channel: channel.to_string(),
            kind: NotificationKind::Alert,
            title: "Countdown Complete!".to_string(),
            text: format!("Worker Task {token} has finished successfully ✅"),
        }
    }

    pub fn all_complete(channel: &str) -> Self {
        Self {
            id: ALL_COMPLETE_NOTIF_ID,
            channel: channel.to_string(),
            kind: NotificationKind::AllComplete,
            title: "🎉 All Processes Complete!".to_string(),
            text: "All worker tasks have completed successfully.".to_string(),
        }
    }
}

/// Where notifications go.
///
/// `post` is only called after `notifications_permitted` returned `true`;
/// `toast` is never gated.
pub trait Notifier: Send + Sync + fmt::Debug {
    fn notifications_permitted(&self) -> bool;

    fn post(&self, notification: Notification);

    /// Short transient message.
    fn toast(&self, message: &str);
}

/// Prints notifications to stdout.
#[derive(Debug)]
pub struct ConsoleNotifier {
    permitted: AtomicBool,
}

impl ConsoleNotifier {
    pub fn new(permitted: bool) -> Self {
        Self {
            permitted: AtomicBool::new(permitted),
        }
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Notifier for ConsoleNotifier {
    fn notifications_permitted(&self) -> bool {
        self.permitted.load(Ordering::Relaxed)
    }

    fn post(&self, notification: Notification) {
        info!(
            notif_id = %notification.id,
            channel = %notification.channel,
            kind = ?notification.kind,
            "posting notification"
        );
        println!(
            "[{} #{}] {}: {}",
            notification.channel, notification.id, notification.title, notification.text
        );
    }

    fn toast(&self, message: &str) {
        println!("{message}");
    }
}
