// src/announce/state.rs

use std::fmt;

use super::COUNTDOWN_TICKS;

/// Lifecycle of one announcer run.
///
/// `Starting -> Counting(5) -> ... -> Counting(0) -> Completed -> Notified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnouncerState {
    Starting,
    /// Seconds (ticks) remaining.
    Counting(u8),
    Completed,
    Notified,
}

impl AnnouncerState {
    /// The state that follows `self`. `Notified` is absorbing.
    pub fn next(self) -> Self {
        match self {
            AnnouncerState::Starting => AnnouncerState::Counting(COUNTDOWN_TICKS - 1),
            AnnouncerState::Counting(0) => AnnouncerState::Completed,
            AnnouncerState::Counting(n) => AnnouncerState::Counting(n - 1),
            AnnouncerState::Completed | AnnouncerState::Notified => AnnouncerState::Notified,
        }
    }

    pub fn is_done(self) -> bool {
        self == AnnouncerState::Notified
    }
}

impl fmt::Display for AnnouncerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnouncerState::Starting => write!(f, "starting"),
            AnnouncerState::Counting(n) => write!(f, "counting({n})"),
            AnnouncerState::Completed => write!(f, "completed"),
            AnnouncerState::Notified => write!(f, "notified"),
        }
    }
}

/// How an announcer run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceOutcome {
    /// Ran through the completion phase.
    Notified,
    /// The owner token was cancelled while the run was in `at`.
    Cancelled { at: AnnouncerState },
}

impl AnnounceOutcome {
    pub fn is_cancelled(self) -> bool {
        matches!(self, AnnounceOutcome::Cancelled { .. })
    }
}
