// src/announce/channel.rs

use std::time::Duration;

use crate::config::ChannelConfig;
use crate::types::{PriorityHint, WorkToken};

use super::notif_id::NotifIdPolicy;

/// Resolved configuration of one announcer channel.
#[derive(Debug, Clone)]
pub struct ChannelSpec {
    pub name: String,
    /// Channel the completion popup is posted on (`<name>_completion`).
    pub completion_channel: String,
    pub primary_token: Option<WorkToken>,
    pub notif_ids: NotifIdPolicy,
    /// Terminal channels also emit the "all processes complete" broadcast.
    pub terminal: bool,
    pub start_text: String,
    pub tick_interval: Duration,
}

impl ChannelSpec {
    pub fn from_config(name: &str, cfg: &ChannelConfig, tick_interval: Duration) -> Self {
        Self {
            name: name.to_string(),
            completion_channel: format!("{name}_completion"),
            primary_token: cfg.primary_token.clone(),
            notif_ids: NotifIdPolicy::from_table(&cfg.notif_ids),
            terminal: cfg.terminal,
            start_text: cfg.start_text.clone(),
            tick_interval,
        }
    }

    /// Foreground for the channel's primary token, background otherwise.
    pub fn priority_for(&self, token: &WorkToken) -> PriorityHint {
        match &self.primary_token {
            Some(primary) if primary == token => PriorityHint::Foreground,
            _ => PriorityHint::Background,
        }
    }
}
