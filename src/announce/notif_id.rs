// src/announce/notif_id.rs

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::{NotifId, WorkToken};

/// Modulus applied to the wall clock for tokens without a fixed id.
const TIME_DERIVED_MODULUS: u128 = 100_000;

/// Maps a token to the notification id its announcer run uses.
///
/// Well-known tokens have a fixed id per channel so repeated runs replace
/// each other's notifications. Any other token gets
/// `unix_millis % 100_000`, which is *not* stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifIdPolicy {
    fixed: BTreeMap<WorkToken, NotifId>,
}

impl NotifIdPolicy {
    pub fn new(fixed: impl IntoIterator<Item = (WorkToken, NotifId)>) -> Self {
        Self {
            fixed: fixed.into_iter().collect(),
        }
    }

    /// Build from a `token = id` table as found in `[channel.<name>].notif_ids`.
    pub fn from_table(table: &BTreeMap<String, u32>) -> Self {
        Self::new(
            table
                .iter()
                .map(|(token, id)| (WorkToken::new(token.as_str()), NotifId(*id))),
        )
    }

    /// Fixed id for `token`, if it is well-known on this channel.
    pub fn fixed(&self, token: &WorkToken) -> Option<NotifId> {
        self.fixed.get(token).copied()
    }

    /// Id for `token`, falling back to the current wall clock.
    pub fn derive(&self, token: &WorkToken) -> NotifId {
        self.fixed(token)
            .unwrap_or_else(|| Self::time_derived_at(SystemTime::now()))
    }

    /// Time-derived id for a given instant. Instants before the epoch map to 0.
    pub fn time_derived_at(now: SystemTime) -> NotifId {
        let millis = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        // The modulus keeps the value well inside u32.
        NotifId((millis % TIME_DERIVED_MODULUS) as u32)
    }
}
