// src/bus.rs

//! Overwrite-latest slot holding the most recently completed token.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::errors::{Result, StagelineError};
use crate::types::WorkToken;

/// Shared "last completed token" event.
///
/// Writes are last-write-wins and never block. Readers see only the latest
/// value; intermediate writes between two reads are not replayed.
#[derive(Debug, Clone)]
pub struct CompletionBus {
    tx: Arc<watch::Sender<Option<WorkToken>>>,
}

impl Default for CompletionBus {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionBus {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Overwrite the slot, returning the previous value.
    pub fn publish(&self, token: WorkToken) -> Option<WorkToken> {
        debug!(token = %token, "completion bus write");
        self.tx.send_replace(Some(token))
    }

    pub fn latest(&self) -> Option<WorkToken> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<WorkToken>> {
        self.tx.subscribe()
    }

    /// Resolve once the slot holds `token`, which may already be the case.
    pub async fn wait_for(&self, token: &WorkToken) -> Result<()> {
        let mut rx = self.subscribe();
        rx.wait_for(|current| current.as_ref() == Some(token))
            .await
            .map(|_| ())
            .map_err(|_| StagelineError::ChannelClosed("completion bus".to_string()))
    }

    /// Call `callback` with the current value (if any) and then with every
    /// later value.
    ///
    /// The task ends once every clone of the bus is dropped.
    pub fn observe<F>(&self, mut callback: F) -> JoinHandle<()>
    where
        F: FnMut(&WorkToken) + Send + 'static,
    {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            let current = rx.borrow_and_update().clone();
            if let Some(token) = current {
                callback(&token);
            }

            while rx.changed().await.is_ok() {
                let current = rx.borrow_and_update().clone();
                if let Some(token) = current {
                    callback(&token);
                }
            }
        })
    }
}
