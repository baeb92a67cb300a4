// src/coordinator.rs

//! Reacts to stage states: a toast on every finish, an announcer launch on
//! every successful finish of a stage that has an announce channel.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::announce::{AnnouncerService, ChannelSpec, Notifier};
use crate::bus::CompletionBus;
use crate::config::{ConfigFile, Stage};
use crate::errors::{Result, StagelineError};
use crate::pipeline::PipelineHandle;
use crate::types::WorkState;

#[derive(Debug, Clone)]
pub struct Coordinator {
    notifier: Arc<dyn Notifier>,
    services: BTreeMap<String, AnnouncerService>,
}

impl Coordinator {
    pub fn new(notifier: Arc<dyn Notifier>, services: BTreeMap<String, AnnouncerService>) -> Self {
        Self { notifier, services }
    }

    /// One announcer service per configured channel, each owned by a child
    /// of `shutdown`.
    pub fn from_config(
        cfg: &ConfigFile,
        notifier: Arc<dyn Notifier>,
        bus: CompletionBus,
        shutdown: &CancellationToken,
    ) -> Self {
        let services = cfg
            .channels
            .iter()
            .map(|(name, channel)| {
                let spec = ChannelSpec::from_config(name, channel, cfg.settings.tick_interval);
                let service = AnnouncerService::new(
                    spec,
                    Arc::clone(&notifier),
                    bus.clone(),
                    shutdown.child_token(),
                );
                (name.clone(), service)
            })
            .collect();

        Self::new(notifier, services)
    }

    /// Subscribe to every stage of `handle`. `stages[i]` describes unit `i`.
    pub fn attach(&self, handle: &PipelineHandle, stages: &[Stage]) -> Result<()> {
        for (index, stage) in stages.iter().enumerate() {
            let service = match &stage.announce {
                Some(channel) => Some(self.services.get(channel).cloned().ok_or_else(|| {
                    StagelineError::ConfigError(format!(
                        "stage '{}' announces on unknown channel '{channel}'",
                        stage.name
                    ))
                })?),
                None => None,
            };

            let notifier = Arc::clone(&self.notifier);
            let message = finish_message(&stage.name);

            handle.subscribe(index, move |update| {
                let WorkState::Finished(result) = &update.state else {
                    return;
                };

                notifier.toast(&message);

                if !result.is_success() {
                    debug!(unit = %update.name, "stage failed; no announcer");
                    return;
                }

                if let Some(service) = &service {
                    let priority = service.priority_for(&update.token);
                    info!(
                        unit = %update.name,
                        token = %update.token,
                        channel = %service.channel().name,
                        ?priority,
                        "stage succeeded; launching announcer"
                    );
                    service.launch(update.token.clone(), priority);
                }
            })?;
        }

        Ok(())
    }

    /// Wait for every launched countdown to end.
    pub async fn wait_idle(&self) {
        for service in self.services.values() {
            service.wait_idle().await;
        }
    }

    /// Cancel every in-flight countdown on every channel.
    pub fn shutdown(&self) {
        for service in self.services.values() {
            service.shutdown();
        }
    }
}

/// `"second"` -> `"Second process is done"`.
pub fn finish_message(stage_name: &str) -> String {
    let mut chars = stage_name.chars();
    let capitalised: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("{capitalised} process is done")
}
