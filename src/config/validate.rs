// src/config/validate.rs

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use crate::config::duration::parse_duration;
use crate::config::model::{
    default_channels, ChannelConfig, ConfigFile, RawConfigFile, Settings, Stage,
};
use crate::errors::{Result, StagelineError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::StagelineError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let settings = resolve_settings(&raw)?;

        let mut channels = default_channels();
        channels.extend(raw.channel.clone());

        validate_stages(&raw, &channels)?;
        let stages = resolve_stages(&raw, &settings)?;
        validate_network_probe(&settings, &stages)?;

        Ok(ConfigFile::new_unchecked(settings, channels, stages))
    }
}

fn config_error(msg: impl Into<String>) -> StagelineError {
    StagelineError::ConfigError(msg.into())
}

fn duration_field(field: &str, value: &str) -> Result<Duration> {
    parse_duration(value).map_err(|e| config_error(format!("{field}: {e}")))
}

fn resolve_settings(raw: &RawConfigFile) -> Result<Settings> {
    let cfg = &raw.config;

    let tick_interval = duration_field("[config].tick_interval", &cfg.tick_interval)?;
    if tick_interval.is_zero() {
        return Err(config_error("[config].tick_interval must be greater than zero"));
    }

    Ok(Settings {
        task_duration: duration_field("[config].task_duration", &cfg.task_duration)?,
        tick_interval,
        require_network: cfg.require_network,
        network_probe: cfg.network_probe.trim().to_string(),
        probe_timeout: duration_field("[config].probe_timeout", &cfg.probe_timeout)?,
    })
}

/// The probe target is needed as soon as any stage, after overrides,
/// requires the network.
fn validate_network_probe(settings: &Settings, stages: &[Stage]) -> Result<()> {
    if !settings.network_probe.is_empty() {
        return Ok(());
    }
    match stages.iter().find(|s| s.require_network) {
        Some(stage) => Err(config_error(format!(
            "[config].network_probe must be set when stage '{}' requires the network",
            stage.name
        ))),
        None => Ok(()),
    }
}

fn validate_stages(raw: &RawConfigFile, channels: &BTreeMap<String, ChannelConfig>) -> Result<()> {
    if raw.stage.is_empty() {
        return Err(config_error(
            "config must contain at least one [[stage]] section",
        ));
    }

    let mut names = HashSet::new();
    let mut tokens = HashSet::new();
    let last = raw.stage.len() - 1;
    let mut terminal_announcer: Option<&str> = None;

    for (idx, stage) in raw.stage.iter().enumerate() {
        if stage.name.trim().is_empty() {
            return Err(config_error(format!("stage #{idx} has an empty name")));
        }
        if stage.token.as_str().trim().is_empty() {
            return Err(config_error(format!(
                "stage '{}' has an empty token",
                stage.name
            )));
        }
        if !names.insert(stage.name.as_str()) {
            return Err(config_error(format!(
                "duplicate stage name '{}'",
                stage.name
            )));
        }
        if !tokens.insert(stage.token.as_str()) {
            return Err(config_error(format!(
                "duplicate stage token '{}' (stage '{}')",
                stage.token, stage.name
            )));
        }

        let Some(channel_name) = stage.announce.as_deref() else {
            continue;
        };

        let channel = channels.get(channel_name).ok_or_else(|| {
            config_error(format!(
                "stage '{}' announces on unknown channel '{}'",
                stage.name, channel_name
            ))
        })?;

        if channel.terminal {
            if let Some(previous) = terminal_announcer {
                return Err(config_error(format!(
                    "stages '{}' and '{}' both announce on a terminal channel; only one is allowed",
                    previous, stage.name
                )));
            }
            if idx != last {
                return Err(config_error(format!(
                    "stage '{}' announces on terminal channel '{}' but is not the last stage",
                    stage.name, channel_name
                )));
            }
            terminal_announcer = Some(stage.name.as_str());
        }
    }

    Ok(())
}

fn resolve_stages(raw: &RawConfigFile, settings: &Settings) -> Result<Vec<Stage>> {
    raw.stage
        .iter()
        .map(|stage| {
            let duration = match &stage.duration {
                Some(d) => duration_field(&format!("stage '{}' duration", stage.name), d)?,
                None => settings.task_duration,
            };

            Ok(Stage {
                name: stage.name.clone(),
                token: stage.token.clone(),
                output: stage.output.clone(),
                duration,
                require_network: stage.require_network.unwrap_or(settings.require_network),
                announce: stage.announce.clone(),
            })
        })
        .collect()
}
