// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::types::WorkToken;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// task_duration = "3s"
/// tick_interval = "1s"
/// require_network = true
///
/// [channel.countdown]
/// primary_token = "001"
/// notif_ids = { "001" = 1001, "002" = 1002 }
///
/// [[stage]]
/// name = "first"
/// token = "001"
///
/// [[stage]]
/// name = "second"
/// token = "002"
/// announce = "countdown"
/// ```
///
/// Stages run in file order. This is the *unvalidated* form; convert it into
/// a [`ConfigFile`] with `ConfigFile::try_from`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global timings and admission settings from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Announcer channels from `[channel.<name>]`.
    ///
    /// Entries here override the built-in `countdown` and `final` channels
    /// by name.
    #[serde(default)]
    pub channel: BTreeMap<String, ChannelConfig>,

    /// Ordered stages from `[[stage]]`.
    #[serde(default)]
    pub stage: Vec<StageConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Simulated duration of every task unit, unless overridden per stage.
    #[serde(default = "default_task_duration")]
    pub task_duration: String,

    /// Cadence of the announcer countdown.
    #[serde(default = "default_tick_interval")]
    pub tick_interval: String,

    /// Whether stages require network connectivity at submission time.
    #[serde(default = "default_require_network")]
    pub require_network: bool,

    /// `host:port` used to probe connectivity.
    #[serde(default = "default_network_probe")]
    pub network_probe: String,

    /// Upper bound on the connectivity probe.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: String,
}

fn default_task_duration() -> String {
    "3s".to_string()
}

fn default_tick_interval() -> String {
    "1s".to_string()
}

fn default_require_network() -> bool {
    true
}

fn default_network_probe() -> String {
    "1.1.1.1:53".to_string()
}

fn default_probe_timeout() -> String {
    "2s".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            task_duration: default_task_duration(),
            tick_interval: default_tick_interval(),
            require_network: default_require_network(),
            network_probe: default_network_probe(),
            probe_timeout: default_probe_timeout(),
        }
    }
}

/// `[channel.<name>]` section: one announcer service.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// Token that runs its countdown with foreground priority.
    #[serde(default)]
    pub primary_token: Option<WorkToken>,

    /// Stable notification ids for well-known tokens. Other tokens get a
    /// time-derived id.
    #[serde(default)]
    pub notif_ids: BTreeMap<String, u32>,

    /// Whether this channel emits the "all processes complete" broadcast.
    #[serde(default)]
    pub terminal: bool,

    /// Text of the first progress update.
    #[serde(default = "default_start_text")]
    pub start_text: String,
}

fn default_start_text() -> String {
    "Starting countdown...".to_string()
}

impl ChannelConfig {
    /// Built-in non-terminal channel used for the middle stage.
    pub fn countdown() -> Self {
        Self {
            primary_token: Some(WorkToken::from("001")),
            notif_ids: BTreeMap::from([("001".to_string(), 1001), ("002".to_string(), 1002)]),
            terminal: false,
            start_text: default_start_text(),
        }
    }

    /// Built-in terminal channel used for the last stage.
    pub fn final_channel() -> Self {
        Self {
            primary_token: Some(WorkToken::from("003")),
            notif_ids: BTreeMap::from([("003".to_string(), 1003)]),
            terminal: true,
            start_text: "Starting final countdown...".to_string(),
        }
    }
}

/// The channels every config starts with.
pub fn default_channels() -> BTreeMap<String, ChannelConfig> {
    BTreeMap::from([
        ("countdown".to_string(), ChannelConfig::countdown()),
        ("final".to_string(), ChannelConfig::final_channel()),
    ])
}

/// `[[stage]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    /// Human-readable stage name (e.g. `"first"`).
    pub name: String,

    /// Input token for this stage's task unit.
    pub token: WorkToken,

    /// Template for the output token; `{token}` is replaced by the input.
    #[serde(default = "default_output")]
    pub output: String,

    /// Per-stage override of `[config].task_duration`.
    #[serde(default)]
    pub duration: Option<String>,

    /// Per-stage override of `[config].require_network`.
    #[serde(default)]
    pub require_network: Option<bool>,

    /// Announcer channel launched when this stage succeeds.
    #[serde(default)]
    pub announce: Option<String>,
}

fn default_output() -> String {
    "{token}".to_string()
}

impl StageConfig {
    pub fn new(name: impl Into<String>, token: impl Into<WorkToken>) -> Self {
        Self {
            name: name.into(),
            token: token.into(),
            output: default_output(),
            duration: None,
            require_network: None,
            announce: None,
        }
    }
}

/// Resolved global settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub task_duration: Duration,
    pub tick_interval: Duration,
    pub require_network: bool,
    pub network_probe: String,
    pub probe_timeout: Duration,
}

/// A validated stage with every default applied.
#[derive(Debug, Clone)]
pub struct Stage {
    pub name: String,
    pub token: WorkToken,
    pub output: String,
    pub duration: Duration,
    pub require_network: bool,
    pub announce: Option<String>,
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see `validate.rs`)
/// or [`ConfigFile::reference`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub settings: Settings,
    pub channels: BTreeMap<String, ChannelConfig>,
    pub stages: Vec<Stage>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        settings: Settings,
        channels: BTreeMap<String, ChannelConfig>,
        stages: Vec<Stage>,
    ) -> Self {
        Self {
            settings,
            channels,
            stages,
        }
    }

    /// The raw form of the built-in three-stage pipeline:
    /// `first/001`, `second/002` announcing on `countdown`, and
    /// `third/003` announcing on `final`.
    pub fn reference_raw() -> RawConfigFile {
        let mut second = StageConfig::new("second", "002");
        second.output = "Processed second with ID: {token}".to_string();
        second.announce = Some("countdown".to_string());

        let mut third = StageConfig::new("third", "003");
        third.announce = Some("final".to_string());

        RawConfigFile {
            config: ConfigSection::default(),
            channel: BTreeMap::new(),
            stage: vec![StageConfig::new("first", "001"), second, third],
        }
    }

    /// The built-in three-stage pipeline.
    pub fn reference() -> crate::errors::Result<Self> {
        Self::try_from(Self::reference_raw())
    }

    /// Channel config by name.
    pub fn channel(&self, name: &str) -> Option<&ChannelConfig> {
        self.channels.get(name)
    }

    /// The last stage, i.e. the terminal stage.
    pub fn terminal_stage(&self) -> Option<&Stage> {
        self.stages.last()
    }
}
