#![allow(dead_code)]

use std::collections::BTreeMap;

use stageline::config::{ConfigFile, ConfigSection, RawConfigFile, StageConfig};
use stageline::errors::Result;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts with no stages and with connectivity not required.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection {
                    require_network: false,
                    ..ConfigSection::default()
                },
                channel: BTreeMap::new(),
                stage: vec![],
            },
        }
    }

    /// The reference three-stage pipeline with test-friendly timings.
    pub fn fast_reference() -> Self {
        let mut raw = ConfigFile::reference_raw();
        raw.config.require_network = false;
        raw.config.task_duration = "20ms".to_string();
        raw.config.tick_interval = "10ms".to_string();
        Self { config: raw }
    }

    pub fn with_stage(mut self, stage: StageConfig) -> Self {
        self.config.stage.push(stage);
        self
    }

    pub fn task_duration(mut self, d: &str) -> Self {
        self.config.config.task_duration = d.to_string();
        self
    }

    pub fn tick_interval(mut self, d: &str) -> Self {
        self.config.config.tick_interval = d.to_string();
        self
    }

    pub fn require_network(mut self, val: bool) -> Self {
        self.config.config.require_network = val;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `StageConfig`.
pub struct StageConfigBuilder {
    stage: StageConfig,
}

impl StageConfigBuilder {
    pub fn new(name: &str, token: &str) -> Self {
        Self {
            stage: StageConfig::new(name, token),
        }
    }

    pub fn output(mut self, template: &str) -> Self {
        self.stage.output = template.to_string();
        self
    }

    pub fn duration(mut self, d: &str) -> Self {
        self.stage.duration = Some(d.to_string());
        self
    }

    pub fn require_network(mut self, val: bool) -> Self {
        self.stage.require_network = Some(val);
        self
    }

    pub fn announce(mut self, channel: &str) -> Self {
        self.stage.announce = Some(channel.to_string());
        self
    }

    pub fn build(self) -> StageConfig {
        self.stage
    }
}
