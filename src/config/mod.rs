// src/config/mod.rs

//! Configuration loading and validation for stageline.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk, or fall back to the reference
//!   pipeline (`loader.rs`).
//! - Validate stage ordering and channel references (`validate.rs`).
//! - Parse duration strings such as `"3s"` (`duration.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_reference};
pub use model::{
    ChannelConfig, ConfigFile, ConfigSection, RawConfigFile, Settings, Stage, StageConfig,
};
