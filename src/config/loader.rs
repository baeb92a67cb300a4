// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** check stage
/// ordering or channel references. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    ConfigFile::try_from(raw_config)
}

/// Resolve the configuration the binary should run with.
///
/// - An explicit path must exist and be valid.
/// - Without one, `Stageline.toml` is used when present; otherwise the
///   built-in reference pipeline runs.
pub fn load_or_reference(explicit: Option<&Path>) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        return load_and_validate(path);
    }

    let path = default_config_path();
    if path.is_file() {
        load_and_validate(&path)
    } else {
        info!(
            path = %path.display(),
            "no config file found; using the built-in reference pipeline"
        );
        ConfigFile::reference()
    }
}

/// Default config path: `Stageline.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Stageline.toml")
}
