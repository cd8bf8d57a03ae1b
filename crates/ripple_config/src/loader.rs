//! Locating, reading, and checking `ripple.toml`.

use std::path::Path;

use crate::error::ConfigError;
use crate::types::RippleConfig;

/// The file name looked up inside a project directory.
pub const CONFIG_FILE_NAME: &str = "ripple.toml";

/// Loads `ripple.toml` from `dir`, or the defaults if there is none.
pub fn load_config(dir: &Path) -> Result<RippleConfig, ConfigError> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.is_file() {
        log::debug!("no {CONFIG_FILE_NAME} in {}, using defaults", dir.display());
        return Ok(RippleConfig::default());
    }
    load_config_file(&path)
}

/// Loads a configuration from an explicit file, which must exist.
pub fn load_config_file(path: &Path) -> Result<RippleConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("loaded {}", path.display());
    load_config_from_str(&text)
}

/// Parses and checks configuration text.
pub fn load_config_from_str(content: &str) -> Result<RippleConfig, ConfigError> {
    let config: RippleConfig = toml::from_str(content)?;
    check(&config)?;
    Ok(config)
}

fn check(config: &RippleConfig) -> Result<(), ConfigError> {
    if config.kernel.max_iterations == 0 {
        return Err(ConfigError::OutOfRange {
            key: "kernel.max_iterations",
            reason: "must be greater than zero",
        });
    }
    Ok(())
}
