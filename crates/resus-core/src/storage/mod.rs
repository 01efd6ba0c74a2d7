mod config;

pub use config::{AttentionConfig, Config, GuidelineConfig, TimerConfig};

use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Returns `~/.config/resus[-dev]/` based on RESUS_ENV.
///
/// Set RESUS_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir().ok_or(ConfigError::NoDataDir)?.join(".config");

    let env = std::env::var("RESUS_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("resus-dev")
    } else {
        base_dir.join("resus")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
