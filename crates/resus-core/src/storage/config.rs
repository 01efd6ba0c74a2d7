//! TOML-based configuration of protocol intervals and thresholds.
//!
//! Only tuning values live here; a case itself is never written to disk.
//! Configuration is stored at `~/.config/resus/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, CoreError, Result};

/// Guideline scheduler intervals, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidelineConfig {
    #[serde(default = "default_two_minutes")]
    pub rhythm_check_interval_secs: u64,
    #[serde(default = "default_adrenaline_reminder")]
    pub adrenaline_reminder_secs: u64,
    #[serde(default = "default_five")]
    pub advisory_display_secs: u64,
    #[serde(default = "default_five")]
    pub follow_up_delay_secs: u64,
}

/// Timer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_two_minutes")]
    pub cpr_cycle_secs: u64,
}

/// Thresholds of the attention flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttentionConfig {
    #[serde(default = "default_two_minutes")]
    pub rhythm_check_secs: u64,
    #[serde(default = "default_adrenaline_stale")]
    pub adrenaline_stale_secs: u64,
    /// Doses of amiodarone/lidocaine tolerated before the control is flagged.
    #[serde(default = "default_antiarrhythmic_max")]
    pub antiarrhythmic_max_doses: usize,
    #[serde(default = "default_outcome_prompt")]
    pub outcome_prompt_secs: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/resus/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub guideline: GuidelineConfig,
    #[serde(default)]
    pub timers: TimerConfig,
    #[serde(default)]
    pub attention: AttentionConfig,
}

// Default functions
fn default_two_minutes() -> u64 {
    120
}
fn default_adrenaline_reminder() -> u64 {
    180
}
fn default_five() -> u64 {
    5
}
fn default_adrenaline_stale() -> u64 {
    300
}
fn default_antiarrhythmic_max() -> usize {
    2
}
fn default_outcome_prompt() -> u64 {
    1200
}

impl Default for GuidelineConfig {
    fn default() -> Self {
        Self {
            rhythm_check_interval_secs: default_two_minutes(),
            adrenaline_reminder_secs: default_adrenaline_reminder(),
            advisory_display_secs: default_five(),
            follow_up_delay_secs: default_five(),
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            cpr_cycle_secs: default_two_minutes(),
        }
    }
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            rhythm_check_secs: default_two_minutes(),
            adrenaline_stale_secs: default_adrenaline_stale(),
            antiarrhythmic_max_doses: default_antiarrhythmic_max(),
            outcome_prompt_secs: default_outcome_prompt(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            // Every leaf is a non-negative integer.
            if !existing.is_u64() {
                return Err(unknown());
            }
            let n = value
                .trim()
                .parse::<u64>()
                .map_err(|e| invalid(format!("cannot parse '{value}' as seconds/count: {e}")))?;
            obj.insert(part.to_string(), serde_json::Value::Number(n.into()));
            return Ok(());
        }

        Err(unknown())
    }

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults there if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                CoreError::from(ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value is not a
    /// non-negative integer.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default configuration");
            Self::default()
        })
    }
}
