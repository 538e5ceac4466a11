//! Watcher configuration
//!
//! Loadable from TOML; every field has a default so an empty document is a
//! valid configuration:
//! ```toml
//! debounce_ms = 1000
//! require_watch = false
//! catch_panics = true
//! ```

use crate::error::{Result, WatchError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Watcher configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Flush cadence in milliseconds (default: 1000)
    ///
    /// Pending events are flushed on a fixed tick; new events never push the
    /// next flush back.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Fail construction when the watch cannot be registered (default: false)
    ///
    /// When false the watcher still starts after the initial load but will
    /// never observe further changes.
    #[serde(default)]
    pub require_watch: bool,

    /// Contain panics raised by callbacks (default: true)
    #[serde(default = "default_true")]
    pub catch_panics: bool,
}

impl WatchConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let input = std::fs::read_to_string(path).map_err(|source| WatchError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    pub fn validate(&self) -> Result<()> {
        if self.debounce_ms == 0 {
            return Err(WatchError::Config(
                "debounce_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Flush cadence as a duration
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Same configuration with a different flush cadence
    ///
    /// Sub-millisecond cadences round up to one millisecond; only a zero
    /// duration is left for [`WatchConfig::validate`] to reject.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        let millis = (debounce.as_nanos() + 999_999) / 1_000_000;
        self.debounce_ms = u64::try_from(millis).unwrap_or(u64::MAX);
        self
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            require_watch: false,
            catch_panics: true,
        }
    }
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}
