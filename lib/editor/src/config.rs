//! Autosave configuration.

use serde::Deserialize;
use std::time::Duration;

/// Autosave timing.
#[derive(Debug, Clone, Deserialize)]
pub struct AutosaveConfig {
    /// Quiet period after the last change before saving, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    1000
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl AutosaveConfig {
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
