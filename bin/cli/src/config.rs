//! CLI configuration.
//!
//! Loaded via the `config` crate from environment variables prefixed with
//! `CLASSFLOW`, using `__` between path segments:
//!
//! ```text
//! CLASSFLOW__SERVICES__FLOW_API_URL=https://flows.example.edu
//! CLASSFLOW__AUTOSAVE__DEBOUNCE_MS=500
//! CLASSFLOW__SESSION_FILE=/tmp/classflow-session
//! ```

use crate::error::CliError;
use classflow_client::ServiceEndpoints;
use classflow_editor::AutosaveConfig;
use serde::Deserialize;
use std::path::PathBuf;

/// CLI configuration composed from library configs.
#[derive(Debug, Default, Deserialize)]
pub struct CliConfig {
    /// Service locations.
    #[serde(default)]
    pub services: ServiceEndpoints,

    /// Autosave timing for editing commands.
    #[serde(default)]
    pub autosave: AutosaveConfig,

    /// Where the sign-in token is kept between runs.
    #[serde(default)]
    pub session_file: Option<PathBuf>,
}

impl CliConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(Self::environment())
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix("CLASSFLOW")
            .separator("__")
            .try_parsing(true)
    }

    fn from_environment(source: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    /// Session file location.
    ///
    /// `session_file` wins; otherwise the file lives under the platform's
    /// user config directory (`~/.config/classflow/session` on Linux).
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] when no override is set and the platform
    /// has no user config directory.
    pub fn session_path(&self) -> Result<PathBuf, CliError> {
        if let Some(path) = &self.session_file {
            return Ok(path.clone());
        }
        dirs::config_dir()
            .map(|dir| dir.join("classflow").join("session"))
            .ok_or_else(|| CliError::Config {
                details: "no user config directory; set CLASSFLOW__SESSION_FILE".to_string(),
            })
    }
}
