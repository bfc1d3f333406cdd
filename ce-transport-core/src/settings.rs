//! Process-level settings for an embedding agent or source.
//!
//! These choose the transport and point at its YAML document; the document
//! itself is read by the config loader.

use crate::{TransportError, TransportResult, DEFAULT_DRAIN_CLIENT_ID};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Settings for a process that owns a transport client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportSettings {
    /// Transport name (`kafka`, `mqtt`, `grpc`)
    pub transport_type: String,

    /// Path to the transport's YAML configuration document
    pub config_file: PathBuf,

    /// Client identifier used for metrics and, where needed, as a default group id
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_client_id() -> String {
    DEFAULT_DRAIN_CLIENT_ID.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TransportSettings {
    /// Load settings from `TRANSPORT_SETTINGS_FILE` if set, else from the environment
    ///
    /// Environment overrides are applied in both cases.
    pub fn load() -> TransportResult<Self> {
        let mut settings = if let Ok(path) = env::var("TRANSPORT_SETTINGS_FILE") {
            Self::from_file(&path)?
        } else {
            Self::from_env()?
        };

        settings.apply_env_overrides();
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from environment variables
    ///
    /// Environment variables:
    /// - `TRANSPORT_TYPE`: Required, transport name
    /// - `TRANSPORT_CONFIG_FILE`: Required, path to the transport YAML document
    /// - `CLIENT_ID`: Client identifier (default: ce-transport)
    /// - `LOG_LEVEL`: Log level (default: info)
    pub fn from_env() -> TransportResult<Self> {
        let transport_type = env::var("TRANSPORT_TYPE")
            .map_err(|_| TransportError::config("TRANSPORT_TYPE is required"))?;

        let config_file = env::var("TRANSPORT_CONFIG_FILE")
            .map_err(|_| TransportError::config("TRANSPORT_CONFIG_FILE is required"))?;

        let client_id = env::var("CLIENT_ID").unwrap_or_else(|_| default_client_id());

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| default_log_level());

        Ok(Self {
            transport_type,
            config_file: PathBuf::from(config_file),
            client_id,
            log_level,
        })
    }

    /// Load settings from a TOML file
    pub fn from_file(path: &str) -> TransportResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TransportError::config_with_source(format!("Failed to read settings file {}", path), e)
        })?;

        toml::from_str(&content).map_err(|e| {
            TransportError::config_with_source(format!("Failed to parse settings file {}", path), e)
        })
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("TRANSPORT_TYPE") {
            self.transport_type = val;
        }
        if let Ok(val) = env::var("TRANSPORT_CONFIG_FILE") {
            self.config_file = PathBuf::from(val);
        }
        if let Ok(val) = env::var("CLIENT_ID") {
            self.client_id = val;
        }
        if let Ok(val) = env::var("LOG_LEVEL") {
            self.log_level = val;
        }
    }

    /// Validate the settings
    pub fn validate(&self) -> TransportResult<()> {
        if self.transport_type.is_empty() {
            return Err(TransportError::validation(
                "transport_type",
                "transport_type cannot be empty",
            ));
        }

        if self.config_file.as_os_str().is_empty() {
            return Err(TransportError::validation(
                "config_file",
                "config_file cannot be empty",
            ));
        }

        if self.client_id.is_empty() {
            return Err(TransportError::validation(
                "client_id",
                "client_id cannot be empty",
            ));
        }

        Ok(())
    }
}
