//! SDK Configuration
//!
//! Configuration is loaded from multiple sources with precedence:
//! 1. Environment variables (AMAPLAYER_*)
//! 2. Config file (`$AMAPLAYER_CONFIG` or ~/.amaplayer/config.toml)
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::SDKResult;

/// SDK configuration options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SDKConfig {
    /// Backend project URL
    pub api_url: String,

    /// Public (anon) API key
    pub api_key: String,

    /// Signed-in user's access token (optional)
    pub access_token: Option<String>,

    /// Engagement engine configuration
    pub engagement: EngagementConfig,
}

/// Engagement engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementConfig {
    /// Debounce window for repeated toggles in milliseconds (default: 300)
    pub debounce_ms: u64,

    /// Total remote calls per action before giving up (default: 3)
    pub max_attempts: u32,

    /// Base retry delay in milliseconds, doubled per attempt (default: 1000)
    pub base_delay_ms: u64,

    /// Cap on a single retry delay in milliseconds (default: 30000)
    pub max_delay_ms: u64,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

impl EngagementConfig {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.max_attempts == 0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "engagement.max_attempts".into(),
                message: "must be at least 1".into(),
            });
        }

        if self.max_delay_ms < self.base_delay_ms {
            return Err(ConfigValidationError::InvalidValue {
                field: "engagement.max_delay_ms".into(),
                message: "must not be smaller than base_delay_ms".into(),
            });
        }

        Ok(())
    }
}

impl SDKConfig {
    /// Create a new SDK config for the given backend
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Set the access token
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Set engagement configuration
    pub fn with_engagement(mut self, engagement: EngagementConfig) -> Self {
        self.engagement = engagement;
        self
    }

    /// Load configuration from the default location, then apply env overrides.
    pub fn load() -> SDKResult<Self> {
        let path = Self::config_path();
        let config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        Ok(config.apply_overrides(|key| std::env::var(key).ok()))
    }

    /// Load configuration from a TOML file
    pub fn load_from(path: &Path) -> SDKResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded SDK config");
        Ok(config)
    }

    /// Get the config file path.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("AMAPLAYER_CONFIG") {
            PathBuf::from(path)
        } else {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".amaplayer")
                .join("config.toml")
        }
    }

    /// Apply `AMAPLAYER_*` overrides from a variable lookup.
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("AMAPLAYER_API_URL") {
            self.api_url = url;
        }
        if let Some(key) = lookup("AMAPLAYER_API_KEY") {
            self.api_key = key;
        }
        if let Some(token) = lookup("AMAPLAYER_ACCESS_TOKEN") {
            self.access_token = Some(token);
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !self.api_url.is_empty()
            && !(self.api_url.starts_with("https://") || self.api_url.starts_with("http://"))
        {
            return Err(ConfigValidationError::InvalidValue {
                field: "api_url".into(),
                message: "must be an http(s) URL".into(),
            });
        }

        self.engagement.validate()
    }

    /// Validate the fields needed to talk to the hosted backend
    pub fn validate_remote(&self) -> Result<(), ConfigValidationError> {
        if self.api_url.is_empty() {
            return Err(ConfigValidationError::MissingApiUrl);
        }
        if self.api_key.is_empty() {
            return Err(ConfigValidationError::MissingApiKey);
        }
        self.validate()
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("api_url is required")]
    MissingApiUrl,

    #[error("api_key is required")]
    MissingApiKey,

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
