//! Processor configuration.
//!
//! Loaded from a JSON or YAML file (chosen by extension), usually the one
//! named by `PANGEA_CONFIG_PATH`:
//!
//! ```json
//! {
//!   "base_url_template": "https://{SERVICE_NAME}.aws.us.pangea.cloud",
//!   "ai_guard_api_token": "pts_...",     // Optional, falls back to PANGEA_AI_GUARD_TOKEN
//!   "app_name": "f5-ai-gateway",          // Optional
//!   "api_version": "current",             // Optional: "legacy" | "current"
//!   "timeout": "30s"                      // Optional, humantime format
//! }
//! ```

use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::client::{ApiToken, ApiVersion};

/// Environment variable holding the config file path.
pub const CONFIG_PATH_ENV: &str = "PANGEA_CONFIG_PATH";

/// Environment variable holding the API token when the file has none.
pub const TOKEN_ENV: &str = "PANGEA_AI_GUARD_TOKEN";

/// Config key holding the API token.
pub const TOKEN_KEY: &str = "ai_guard_api_token";

/// Application identifier sent with every evaluation.
pub const DEFAULT_APP_NAME: &str = "f5-ai-gateway";

/// Placeholder in `base_url_template` replaced by the service name.
pub const SERVICE_NAME_PLACEHOLDER: &str = "{SERVICE_NAME}";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from loading configuration or building clients from it.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Config validation failed: {0}")]
    ValidationError(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    base_url_template: String,
    #[serde(default)]
    app_name: Option<String>,
    #[serde(default)]
    api_version: ApiVersion,
    #[serde(default)]
    timeout: Option<String>,
}

/// Configuration for the AI Guard processor.
#[derive(Debug)]
pub struct GuardConfig {
    /// Service URL template, e.g. `https://{SERVICE_NAME}.aws.us.pangea.cloud`
    pub base_url_template: String,

    /// AI Guard API token
    pub token: ApiToken,

    /// Application identifier reported to the service
    pub app_name: String,

    /// Evaluation API version
    pub api_version: ApiVersion,

    /// HTTP request timeout
    pub timeout: Duration,
}

impl GuardConfig {
    /// Create a config with defaults for every optional field.
    pub fn new(base_url_template: impl Into<String>, token: ApiToken) -> Self {
        Self {
            base_url_template: base_url_template.into(),
            token,
            app_name: DEFAULT_APP_NAME.to_string(),
            api_version: ApiVersion::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Build from a parsed config document.
    pub fn from_value(value: &JsonValue) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_value(value.clone())?;
        let token = ApiToken::from_config_or_env(value, TOKEN_KEY, TOKEN_ENV)?;

        let timeout = match raw.timeout.as_deref() {
            Some(text) => humantime::parse_duration(text).map_err(|e| {
                ConfigError::ValidationError(format!("invalid timeout '{}': {}", text, e))
            })?,
            None => DEFAULT_TIMEOUT,
        };

        let config = Self {
            base_url_template: raw.base_url_template,
            token,
            app_name: raw.app_name.unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
            api_version: raw.api_version,
            timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON config document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: JsonValue = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Parse a YAML config document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let value: JsonValue = serde_yaml::from_str(yaml)?;
        Self::from_value(&value)
    }

    /// Load from a file; `.yaml`/`.yml` is parsed as YAML, anything else as JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            _ => Self::from_json(&content),
        }
    }

    /// Load from the file named by `PANGEA_CONFIG_PATH`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).map_err(|_| {
            ConfigError::NotConfigured(format!(
                "set '{}' to the processor config file",
                CONFIG_PATH_ENV
            ))
        })?;
        Self::from_file(path)
    }

    /// Check field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let template = &self.base_url_template;
        if !template.starts_with("http://") && !template.starts_with("https://") {
            return Err(ConfigError::ValidationError(
                "base_url_template must start with http:// or https://".to_string(),
            ));
        }

        if self.token.is_empty() {
            return Err(ConfigError::MissingCredential(
                "AI Guard API token is empty".to_string(),
            ));
        }

        if self.app_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "app_name must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Base URL for a service, with the template placeholder filled in.
    pub fn service_url(&self, service_name: &str) -> String {
        self.base_url_template
            .replace(SERVICE_NAME_PLACEHOLDER, service_name)
            .trim_end_matches('/')
            .to_string()
    }
}
