//! Secure handling of the AI Guard API token.
//!
//! The token is wrapped in [`ApiToken`] as soon as it is read, so it cannot
//! end up in `Debug`/`Display` output, logs, or error messages. The raw
//! value is only reachable through [`ApiToken::expose`], which the HTTP
//! client calls when it sets the `Authorization` header.
//!
//! ```ignore
//! let token = ApiToken::from_config_or_env(&config, "ai_guard_api_token", TOKEN_ENV)?;
//! request.bearer_auth(token.expose());
//! ```

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use std::fmt;

use crate::config::ConfigError;

/// Where a token was loaded from.
///
/// Reported in diagnostics instead of the value itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// Read from the configuration file
    Config,
    /// Read from an environment variable
    Environment,
    /// Passed in by the caller
    Programmatic,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::Config => write!(f, "config"),
            TokenSource::Environment => write!(f, "environment"),
            TokenSource::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// An API token that redacts itself everywhere except at the point of use.
pub struct ApiToken {
    value: SecretString,
    source: TokenSource,
}

impl ApiToken {
    pub fn new(value: impl Into<String>, source: TokenSource) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
        }
    }

    /// Read the token from `config[config_key]`, falling back to `env_var`.
    ///
    /// The config value wins when both are present.
    pub fn from_config_or_env(
        config: &JsonValue,
        config_key: &str,
        env_var: &str,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = config[config_key].as_str() {
            return Ok(Self::new(value, TokenSource::Config));
        }

        if let Ok(value) = std::env::var(env_var) {
            return Ok(Self::new(value, TokenSource::Environment));
        }

        Err(ConfigError::MissingCredential(format!(
            "AI Guard API token required: set '{}' in config or {} environment variable",
            config_key, env_var
        )))
    }

    /// The raw token. Call only where the value is sent; never store it.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().is_empty()
    }

    pub fn source(&self) -> TokenSource {
        self.source
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiToken")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AI Guard API token from {} [REDACTED]", self.source)
    }
}
