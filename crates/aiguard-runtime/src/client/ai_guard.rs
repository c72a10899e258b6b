//! AI Guard HTTP client.
//!
//! Posts the conversation to the AI Guard service and normalizes whatever
//! comes back into a verdict or a [`ServiceFailure`]. The response
//! envelope is the same for every API version:
//!
//! ```json
//! { "request_id": "prq_...", "status": "Success", "summary": "...", "result": { ... } }
//! ```
//!
//! On failure `status` names the error and `result.errors[*].detail`
//! describes it.

use aiguard_core::{ConversationMessage, EvaluationVerdict, Phase, ServiceFailure};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::secrets::ApiToken;
use super::{ApiVersion, EvaluationRequest, GuardClient};
use crate::config::{ConfigError, GuardConfig};

/// Service name substituted into the base URL template.
pub const SERVICE_NAME: &str = "ai-guard";

const SUCCESS_STATUS: &str = "Success";

/// HTTP client for the AI Guard service.
///
/// The token is only exposed when the `Authorization` header is set.
pub struct AiGuardClient {
    token: ApiToken,
    base_url: String,
    api_version: ApiVersion,
    http: reqwest::Client,
}

impl std::fmt::Debug for AiGuardClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiGuardClient")
            .field("token", &self.token)
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl AiGuardClient {
    /// Build a client from processor configuration.
    pub fn from_config(config: GuardConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            base_url: config.service_url(SERVICE_NAME),
            token: config.token,
            api_version: config.api_version,
            http,
        })
    }

    /// Full URL of the evaluation endpoint.
    pub fn endpoint_url(&self) -> String {
        format!("{}/{}", self.base_url, self.api_version.endpoint())
    }
}

// Wire format

#[derive(Debug, Serialize)]
struct GuardRequestBody<'a> {
    messages: &'a [ConversationMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    recipe: Option<&'a str>,
    app_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    event_type: Option<Phase>,
}

#[derive(Debug, Deserialize)]
struct ResponseEnvelope {
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    result: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
struct ErrorResult {
    #[serde(default)]
    errors: Vec<ErrorField>,
}

#[derive(Debug, Deserialize)]
struct ErrorField {
    #[serde(default)]
    detail: String,
}

impl ResponseEnvelope {
    fn into_verdict(self) -> Result<EvaluationVerdict, ServiceFailure> {
        if self.status != SUCCESS_STATUS {
            let errors = self
                .result
                .and_then(|result| serde_json::from_value::<ErrorResult>(result).ok())
                .map(|result| result.errors)
                .unwrap_or_default();
            return Err(ServiceFailure::from_details(
                errors.iter().map(|e| e.detail.as_str()),
            ));
        }

        match self.result {
            Some(result) if !result.is_null() => EvaluationVerdict::from_json(result)
                .map_err(|e| ServiceFailure::new(format!("invalid verdict: {}", e))),
            _ => Err(ServiceFailure::unknown()),
        }
    }
}

#[async_trait]
impl GuardClient for AiGuardClient {
    async fn evaluate(
        &self,
        request: &EvaluationRequest,
    ) -> Result<EvaluationVerdict, ServiceFailure> {
        let body = GuardRequestBody {
            messages: &request.messages,
            recipe: request.recipe.as_deref(),
            app_name: &request.app_name,
            event_type: self
                .api_version
                .sends_event_type()
                .then_some(request.phase),
        };

        // SECURITY: Only expose the token here, at the point of use
        let response = self
            .http
            .post(self.endpoint_url())
            .bearer_auth(self.token.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceFailure::new(e.to_string()))?;

        let status = response.status();
        let envelope: ResponseEnvelope = match response.json().await {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(status = %status, error = %e, "Undecodable AI Guard response");
                return Err(ServiceFailure::unknown());
            }
        };

        tracing::debug!(
            http_status = %status,
            request_id = envelope.request_id.as_deref().unwrap_or("-"),
            status = %envelope.status,
            summary = envelope.summary.as_deref().unwrap_or(""),
            "AI Guard responded"
        );

        envelope.into_verdict()
    }

    fn api_version(&self) -> ApiVersion {
        self.api_version
    }

    fn name(&self) -> &str {
        SERVICE_NAME
    }
}
