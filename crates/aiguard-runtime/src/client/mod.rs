//! Evaluation client abstraction.
//!
//! [`GuardClient`] is the single seam through which the processor reaches
//! the evaluation service. One call to [`GuardClient::evaluate`] is one
//! network request: implementations must not retry, and must fold every
//! way the call can fail into a [`ServiceFailure`].
//!
//! ## Security
//!
//! The API token is held in an [`ApiToken`]; see the [`secrets`] module.

use aiguard_core::{ConversationMessage, EvaluationVerdict, Phase, ServiceFailure};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod ai_guard;
pub mod secrets;

pub use ai_guard::AiGuardClient;
pub use secrets::{ApiToken, TokenSource};

/// Evaluation API version.
///
/// Selects the endpoint and the request/verdict layout. The two versions
/// also differ in how they treat an empty conversation: only the current
/// version skips evaluation for it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiVersion {
    /// `v1beta/guard`, per-detector verdicts
    Legacy,
    /// `v1/guard_chat_completions`, single-flag verdicts
    #[default]
    Current,
}

impl ApiVersion {
    /// Endpoint path relative to the service base URL.
    pub fn endpoint(self) -> &'static str {
        match self {
            ApiVersion::Legacy => "v1beta/guard",
            ApiVersion::Current => "v1/guard_chat_completions",
        }
    }

    /// Whether an empty conversation short-circuits to pass-through.
    pub fn skips_empty_conversation(self) -> bool {
        matches!(self, ApiVersion::Current)
    }

    /// Whether requests carry the `event_type` direction marker.
    pub fn sends_event_type(self) -> bool {
        matches!(self, ApiVersion::Current)
    }
}

/// One evaluation call. Built fresh per phase and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationRequest {
    /// Direction being evaluated
    pub phase: Phase,

    /// Conversation in envelope order
    pub messages: Vec<ConversationMessage>,

    /// Recipe selecting the service-side policy
    pub recipe: Option<String>,

    /// Application identifier reported to the service
    pub app_name: String,
}

/// Client for the content-safety evaluation service.
#[async_trait]
pub trait GuardClient: Send + Sync {
    /// Evaluate a conversation. Exactly one request per call.
    async fn evaluate(
        &self,
        request: &EvaluationRequest,
    ) -> Result<EvaluationVerdict, ServiceFailure>;

    /// API version this client speaks.
    fn api_version(&self) -> ApiVersion;

    /// Client name for logging.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_version_behaviour() {
        assert_eq!(ApiVersion::default(), ApiVersion::Current);
        assert!(ApiVersion::Current.skips_empty_conversation());
        assert!(!ApiVersion::Legacy.skips_empty_conversation());
        assert_eq!(ApiVersion::Legacy.endpoint(), "v1beta/guard");
        assert!(!ApiVersion::Legacy.sends_event_type());
    }

    #[test]
    fn test_api_version_wire_names() {
        let version: ApiVersion = serde_json::from_str("\"legacy\"").unwrap();
        assert_eq!(version, ApiVersion::Legacy);
        assert_eq!(serde_json::to_string(&ApiVersion::Current).unwrap(), "\"current\"");
    }
}
