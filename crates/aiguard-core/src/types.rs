//! Core types shared by every stage of gateway processing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One direction of processing.
///
/// Each phase is an independent run of the decision engine: the input phase
/// inspects the prompt on its way to the model, the output phase inspects the
/// completion on its way back to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Prompt sent by the client
    Input,
    /// Completion returned by the model
    Output,
}

impl Phase {
    /// The recipe configured for this phase, if any.
    pub fn recipe(self, parameters: &ProcessorParameters) -> Option<&str> {
        match self {
            Phase::Input => parameters.request_recipe.as_deref(),
            Phase::Output => parameters.response_recipe.as_deref(),
        }
    }

    /// Whether a blocked verdict turns into a rejection for this phase.
    ///
    /// On input, `modify` alone is enough to reject blocked content. On output
    /// only an explicit `reject` does.
    pub fn rejects_blocked(self, parameters: &ProcessorParameters) -> bool {
        match self {
            Phase::Input => parameters.reject || parameters.modify,
            Phase::Output => parameters.reject,
        }
    }

    /// Wire name used as the evaluation `event_type`.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Input => "input",
            Phase::Output => "output",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call parameters supplied by the host.
///
/// Every field is optional on the wire: recipes default to "no recipe" and
/// the three action flags default to `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorParameters {
    /// Recipe applied to prompts
    pub request_recipe: Option<String>,

    /// Recipe applied to completions
    pub response_recipe: Option<String>,

    /// Attach detection tags to the decision
    pub annotate: bool,

    /// Apply content rewrites returned by the evaluation service
    pub modify: bool,

    /// Reject exchanges the evaluation service marks as blocked
    pub reject: bool,
}

impl ProcessorParameters {
    /// Whether any action was requested at all.
    ///
    /// When this is `false` the processor cannot do anything with a verdict,
    /// so the evaluation call is skipped entirely.
    pub fn any_action(&self) -> bool {
        self.annotate || self.modify || self.reject
    }
}

/// A flattened role/content pair sent to the evaluation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Message role, passed through opaquely
    pub role: String,

    /// Message content
    pub content: String,
}

impl ConversationMessage {
    /// Create a new message.
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters_request_nothing() {
        let params = ProcessorParameters::default();
        assert!(!params.any_action());
        assert!(params.request_recipe.is_none());
        assert!(params.response_recipe.is_none());
    }

    #[test]
    fn test_parameters_deserialize_partial() {
        let params: ProcessorParameters =
            serde_json::from_str(r#"{"modify": true, "request_recipe": "pii"}"#).unwrap();
        assert!(params.modify);
        assert!(!params.reject);
        assert!(params.any_action());
        assert_eq!(Phase::Input.recipe(&params), Some("pii"));
        assert_eq!(Phase::Output.recipe(&params), None);
    }

    #[test]
    fn test_reject_asymmetry() {
        let modify_only = ProcessorParameters {
            modify: true,
            ..Default::default()
        };
        assert!(Phase::Input.rejects_blocked(&modify_only));
        assert!(!Phase::Output.rejects_blocked(&modify_only));

        let reject = ProcessorParameters {
            reject: true,
            ..Default::default()
        };
        assert!(Phase::Input.rejects_blocked(&reject));
        assert!(Phase::Output.rejects_blocked(&reject));
    }

    #[test]
    fn test_phase_wire_name() {
        assert_eq!(serde_json::to_string(&Phase::Output).unwrap(), "\"output\"");
        assert_eq!(Phase::Input.to_string(), "input");
    }
}
