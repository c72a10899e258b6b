//! Evaluation verdicts.
//!
//! The evaluation service has returned two verdict layouts over its API
//! versions. The legacy layout reports per-detector outcomes and carries
//! rewrites in `prompt_messages`; the current layout carries a single
//! `transformed` flag and rewrites in `output.messages`. The layout is
//! resolved once, when the `result` object is deserialized, into
//! [`VerdictShape`]. Nothing downstream probes for field presence.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// What a detector did with a finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectorAction {
    /// Finding was reported and left in place
    Reported,
    /// Finding blocked the exchange
    Blocked,
    /// Finding was redacted; carries the raw action (e.g. `"redacted:replaced"`)
    Redacted(String),
    /// Any other action string
    Other(String),
}

impl DetectorAction {
    pub fn parse(action: &str) -> Self {
        match action {
            "reported" => Self::Reported,
            "blocked" => Self::Blocked,
            a if a.contains("redacted") => Self::Redacted(a.to_string()),
            a => Self::Other(a.to_string()),
        }
    }
}

/// Outcome of a single detector in a legacy verdict.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DetectorOutcome {
    /// Whether the detector fired. Detectors without the flag are inert.
    pub detected: bool,

    /// Detector-level action
    pub action: Option<DetectorAction>,

    /// Per-entity actions, when the detector reports entities
    pub entities: Option<Vec<DetectorAction>>,
}

impl DetectorOutcome {
    /// Actions to classify, in order.
    ///
    /// Entity actions take precedence over the detector-level action.
    pub fn actions(&self) -> &[DetectorAction] {
        match (&self.entities, &self.action) {
            (Some(entities), _) => entities,
            (None, Some(action)) => std::slice::from_ref(action),
            (None, None) => &[],
        }
    }
}

/// Rewritten contents by position. `None` marks a message the service
/// returned without content, such as a tool call; it is left untouched.
pub type Rewrites = Vec<Option<String>>;

/// The verdict layout returned by the evaluation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerdictShape {
    /// Per-detector outcomes; rewrites from `prompt_messages`
    Legacy {
        detectors: BTreeMap<String, DetectorOutcome>,
        rewritten: Option<Rewrites>,
    },
    /// Single `transformed` flag; rewrites from `output.messages`
    Current {
        transformed: bool,
        rewritten: Option<Rewrites>,
    },
}

/// A parsed evaluation verdict.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawVerdict")]
pub struct EvaluationVerdict {
    /// Whether the service considers the exchange blocked
    pub blocked: bool,

    pub shape: VerdictShape,
}

impl EvaluationVerdict {
    /// A current-layout verdict whose rewritten messages all carry content.
    pub fn current(blocked: bool, transformed: bool, rewritten: Option<Vec<String>>) -> Self {
        Self {
            blocked,
            shape: VerdictShape::Current {
                transformed,
                rewritten: rewritten.map(with_content),
            },
        }
    }

    /// A legacy-layout verdict.
    pub fn legacy(
        blocked: bool,
        detectors: BTreeMap<String, DetectorOutcome>,
        rewritten: Option<Vec<String>>,
    ) -> Self {
        Self {
            blocked,
            shape: VerdictShape::Legacy {
                detectors,
                rewritten: rewritten.map(with_content),
            },
        }
    }

    /// Parse the `result` object of an evaluation response.
    pub fn from_json(value: JsonValue) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

}

fn with_content(contents: Vec<String>) -> Rewrites {
    contents.into_iter().map(Some).collect()
}

// Wire format

#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(default)]
    blocked: bool,
    #[serde(default)]
    transformed: Option<bool>,
    #[serde(default)]
    detectors: Option<BTreeMap<String, Option<RawDetector>>>,
    #[serde(default)]
    prompt_messages: Option<Vec<RawMessage>>,
    #[serde(default)]
    output: Option<RawOutput>,
}

#[derive(Debug, Deserialize)]
struct RawDetector {
    #[serde(default)]
    detected: Option<bool>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    data: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawOutput {
    #[serde(default)]
    messages: Option<Vec<RawMessage>>,
}

impl From<RawDetector> for DetectorOutcome {
    fn from(raw: RawDetector) -> Self {
        // `data` is detector-specific; only an `entities` array is meaningful here.
        let entities = raw
            .data
            .as_ref()
            .and_then(|data| data.get("entities"))
            .and_then(JsonValue::as_array)
            .map(|entities| {
                entities
                    .iter()
                    .filter_map(|entity| entity.get("action").and_then(JsonValue::as_str))
                    .map(DetectorAction::parse)
                    .collect()
            });

        Self {
            detected: raw.detected.unwrap_or(false),
            action: raw.action.as_deref().map(DetectorAction::parse),
            entities,
        }
    }
}

fn contents(messages: Vec<RawMessage>) -> Rewrites {
    messages.into_iter().map(|m| m.content).collect()
}

impl From<RawVerdict> for EvaluationVerdict {
    fn from(raw: RawVerdict) -> Self {
        match raw.transformed {
            Some(transformed) => Self {
                blocked: raw.blocked,
                shape: VerdictShape::Current {
                    transformed,
                    rewritten: raw.output.and_then(|o| o.messages).map(contents),
                },
            },
            None => {
                let detectors = raw
                    .detectors
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|(name, detector)| detector.map(|d| (name, d.into())))
                    .collect();
                Self {
                    blocked: raw.blocked,
                    shape: VerdictShape::Legacy {
                        detectors,
                        rewritten: raw.prompt_messages.map(contents),
                    },
                }
            }
        }
    }
}
