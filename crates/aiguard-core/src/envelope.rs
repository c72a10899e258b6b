//! Host envelope types.
//!
//! The gateway hands the processor a prompt (a list of messages) or a
//! response (a list of choices, each wrapping a message). Only `role` and
//! `content` matter here; every other field is carried in `extra` and
//! serialized back untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

/// Free-form request metadata supplied by the host.
pub type Metadata = Map<String, JsonValue>;

/// A single chat message as the host represents it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role: "system", "user", "assistant", or anything the host sends
    pub role: String,

    /// Message content
    #[serde(default)]
    pub content: String,

    /// Fields this processor does not interpret
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Message {
    /// Create a message with no extra fields.
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            extra: Map::new(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// The prompt side of an exchange.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestInput {
    /// Ordered conversation sent to the model
    #[serde(default)]
    pub messages: Vec<Message>,

    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl RequestInput {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            extra: Map::new(),
        }
    }
}

/// One completion choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub message: Message,

    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Choice {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            extra: Map::new(),
        }
    }
}

/// The response side of an exchange.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseOutput {
    /// Ordered choices returned by the model
    #[serde(default)]
    pub choices: Vec<Choice>,

    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl ResponseOutput {
    pub fn new(choices: Vec<Choice>) -> Self {
        Self {
            choices,
            extra: Map::new(),
        }
    }

    /// Build a response with one choice per message.
    pub fn from_messages(messages: impl IntoIterator<Item = Message>) -> Self {
        Self::new(messages.into_iter().map(Choice::new).collect())
    }
}

/// Client request context forwarded by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestContext {
    /// Client address, if the host knows it
    pub client: Option<String>,

    /// Request headers
    pub headers: BTreeMap<String, String>,
}
