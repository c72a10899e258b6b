//! Phase decisions returned to the host.

use serde::Serialize;
use std::fmt;

use crate::tags::TagSet;

/// Detail attached to policy rejections.
pub const BLOCKED_DETAIL: &str = "Blocked by AI Guard";

/// Classification of a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectCode {
    /// The evaluation service judged the content unacceptable
    PolicyViolation,
    /// The evaluation service could not be consulted
    ResourceAvailability,
}

impl fmt::Display for RejectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectCode::PolicyViolation => write!(f, "POLICY_VIOLATION"),
            RejectCode::ResourceAvailability => write!(f, "RESOURCE_AVAILABILITY"),
        }
    }
}

/// A rejected exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub code: RejectCode,

    /// Human-readable reason
    pub detail: String,

    pub tags: TagSet,
}

/// Outcome of one processing phase.
///
/// `E` is the envelope the phase inspected: the prompt on input, the
/// response on output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision<E> {
    /// Let the exchange through untouched
    PassThrough { tags: TagSet },

    /// Let the exchange through with rewritten content
    Modified { content: E, tags: TagSet },

    /// Stop the exchange
    Block(Rejection),
}

impl<E> Decision<E> {
    /// Pass-through with no tags.
    pub fn pass() -> Self {
        Self::PassThrough {
            tags: TagSet::new(),
        }
    }

    /// Rejection caused by blocked content.
    pub fn policy_violation(tags: TagSet) -> Self {
        Self::Block(Rejection {
            code: RejectCode::PolicyViolation,
            detail: BLOCKED_DETAIL.to_string(),
            tags,
        })
    }

    /// Rejection caused by an unavailable evaluation service.
    pub fn resource_unavailable(detail: impl Into<String>) -> Self {
        Self::Block(Rejection {
            code: RejectCode::ResourceAvailability,
            detail: detail.into(),
            tags: TagSet::new(),
        })
    }

    /// Tags attached to this decision.
    pub fn tags(&self) -> &TagSet {
        match self {
            Self::PassThrough { tags } | Self::Modified { tags, .. } => tags,
            Self::Block(rejection) => &rejection.tags,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Block(_))
    }

    pub fn is_modified(&self) -> bool {
        matches!(self, Self::Modified { .. })
    }

    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PassThrough { .. } => "pass_through",
            Self::Modified { .. } => "modified",
            Self::Block(_) => "block",
        }
    }
}
