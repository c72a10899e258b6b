//! # aiguard-core
//!
//! Decision-and-mutation engine for AI Guard gateway processing.
//!
//! For every prompt sent to a model and every completion returned, the
//! gateway asks this crate what to do with a verdict from the AI Guard
//! evaluation service: let the exchange through, rewrite it, or block it.
//!
//! ## Key Guarantees
//!
//! 1. **No I/O**: The evaluation call is made by the caller; this crate only
//!    prepares for it and interprets its outcome
//! 2. **Order-preserving**: Messages are evaluated and rewritten strictly by
//!    position
//! 3. **Deterministic tags**: The same verdict always produces the same tags
//! 4. **Fail closed**: An evaluation failure is a block, never a pass
//!
//! ## Example
//!
//! ```rust,ignore
//! use aiguard_core::{decide, preflight, Decision, Phase, Preflight, ProcessorParameters};
//!
//! let params = ProcessorParameters { modify: true, ..Default::default() };
//! let decision = match preflight(&params, &prompt, true) {
//!     Preflight::Skip(_) => Decision::pass(),
//!     Preflight::Evaluate(messages) => {
//!         let outcome = client.evaluate(&request_for(messages)).await;
//!         decide(Phase::Input, &params, prompt, outcome)?
//!     }
//! };
//! ```

pub mod classifier;
pub mod decision;
pub mod engine;
pub mod envelope;
pub mod extract;
pub mod merge;
pub mod tags;
pub mod types;
pub mod verdict;

// Re-export main types at crate root
pub use classifier::{classify, Findings};
pub use decision::{Decision, RejectCode, Rejection, BLOCKED_DETAIL};
pub use engine::{decide, preflight, Preflight, SkipReason};
pub use envelope::{Choice, Message, Metadata, RequestContext, RequestInput, ResponseOutput};
pub use extract::Envelope;
pub use merge::{merge_rewrites, Rewrite};
pub use tags::TagSet;
pub use types::{ConversationMessage, Phase, ProcessorParameters};
pub use verdict::{DetectorAction, DetectorOutcome, EvaluationVerdict, Rewrites, VerdictShape};

use thiserror::Error;

/// Detail used when a failed evaluation reports no structured errors.
pub const UNKNOWN_FAILURE: &str = "Unknown";

/// The evaluation service could not produce a verdict.
///
/// Covers transport errors, non-success responses and responses without a
/// result. Always surfaces as a `RESOURCE_AVAILABILITY` block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("AI Guard Failure: {detail}")]
pub struct ServiceFailure {
    pub detail: String,
}

impl ServiceFailure {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }

    /// Failure with no structured error information.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_FAILURE)
    }

    /// Join reported error details with `", "`.
    ///
    /// Falls back to [`ServiceFailure::unknown`] when there are none.
    pub fn from_details<I, S>(details: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let details: Vec<String> = details
            .into_iter()
            .map(|d| d.as_ref().to_string())
            .collect();

        if details.is_empty() {
            Self::unknown()
        } else {
            Self::new(details.join(", "))
        }
    }
}

/// The evaluation service broke its response contract.
///
/// This is an internal consistency failure, not a policy outcome, and is
/// never mapped to a decision.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    #[error("legacy verdict for the {phase} phase carries no prompt_messages while modify was requested")]
    MissingRewrite { phase: Phase },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_joins_details() {
        let failure = ServiceFailure::from_details(["bad recipe", "token expired"]);
        assert_eq!(failure.detail, "bad recipe, token expired");
        assert_eq!(failure.to_string(), "AI Guard Failure: bad recipe, token expired");
    }

    #[test]
    fn test_failure_without_details_is_unknown() {
        let failure = ServiceFailure::from_details(Vec::<String>::new());
        assert_eq!(failure, ServiceFailure::unknown());
        assert_eq!(failure.to_string(), "AI Guard Failure: Unknown");
    }

    #[test]
    fn test_contract_violation_message() {
        let err = ContractViolation::MissingRewrite { phase: Phase::Input };
        assert!(err.to_string().contains("input"));
        assert!(err.to_string().contains("prompt_messages"));
    }
}
