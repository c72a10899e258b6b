//! Decision engine.
//!
//! A phase runs as a straight pipeline:
//!
//! 1. **Gate**: no requested action means no evaluation call.
//! 2. **Extract**: flatten the envelope; an empty conversation may skip
//!    evaluation (current API only).
//! 3. **Evaluate**: one call, performed by the caller. Failure is a
//!    `RESOURCE_AVAILABILITY` block.
//! 4. **Classify**: tags, only when annotating.
//! 5. **Reject**: blocked verdicts become `POLICY_VIOLATION` when the phase
//!    rejects blocked content.
//! 6. **Merge**: apply rewrites when modifying.
//! 7. **Finalize**: pass through, modified or not.
//!
//! Steps 1 and 2 are [`preflight`]; steps 3 to 7 are [`decide`]. The evaluation
//! call itself sits between them and belongs to the caller, so this module
//! never performs I/O.

use crate::classifier::classify;
use crate::decision::Decision;
use crate::extract::Envelope;
use crate::merge::merge_rewrites;
use crate::tags::TagSet;
use crate::types::{ConversationMessage, Phase, ProcessorParameters};
use crate::verdict::{EvaluationVerdict, VerdictShape};
use crate::{ContractViolation, ServiceFailure};

/// What to do before contacting the evaluation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preflight {
    /// Return pass-through without evaluating
    Skip(SkipReason),

    /// Evaluate these messages
    Evaluate(Vec<ConversationMessage>),
}

/// Why a phase skipped evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// None of annotate, modify or reject was requested
    NoAction,
    /// The envelope holds no messages
    NoMessages,
}

/// Run the gate and extraction steps.
///
/// `skip_empty` enables the empty-conversation short-circuit. Legacy
/// processors evaluate empty conversations anyway.
pub fn preflight<E: Envelope>(
    parameters: &ProcessorParameters,
    envelope: &E,
    skip_empty: bool,
) -> Preflight {
    if !parameters.any_action() {
        return Preflight::Skip(SkipReason::NoAction);
    }

    let messages = envelope.conversation();
    if skip_empty && messages.is_empty() {
        return Preflight::Skip(SkipReason::NoMessages);
    }

    Preflight::Evaluate(messages)
}

/// Turn an evaluation outcome into the phase decision.
///
/// On a modified pass-through, the returned decision owns `envelope` with
/// rewritten contents; otherwise the envelope is dropped, since the host
/// keeps its own copy.
///
/// # Errors
///
/// [`ContractViolation`] when a legacy verdict must be merged but carries
/// no rewritten messages.
pub fn decide<E: Envelope>(
    phase: Phase,
    parameters: &ProcessorParameters,
    mut envelope: E,
    outcome: Result<EvaluationVerdict, ServiceFailure>,
) -> Result<Decision<E>, ContractViolation> {
    let verdict = match outcome {
        Ok(verdict) => verdict,
        Err(failure) => return Ok(Decision::resource_unavailable(failure.to_string())),
    };

    let tags = if parameters.annotate {
        classify(&verdict)
    } else {
        TagSet::new()
    };

    if verdict.blocked && phase.rejects_blocked(parameters) {
        return Ok(Decision::policy_violation(tags));
    }

    let modified = parameters.modify && apply_rewrites(phase, &verdict, &mut envelope)?;

    if modified {
        Ok(Decision::Modified {
            content: envelope,
            tags,
        })
    } else {
        Ok(Decision::PassThrough { tags })
    }
}

/// Merge a verdict's rewrites into `envelope`, returning whether anything changed.
///
/// Only an absent legacy `prompt_messages` is a contract violation; an empty
/// list is accepted and merges nothing.
fn apply_rewrites<E: Envelope>(
    phase: Phase,
    verdict: &EvaluationVerdict,
    envelope: &mut E,
) -> Result<bool, ContractViolation> {
    match &verdict.shape {
        VerdictShape::Legacy { rewritten, .. } => {
            let rewritten = rewritten
                .as_deref()
                .ok_or(ContractViolation::MissingRewrite { phase })?;
            Ok(merge_rewrites(envelope.messages_mut(), rewritten))
        }
        VerdictShape::Current {
            transformed: true,
            rewritten: Some(rewritten),
        } => Ok(merge_rewrites(envelope.messages_mut(), rewritten)),
        VerdictShape::Current { .. } => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::RejectCode;
    use crate::envelope::{Message, RequestInput, ResponseOutput};
    use crate::tags::{TAG_ATTACKS, TAG_BLOCKED, TAG_MODIFIED, TAG_REDACTIONS, TAG_REPORTS};
    use crate::verdict::{DetectorAction, DetectorOutcome};
    use std::collections::BTreeMap;

    fn params(annotate: bool, modify: bool, reject: bool) -> ProcessorParameters {
        ProcessorParameters {
            annotate,
            modify,
            reject,
            ..Default::default()
        }
    }

    fn prompt(content: &str) -> RequestInput {
        RequestInput::new(vec![Message::user(content)])
    }

    fn blocked_legacy() -> EvaluationVerdict {
        let detectors = BTreeMap::from([(
            "profanity".to_string(),
            DetectorOutcome {
                detected: true,
                action: Some(DetectorAction::Blocked),
                entities: None,
            },
        )]);
        EvaluationVerdict::legacy(true, detectors, None)
    }

    #[test]
    fn test_preflight_gate() {
        let result = preflight(&params(false, false, false), &prompt("hi"), true);
        assert_eq!(result, Preflight::Skip(SkipReason::NoAction));
    }

    #[test]
    fn test_preflight_empty_conversation() {
        let empty = RequestInput::default();
        assert_eq!(
            preflight(&params(false, true, false), &empty, true),
            Preflight::Skip(SkipReason::NoMessages)
        );
        assert_eq!(
            preflight(&params(false, true, false), &empty, false),
            Preflight::Evaluate(vec![])
        );
    }

    #[test]
    fn test_preflight_extracts_messages() {
        match preflight(&params(true, false, false), &prompt("hello"), true) {
            Preflight::Evaluate(messages) => {
                assert_eq!(messages, vec![ConversationMessage::new("user", "hello")]);
            }
            other => panic!("expected evaluation, got {:?}", other),
        }
    }

    #[test]
    fn test_service_failure_blocks() {
        let decision = decide(
            Phase::Input,
            &params(true, true, true),
            prompt("hi"),
            Err(ServiceFailure::unknown()),
        )
        .unwrap();

        match decision {
            Decision::Block(rejection) => {
                assert_eq!(rejection.code, RejectCode::ResourceAvailability);
                assert_eq!(rejection.detail, "AI Guard Failure: Unknown");
            }
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn test_reject_on_blocked_verdict() {
        let decision = decide(
            Phase::Input,
            &params(true, false, true),
            prompt("darn"),
            Ok(blocked_legacy()),
        )
        .unwrap();

        match decision {
            Decision::Block(rejection) => {
                assert_eq!(rejection.code, RejectCode::PolicyViolation);
                assert_eq!(rejection.detail, "Blocked by AI Guard");
                assert_eq!(rejection.tags.get(TAG_ATTACKS).unwrap(), &["profanity".to_string()]);
                assert_eq!(rejection.tags.get(TAG_BLOCKED).unwrap(), &["true".to_string()]);
            }
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn test_modify_blocks_on_input_only() {
        let verdict = EvaluationVerdict::current(true, false, None);

        let input = decide(Phase::Input, &params(false, true, false), prompt("x"), Ok(verdict.clone()))
            .unwrap();
        assert!(input.is_blocked());

        let output = decide(
            Phase::Output,
            &params(false, true, false),
            ResponseOutput::from_messages([Message::assistant("x")]),
            Ok(verdict),
        )
        .unwrap();
        assert!(!output.is_blocked());
    }

    #[test]
    fn test_blocked_verdict_annotate_only_passes() {
        let decision = decide(
            Phase::Input,
            &params(true, false, false),
            prompt("darn"),
            Ok(blocked_legacy()),
        )
        .unwrap();

        assert!(matches!(decision, Decision::PassThrough { .. }));
        assert!(decision.tags().contains_key(TAG_ATTACKS));
    }

    #[test]
    fn test_current_transformed_rewrites() {
        let verdict = EvaluationVerdict::current(false, true, Some(vec!["secret ***".to_string()]));
        let decision = decide(Phase::Input, &params(true, true, false), prompt("secret 123"), Ok(verdict))
            .unwrap();

        match decision {
            Decision::Modified { content, tags } => {
                assert_eq!(content.messages[0].content, "secret ***");
                assert_eq!(tags.get(TAG_MODIFIED).unwrap(), &["true".to_string()]);
                assert_eq!(tags.get(TAG_BLOCKED).unwrap(), &["false".to_string()]);
            }
            other => panic!("expected modified, got {:?}", other),
        }
    }

    #[test]
    fn test_current_not_transformed_ignores_rewrites() {
        let verdict = EvaluationVerdict::current(false, false, Some(vec!["other".to_string()]));
        let decision = decide(Phase::Input, &params(false, true, false), prompt("same"), Ok(verdict))
            .unwrap();
        assert!(matches!(decision, Decision::PassThrough { .. }));
    }

    #[test]
    fn test_current_transformed_without_payload_is_noop() {
        let verdict = EvaluationVerdict::current(false, true, None);
        let decision = decide(Phase::Input, &params(false, true, false), prompt("same"), Ok(verdict))
            .unwrap();
        assert!(matches!(decision, Decision::PassThrough { .. }));
    }

    #[test]
    fn test_legacy_missing_rewrite_is_contract_violation() {
        let verdict = EvaluationVerdict::legacy(false, BTreeMap::new(), None);
        let result = decide(Phase::Output, &params(false, true, false), ResponseOutput::default(), Ok(verdict));

        assert_eq!(
            result.unwrap_err(),
            ContractViolation::MissingRewrite {
                phase: Phase::Output
            }
        );
    }

    #[test]
    fn test_legacy_identical_rewrite_passes_through() {
        let verdict = EvaluationVerdict::legacy(false, BTreeMap::new(), Some(vec!["hello".to_string()]));
        let decision = decide(Phase::Input, &params(false, true, false), prompt("hello"), Ok(verdict))
            .unwrap();
        assert!(matches!(decision, Decision::PassThrough { .. }));
        assert!(decision.tags().is_empty());
    }

    #[test]
    fn test_output_rewrites_choice_messages() {
        let verdict = EvaluationVerdict::legacy(
            false,
            BTreeMap::new(),
            Some(vec!["call <PHONE_NUMBER>".to_string()]),
        );
        let response = ResponseOutput::from_messages([Message::assistant("call 555-0100")]);

        let decision = decide(Phase::Output, &params(false, true, false), response, Ok(verdict)).unwrap();
        match decision {
            Decision::Modified { content, .. } => {
                assert_eq!(content.choices[0].message.content, "call <PHONE_NUMBER>");
                assert_eq!(content.choices[0].message.role, "assistant");
            }
            other => panic!("expected modified, got {:?}", other),
        }
    }

    #[test]
    fn test_no_annotate_means_no_tags() {
        let decision = decide(Phase::Output, &params(false, false, true), ResponseOutput::default(), Ok(blocked_legacy()))
            .unwrap();
        match decision {
            Decision::Block(rejection) => assert!(rejection.tags.is_empty()),
            other => panic!("expected block, got {:?}", other),
        }
    }

    fn flag(decision: &Decision<RequestInput>, key: &str) -> Option<String> {
        decision.tags().get(key).map(|values| values.join(","))
    }

    #[test]
    fn test_clean_legacy_verdict_passes_with_flag_tags() {
        let verdict = EvaluationVerdict::from_json(serde_json::json!({"detectors": {}})).unwrap();
        let decision = decide(Phase::Input, &params(true, false, false), prompt("hello"), Ok(verdict)).unwrap();

        assert!(matches!(decision, Decision::PassThrough { .. }));
        assert_eq!(flag(&decision, TAG_BLOCKED).as_deref(), Some("false"));
        assert_eq!(flag(&decision, TAG_MODIFIED).as_deref(), Some("false"));
        assert!(!decision.tags().contains_key(TAG_REPORTS));
        assert!(!decision.tags().contains_key(TAG_ATTACKS));
        assert!(!decision.tags().contains_key(TAG_REDACTIONS));
        assert_eq!(decision.tags().len(), 2);
    }

    #[test]
    fn test_clean_current_verdict_passes_with_flag_tags() {
        let verdict = EvaluationVerdict::current(false, false, None);
        let decision = decide(Phase::Input, &params(true, true, true), prompt("hello"), Ok(verdict)).unwrap();

        assert!(matches!(decision, Decision::PassThrough { .. }));
        assert_eq!(flag(&decision, TAG_BLOCKED).as_deref(), Some("false"));
        assert_eq!(flag(&decision, TAG_MODIFIED).as_deref(), Some("false"));
        assert_eq!(decision.tags().len(), 2);
    }

    #[test]
    fn test_legacy_empty_rewrite_list_passes_through() {
        let verdict = EvaluationVerdict::legacy(false, BTreeMap::new(), Some(vec![]));
        let decision = decide(Phase::Input, &params(false, true, false), prompt("hi"), Ok(verdict)).unwrap();
        assert_eq!(decision, Decision::pass());
    }

    #[test]
    fn test_rewrite_without_content_keeps_original() {
        let verdict = EvaluationVerdict {
            blocked: false,
            shape: VerdictShape::Current {
                transformed: true,
                rewritten: Some(vec![None, Some("<EMAIL_ADDRESS>".to_string())]),
            },
        };
        let input = RequestInput::new(vec![Message::assistant("tool call"), Message::user("a@b.co")]);

        match decide(Phase::Input, &params(false, true, false), input, Ok(verdict)).unwrap() {
            Decision::Modified { content, .. } => {
                assert_eq!(content.messages[0].content, "tool call");
                assert_eq!(content.messages[1].content, "<EMAIL_ADDRESS>");
            }
            other => panic!("expected modified, got {:?}", other),
        }
    }
}
