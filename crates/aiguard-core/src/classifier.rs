//! Verdict classification.
//!
//! Turns a verdict into the tag set attached to a decision. The two verdict
//! layouts use independent strategies:
//!
//! - **Legacy**: every fired detector is sorted into reports, redactions and
//!   attacks by its action(s), then summarized into tags.
//! - **Current**: exactly two tags, `blocked` and `modified`, copied from the
//!   verdict flags.
//!
//! Classification is a pure function of the verdict. Detectors are visited
//! in name order, so the same verdict always yields the same tags.

use std::collections::BTreeMap;

use crate::tags::{
    TagSet, TAG_ATTACKS, TAG_ATTACKS_DETECTED, TAG_BLOCKED, TAG_MODIFIED, TAG_REDACTIONS,
    TAG_REPORTS,
};
use crate::verdict::{DetectorAction, DetectorOutcome, EvaluationVerdict, VerdictShape};

/// Detector names grouped by what the detector did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Findings {
    pub reports: Vec<String>,
    pub redactions: Vec<String>,
    pub attacks: Vec<String>,
}

impl Findings {
    /// Group fired detectors by action.
    ///
    /// A detector name is recorded once per matching action, so a detector
    /// with two redacted entities appears twice under redactions.
    pub fn collect(detectors: &BTreeMap<String, DetectorOutcome>) -> Self {
        let mut findings = Self::default();

        for (name, outcome) in detectors.iter().filter(|(_, o)| o.detected) {
            for action in outcome.actions() {
                match action {
                    DetectorAction::Reported => findings.reports.push(name.clone()),
                    DetectorAction::Blocked => findings.attacks.push(name.clone()),
                    DetectorAction::Redacted(_) => findings.redactions.push(name.clone()),
                    DetectorAction::Other(other) => {
                        tracing::trace!(detector = %name, action = %other, "Unclassified detector action");
                    }
                }
            }
        }

        findings
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty() && self.redactions.is_empty() && self.attacks.is_empty()
    }

    fn into_tags(self) -> TagSet {
        let mut tags = TagSet::new();

        if !self.reports.is_empty() {
            tags.add(TAG_REPORTS, self.reports);
        }

        if self.redactions.is_empty() {
            tags.add_flag(TAG_MODIFIED, false);
        } else {
            tags.add(TAG_REDACTIONS, self.redactions);
            tags.add_flag(TAG_MODIFIED, true);
        }

        if self.attacks.is_empty() {
            tags.add_flag(TAG_BLOCKED, false);
        } else {
            tags.add(TAG_ATTACKS, self.attacks.iter().cloned());
            tags.add_flag(TAG_BLOCKED, true);
            tags.add(TAG_ATTACKS_DETECTED, self.attacks);
        }

        tags
    }
}

/// Build the tag set describing a verdict.
pub fn classify(verdict: &EvaluationVerdict) -> TagSet {
    match &verdict.shape {
        VerdictShape::Legacy { detectors, .. } => Findings::collect(detectors).into_tags(),
        VerdictShape::Current { transformed, .. } => {
            let mut tags = TagSet::new();
            tags.add_flag(TAG_BLOCKED, verdict.blocked);
            tags.add_flag(TAG_MODIFIED, *transformed);
            tags
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fired(action: &str) -> DetectorOutcome {
        DetectorOutcome {
            detected: true,
            action: Some(DetectorAction::parse(action)),
            entities: None,
        }
    }

    fn values(tags: &TagSet, key: &str) -> Vec<String> {
        tags.get(key).map(<[String]>::to_vec).unwrap_or_default()
    }

    #[test]
    fn test_clean_legacy_verdict() {
        let tags = classify(&EvaluationVerdict::legacy(false, BTreeMap::new(), None));

        assert_eq!(values(&tags, TAG_BLOCKED), vec!["false"]);
        assert_eq!(values(&tags, TAG_MODIFIED), vec!["false"]);
        assert!(!tags.contains_key(TAG_REPORTS));
        assert!(!tags.contains_key(TAG_ATTACKS));
        assert!(!tags.contains_key(TAG_REDACTIONS));
        assert!(!tags.contains_key(TAG_ATTACKS_DETECTED));
    }

    #[test]
    fn test_blocked_detector() {
        let detectors = BTreeMap::from([("profanity".to_string(), fired("blocked"))]);
        let tags = classify(&EvaluationVerdict::legacy(true, detectors, None));

        assert_eq!(values(&tags, TAG_ATTACKS), vec!["profanity"]);
        assert_eq!(values(&tags, TAG_BLOCKED), vec!["true"]);
        assert_eq!(values(&tags, TAG_ATTACKS_DETECTED), vec!["profanity"]);
        assert_eq!(values(&tags, TAG_MODIFIED), vec!["false"]);
    }

    #[test]
    fn test_tag_order() {
        let detectors = BTreeMap::from([
            ("a_report".to_string(), fired("reported")),
            ("b_redact".to_string(), fired("redacted:replaced")),
            ("c_attack".to_string(), fired("blocked")),
        ]);
        let tags = classify(&EvaluationVerdict::legacy(true, detectors, None));

        assert_eq!(
            tags.keys().collect::<Vec<_>>(),
            vec![
                TAG_REPORTS,
                TAG_REDACTIONS,
                TAG_MODIFIED,
                TAG_ATTACKS,
                TAG_BLOCKED,
                TAG_ATTACKS_DETECTED
            ]
        );
    }

    #[test]
    fn test_undetected_detectors_are_ignored() {
        let mut quiet = fired("blocked");
        quiet.detected = false;
        let detectors = BTreeMap::from([("quiet".to_string(), quiet)]);

        let tags = classify(&EvaluationVerdict::legacy(false, detectors, None));
        assert_eq!(values(&tags, TAG_BLOCKED), vec!["false"]);
        assert!(!tags.contains_key(TAG_ATTACKS));
    }

    #[test]
    fn test_entity_actions() {
        let pii = DetectorOutcome {
            detected: true,
            action: None,
            entities: Some(vec![
                DetectorAction::parse("redacted:replaced"),
                DetectorAction::parse("redacted:hashed"),
                DetectorAction::parse("reported"),
            ]),
        };
        let findings = Findings::collect(&BTreeMap::from([("pii_entity".to_string(), pii)]));

        assert_eq!(findings.redactions, vec!["pii_entity", "pii_entity"]);
        assert_eq!(findings.reports, vec!["pii_entity"]);
        assert!(findings.attacks.is_empty());
    }

    #[test]
    fn test_other_actions_produce_no_findings() {
        let detectors = BTreeMap::from([("urls".to_string(), fired("defanged"))]);
        assert!(Findings::collect(&detectors).is_empty());
    }

    #[test]
    fn test_current_shape_two_tags() {
        let tags = classify(&EvaluationVerdict::current(false, true, None));

        assert_eq!(tags.len(), 2);
        assert_eq!(values(&tags, TAG_BLOCKED), vec!["false"]);
        assert_eq!(values(&tags, TAG_MODIFIED), vec!["true"]);
    }

    fn action_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("reported".to_string()),
            Just("blocked".to_string()),
            Just("redacted:replaced".to_string()),
            "[a-z]{1,8}",
        ]
    }

    fn detector_strategy() -> impl Strategy<Value = DetectorOutcome> {
        (
            any::<bool>(),
            proptest::option::of(action_strategy()),
            proptest::option::of(proptest::collection::vec(action_strategy(), 0..4)),
        )
            .prop_map(|(detected, action, entities)| DetectorOutcome {
                detected,
                action: action.as_deref().map(DetectorAction::parse),
                entities: entities
                    .map(|e| e.iter().map(|a| DetectorAction::parse(a)).collect()),
            })
    }

    proptest! {
        #[test]
        fn prop_classification_is_deterministic(
            blocked in any::<bool>(),
            detectors in proptest::collection::btree_map("[a-z_]{1,12}", detector_strategy(), 0..8),
        ) {
            let verdict = EvaluationVerdict::legacy(blocked, detectors, None);
            let first = classify(&verdict);
            let second = classify(&verdict.clone());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_legacy_always_reports_both_flags(
            detectors in proptest::collection::btree_map("[a-z_]{1,12}", detector_strategy(), 0..8),
        ) {
            let tags = classify(&EvaluationVerdict::legacy(false, detectors, None));
            prop_assert!(tags.contains_key(TAG_BLOCKED));
            prop_assert!(tags.contains_key(TAG_MODIFIED));
        }
    }
}
