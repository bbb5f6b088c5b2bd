// SPDX-License-Identifier: EUPL-1.2-or-later
// Copyright © 2026-present Steer Contributors

//! Traffic Classification
//!
//! Maps a packet's DSCP marking to a scheduler band and, optionally, to a
//! traffic-class label used by policy routing.

use crate::error::ClassifierError;
use crate::packet::{DSCP_BE, DSCP_EF, MAX_MARKING, TrafficClass};
use serde::{Deserialize, Serialize};

/// One classification rule: an inclusive marking range mapped to a band
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRule {
    /// Lowest marking matched (inclusive)
    pub low: u8,
    /// Highest marking matched (inclusive)
    pub high: u8,
    /// Scheduler band; smaller is served first
    pub band: usize,
    /// Traffic-class label for policy routing
    #[serde(default)]
    pub class: Option<TrafficClass>,
}

impl ClassRule {
    pub fn new(low: u8, high: u8, band: usize) -> Self {
        Self {
            low,
            high,
            band,
            class: None,
        }
    }

    pub fn with_class(mut self, class: impl Into<TrafficClass>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn contains(&self, marking: u8) -> bool {
        (self.low..=self.high).contains(&marking)
    }

    fn overlaps(&self, other: &ClassRule) -> bool {
        self.low <= other.high && other.low <= self.high
    }
}

/// Marking classifier with a fall-through default band
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficClassifier {
    rules: Vec<ClassRule>,
    default_band: usize,
}

impl TrafficClassifier {
    /// Builds a classifier, rejecting malformed or overlapping ranges.
    pub fn new(rules: Vec<ClassRule>, default_band: usize) -> Result<Self, ClassifierError> {
        for (i, rule) in rules.iter().enumerate() {
            if rule.low > rule.high || rule.high > MAX_MARKING {
                return Err(ClassifierError::InvalidRange {
                    low: rule.low,
                    high: rule.high,
                });
            }

            if let Some(prev) = rules[..i].iter().find(|prev| prev.overlaps(rule)) {
                return Err(ClassifierError::OverlappingClassRule {
                    first: (prev.low, prev.high),
                    second: (rule.low, rule.high),
                });
            }
        }

        Ok(Self {
            rules,
            default_band,
        })
    }

    /// Three-band preset: EF to band 0, best effort to band 2, everything else band 1.
    pub fn pfifo_fast() -> Self {
        Self {
            rules: vec![
                ClassRule::new(DSCP_EF, DSCP_EF, 0).with_class("video"),
                ClassRule::new(DSCP_BE, DSCP_BE, 2).with_class("data"),
            ],
            default_band: 1,
        }
    }

    fn matching_rule(&self, marking: u8) -> Option<&ClassRule> {
        self.rules.iter().find(|rule| rule.contains(marking))
    }

    /// Returns the band for a marking. Never fails.
    pub fn classify(&self, marking: u8) -> usize {
        self.matching_rule(marking)
            .map(|rule| rule.band)
            .unwrap_or(self.default_band)
    }

    /// Returns the traffic-class label for a marking, if its rule carries one.
    pub fn traffic_class(&self, marking: u8) -> Option<&TrafficClass> {
        self.matching_rule(marking)
            .and_then(|rule| rule.class.as_ref())
    }

    pub fn default_band(&self) -> usize {
        self.default_band
    }

    pub fn rules(&self) -> &[ClassRule] {
        &self.rules
    }

    /// Number of bands a scheduler needs to hold every band this classifier emits
    pub fn bands_required(&self) -> usize {
        self.rules
            .iter()
            .map(|rule| rule.band)
            .chain(std::iter::once(self.default_band))
            .max()
            .unwrap_or(0)
            + 1
    }
}

impl Default for TrafficClassifier {
    fn default() -> Self {
        Self::pfifo_fast()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ef_be_classifier() -> TrafficClassifier {
        TrafficClassifier::new(vec![ClassRule::new(46, 46, 0), ClassRule::new(0, 0, 2)], 1)
            .unwrap()
    }

    #[test]
    fn test_classify_matches_rules_and_default() {
        let classifier = ef_be_classifier();
        assert_eq!(classifier.classify(46), 0);
        assert_eq!(classifier.classify(0), 2);
        assert_eq!(classifier.classify(10), 1);
    }

    #[test]
    fn test_classify_is_total() {
        let classifier = TrafficClassifier::new(
            vec![ClassRule::new(8, 15, 3), ClassRule::new(40, 47, 0)],
            5,
        )
        .unwrap();

        for marking in 0..=MAX_MARKING {
            let band = classifier.classify(marking);
            let expected = match marking {
                8..=15 => 3,
                40..=47 => 0,
                _ => 5,
            };
            assert_eq!(band, expected, "marking {}", marking);
        }

        // Out-of-domain markings fall through rather than fail
        assert_eq!(classifier.classify(200), 5);
    }

    #[test]
    fn test_overlapping_rules_rejected() {
        let result = TrafficClassifier::new(
            vec![ClassRule::new(10, 20, 0), ClassRule::new(20, 30, 1)],
            2,
        );
        assert_eq!(
            result,
            Err(ClassifierError::OverlappingClassRule {
                first: (10, 20),
                second: (20, 30),
            })
        );
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        let inverted = TrafficClassifier::new(vec![ClassRule::new(9, 3, 0)], 1);
        assert_eq!(inverted, Err(ClassifierError::InvalidRange { low: 9, high: 3 }));

        let too_wide = TrafficClassifier::new(vec![ClassRule::new(60, 64, 0)], 1);
        assert_eq!(too_wide, Err(ClassifierError::InvalidRange { low: 60, high: 64 }));
    }

    #[test]
    fn test_traffic_class_labels() {
        let classifier = TrafficClassifier::pfifo_fast();
        assert_eq!(
            classifier.traffic_class(DSCP_EF),
            Some(&TrafficClass::from("video"))
        );
        assert_eq!(
            classifier.traffic_class(DSCP_BE),
            Some(&TrafficClass::from("data"))
        );
        assert_eq!(classifier.traffic_class(26), None);
    }

    #[test]
    fn test_bands_required() {
        assert_eq!(TrafficClassifier::pfifo_fast().bands_required(), 3);
        let only_default = TrafficClassifier::new(vec![], 0).unwrap();
        assert_eq!(only_default.bands_required(), 1);
    }
}
