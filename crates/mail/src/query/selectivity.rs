//! Selectivity estimation for predicate ordering
//!
//! Each predicate kind carries a static estimate of the fraction of messages
//! it keeps. Lower is more selective and runs earlier. Estimates can be
//! overridden per kind; ties keep declaration order.

use std::collections::HashMap;

use super::filter::{Predicate, PredicateKind};

/// Subjects longer than this are assumed to match fewer messages
const LONG_SUBJECT_CHARS: usize = 10;
const LONG_SUBJECT_FACTOR: f64 = 0.7;
const FULL_ADDRESS_FACTOR: f64 = 0.5;

/// A predicate together with its estimate and declaration position
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPredicate {
    pub predicate: Predicate,
    pub selectivity: f64,
    pub position: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SelectivityEstimator {
    overrides: HashMap<PredicateKind, f64>,
}

impl SelectivityEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the base estimate for one predicate kind (clamped to 0..=1)
    pub fn with_estimate(mut self, kind: PredicateKind, estimate: f64) -> Self {
        self.overrides.insert(kind, estimate.clamp(0.0, 1.0));
        self
    }

    /// Static estimate for a predicate kind before value adjustments
    pub fn base_estimate(&self, kind: PredicateKind) -> f64 {
        if let Some(estimate) = self.overrides.get(&kind) {
            return *estimate;
        }
        match kind {
            PredicateKind::Sender => 0.05,
            PredicateKind::Importance => 0.10,
            PredicateKind::Subject => 0.15,
            PredicateKind::AttachmentType => 0.2,
            PredicateKind::HasAttachment => 0.3,
            PredicateKind::DateRange => 0.3,
            PredicateKind::Unread => 0.4,
            PredicateKind::Read => 0.6,
            PredicateKind::NoAttachment => 0.7,
            PredicateKind::Folder => 0.8,
            PredicateKind::ExcludeSender => 0.95,
            PredicateKind::ExcludeSubject => 0.95,
        }
    }

    /// Estimate for a concrete predicate, adjusted by its value
    pub fn estimate(&self, predicate: &Predicate) -> f64 {
        let base = self.base_estimate(predicate.kind());
        match predicate {
            Predicate::Sender(needle) if needle.contains('@') => base * FULL_ADDRESS_FACTOR,
            Predicate::Subject(needle) | Predicate::ExcludeSubject(needle)
                if needle.chars().count() > LONG_SUBJECT_CHARS =>
            {
                base * LONG_SUBJECT_FACTOR
            }
            _ => base,
        }
    }

    /// Order predicates most selective first. The sort is stable, so equal
    /// estimates keep their declaration order.
    pub fn rank(&self, predicates: Vec<Predicate>) -> Vec<RankedPredicate> {
        let mut ranked: Vec<RankedPredicate> = predicates
            .into_iter()
            .enumerate()
            .map(|(position, predicate)| RankedPredicate {
                selectivity: self.estimate(&predicate),
                predicate,
                position,
            })
            .collect();
        ranked.sort_by(|a, b| a.selectivity.total_cmp(&b.selectivity));
        ranked
    }
}
