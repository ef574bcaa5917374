//! Predicate evaluation over message sequences
//!
//! Criteria are expanded into individual [`Predicate`]s, ranked by estimated
//! selectivity, and applied one after another to a shrinking working set.
//! Evaluation never mutates the input slice; survivors are cloned out.

use std::fmt;

use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;

use super::criteria::{AttachmentPresence, FilterCriteria, ReadStatus};
use super::selectivity::SelectivityEstimator;
use crate::models::{Importance, Message};

/// Predicate category, used as the selectivity lookup key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PredicateKind {
    Sender,
    Importance,
    Subject,
    AttachmentType,
    HasAttachment,
    DateRange,
    Unread,
    Read,
    NoAttachment,
    Folder,
    ExcludeSender,
    ExcludeSubject,
}

impl PredicateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredicateKind::Sender => "sender",
            PredicateKind::Importance => "importance",
            PredicateKind::Subject => "subject",
            PredicateKind::AttachmentType => "attachment-type",
            PredicateKind::HasAttachment => "has-attachment",
            PredicateKind::DateRange => "date-range",
            PredicateKind::Unread => "unread",
            PredicateKind::Read => "read",
            PredicateKind::NoAttachment => "no-attachment",
            PredicateKind::Folder => "folder",
            PredicateKind::ExcludeSender => "exclude-sender",
            PredicateKind::ExcludeSubject => "exclude-subject",
        }
    }
}

impl fmt::Display for PredicateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One filter condition. Text needles are already lowercased.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Sender(String),
    Importance(Importance),
    Subject(String),
    AttachmentType(String),
    Attachments(AttachmentPresence),
    DateRange {
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    },
    ReadStatus(ReadStatus),
    Folder(Vec<String>),
    ExcludeSender(String),
    ExcludeSubject(String),
}

impl Predicate {
    pub fn kind(&self) -> PredicateKind {
        match self {
            Predicate::Sender(_) => PredicateKind::Sender,
            Predicate::Importance(_) => PredicateKind::Importance,
            Predicate::Subject(_) => PredicateKind::Subject,
            Predicate::AttachmentType(_) => PredicateKind::AttachmentType,
            Predicate::Attachments(AttachmentPresence::With) => PredicateKind::HasAttachment,
            Predicate::Attachments(AttachmentPresence::Without) => PredicateKind::NoAttachment,
            Predicate::DateRange { .. } => PredicateKind::DateRange,
            Predicate::ReadStatus(ReadStatus::Unread) => PredicateKind::Unread,
            Predicate::ReadStatus(ReadStatus::Read) => PredicateKind::Read,
            Predicate::Folder(_) => PredicateKind::Folder,
            Predicate::ExcludeSender(_) => PredicateKind::ExcludeSender,
            Predicate::ExcludeSubject(_) => PredicateKind::ExcludeSubject,
        }
    }

    /// Whether a single message satisfies this predicate
    pub fn matches(&self, message: &Message) -> bool {
        match self {
            Predicate::Sender(needle) => sender_matches(message, needle),
            Predicate::Importance(level) => message.importance == *level,
            Predicate::Subject(needle) => contains_ignore_case(&message.subject, needle),
            Predicate::AttachmentType(ext) => message.has_attachment_with_extension(ext),
            Predicate::Attachments(AttachmentPresence::With) => message.has_attachments,
            Predicate::Attachments(AttachmentPresence::Without) => !message.has_attachments,
            Predicate::DateRange { since, until } => {
                since.is_none_or(|since| message.received_at >= since)
                    && until.is_none_or(|until| message.received_at <= until)
            }
            Predicate::ReadStatus(ReadStatus::Read) => message.is_read,
            Predicate::ReadStatus(ReadStatus::Unread) => !message.is_read,
            Predicate::Folder(folders) => folders
                .iter()
                .any(|f| f.eq_ignore_ascii_case(&message.folder_path)),
            Predicate::ExcludeSender(needle) => !sender_matches(message, needle),
            Predicate::ExcludeSubject(needle) => !contains_ignore_case(&message.subject, needle),
        }
    }

    /// Messages from `messages` that satisfy this predicate, in input order
    pub fn apply(&self, messages: &[Message]) -> Vec<Message> {
        messages.iter().filter(|m| self.matches(m)).cloned().collect()
    }
}

fn contains_ignore_case(haystack: &str, lowered_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowered_needle)
}

fn sender_matches(message: &Message, lowered_needle: &str) -> bool {
    contains_ignore_case(&message.from.email, lowered_needle)
        || message
            .from
            .name
            .as_deref()
            .is_some_and(|name| contains_ignore_case(name, lowered_needle))
}

impl FilterCriteria {
    /// Expand the criteria into predicates, in declaration order
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        if let Some(sender) = self.sender() {
            predicates.push(Predicate::Sender(sender.to_string()));
        }
        if let Some(importance) = self.importance() {
            predicates.push(Predicate::Importance(importance));
        }
        if let Some(subject) = self.subject() {
            predicates.push(Predicate::Subject(subject.to_string()));
        }
        if let Some(ext) = self.attachment_type() {
            predicates.push(Predicate::AttachmentType(ext.to_string()));
        }
        if let Some(presence) = self.attachments() {
            predicates.push(Predicate::Attachments(presence));
        }
        if self.since().is_some() || self.until().is_some() {
            predicates.push(Predicate::DateRange {
                since: self.since(),
                until: self.until(),
            });
        }
        if let Some(status) = self.read_status() {
            predicates.push(Predicate::ReadStatus(status));
        }
        if !self.folders().is_empty() {
            predicates.push(Predicate::Folder(self.folders().to_vec()));
        }
        if let Some(sender) = self.exclude_sender() {
            predicates.push(Predicate::ExcludeSender(sender.to_string()));
        }
        if let Some(subject) = self.exclude_subject() {
            predicates.push(Predicate::ExcludeSubject(subject.to_string()));
        }
        predicates
    }
}

/// Record of one applied predicate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterStep {
    pub kind: PredicateKind,
    pub selectivity: f64,
    pub input: usize,
    pub output: usize,
}

/// Result of evaluating criteria against a message sequence
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    /// Surviving messages, in input order
    pub messages: Vec<Message>,
    /// Applied predicates in evaluation order
    pub steps: Vec<FilterStep>,
    /// Total predicate evaluations performed
    pub comparisons: usize,
    /// Whether evaluation stopped early on an empty working set
    pub short_circuited: bool,
}

/// Filter `messages` by `criteria` using the default selectivity table
pub fn evaluate(messages: &[Message], criteria: &FilterCriteria) -> Vec<Message> {
    evaluate_with(messages, criteria, &SelectivityEstimator::default()).messages
}

/// Filter `messages` by `criteria`, most selective predicate first
pub fn evaluate_with(
    messages: &[Message],
    criteria: &FilterCriteria,
    estimator: &SelectivityEstimator,
) -> FilterOutcome {
    let ranked = estimator.rank(criteria.predicates());
    let ordered: Vec<(Predicate, f64)> = ranked
        .into_iter()
        .map(|r| (r.predicate, r.selectivity))
        .collect();
    run(messages, ordered)
}

/// Filter `messages` applying `predicates` exactly in the given order
pub fn evaluate_in_order(messages: &[Message], predicates: &[Predicate]) -> FilterOutcome {
    let estimator = SelectivityEstimator::default();
    let ordered = predicates
        .iter()
        .map(|p| (p.clone(), estimator.estimate(p)))
        .collect();
    run(messages, ordered)
}

fn run(messages: &[Message], ordered: Vec<(Predicate, f64)>) -> FilterOutcome {
    let total = ordered.len();
    let mut steps = Vec::with_capacity(total);
    let mut comparisons = 0;
    let mut survivors: Option<Vec<Message>> = None;

    for (predicate, selectivity) in ordered {
        let input = survivors.as_ref().map_or(messages.len(), Vec::len);
        if input == 0 {
            break;
        }
        comparisons += input;

        let next = match survivors.take() {
            None => predicate.apply(messages),
            Some(mut current) => {
                current.retain(|m| predicate.matches(m));
                current
            }
        };

        debug!(
            "filter {} (selectivity {:.3}): {} -> {}",
            predicate.kind(),
            selectivity,
            input,
            next.len()
        );
        steps.push(FilterStep {
            kind: predicate.kind(),
            selectivity,
            input,
            output: next.len(),
        });
        survivors = Some(next);
    }

    let short_circuited = steps.len() < total;
    if short_circuited {
        debug!(
            "filter short-circuited after {} of {} predicates",
            steps.len(),
            total
        );
    }

    FilterOutcome {
        messages: survivors.unwrap_or_else(|| messages.to_vec()),
        steps,
        comparisons,
        short_circuited,
    }
}
