//! Stable message sorting
//!
//! Sorting always happens after filtering and before pagination. The sort is
//! stable in both directions so repeated runs over identical input page
//! identically.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::models::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    /// Received timestamp
    #[default]
    Timestamp,
    /// Subject, compared case-insensitively
    Subject,
    /// Sender email address, compared case-insensitively
    Sender,
    /// Importance rank (`High > Normal > Low`)
    Importance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// Sort key plus direction; defaults to newest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Ordering of two messages under this field and direction
    pub fn compare(&self, a: &Message, b: &Message) -> Ordering {
        let ordering = match self.field {
            SortField::Timestamp => a.received_at.cmp(&b.received_at),
            SortField::Subject => cmp_ignore_case(&a.subject, &b.subject),
            SortField::Sender => cmp_ignore_case(&a.from.email, &b.from.email),
            SortField::Importance => a.importance.cmp(&b.importance),
        };
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "timestamp" | "date" | "received" => Ok(SortField::Timestamp),
            "subject" => Ok(SortField::Subject),
            "sender" | "from" => Ok(SortField::Sender),
            "importance" => Ok(SortField::Importance),
            other => Err(format!("unknown sort field '{}'", other)),
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            other => Err(format!("unknown sort direction '{}'", other)),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortField::Timestamp => "timestamp",
            SortField::Subject => "subject",
            SortField::Sender => "sender",
            SortField::Importance => "importance",
        };
        f.write_str(name)
    }
}

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Return a sorted copy of `messages`; the input is left untouched
pub fn sort_messages(messages: &[Message], spec: SortSpec) -> Vec<Message> {
    let mut sorted = messages.to_vec();
    sort_in_place(&mut sorted, spec);
    sorted
}

/// Sort an owned working set in place
pub fn sort_in_place(messages: &mut [Message], spec: SortSpec) {
    messages.sort_by(|a, b| spec.compare(a, b));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmailAddress, Importance};
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap()
    }

    fn msg(id: &str, subject: &str, from: &str, hours: i64, importance: Importance) -> Message {
        Message::builder(id)
            .subject(subject)
            .from(EmailAddress::new(from))
            .received_at(base() + TimeDelta::hours(hours))
            .importance(importance)
            .build()
    }

    fn sample() -> Vec<Message> {
        vec![
            msg("a", "beta", "Carol@x.com", 1, Importance::Normal),
            msg("b", "Alpha", "alice@x.com", 3, Importance::Low),
            msg("c", "alpha", "bob@x.com", 2, Importance::High),
            msg("d", "Gamma", "ALICE@x.com", 3, Importance::Normal),
        ]
    }

    fn ids(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_default_is_newest_first() {
        let sorted = sort_messages(&sample(), SortSpec::default());
        // b and d share a timestamp and keep their input order
        assert_eq!(ids(&sorted), ["b", "d", "c", "a"]);
    }

    #[test]
    fn test_subject_is_case_insensitive_and_stable() {
        let spec = SortSpec::new(SortField::Subject, SortDirection::Ascending);
        assert_eq!(ids(&sort_messages(&sample(), spec)), ["b", "c", "a", "d"]);
    }

    #[test]
    fn test_sender_is_case_insensitive() {
        let spec = SortSpec::new(SortField::Sender, SortDirection::Ascending);
        assert_eq!(ids(&sort_messages(&sample(), spec)), ["b", "d", "c", "a"]);
    }

    #[test]
    fn test_importance_uses_rank_not_name() {
        let spec = SortSpec::new(SortField::Importance, SortDirection::Descending);
        assert_eq!(ids(&sort_messages(&sample(), spec)), ["c", "a", "d", "b"]);
    }

    #[test]
    fn test_sort_is_idempotent() {
        for field in [
            SortField::Timestamp,
            SortField::Subject,
            SortField::Sender,
            SortField::Importance,
        ] {
            for direction in [SortDirection::Ascending, SortDirection::Descending] {
                let spec = SortSpec::new(field, direction);
                let once = sort_messages(&sample(), spec);
                let twice = sort_messages(&once, spec);
                assert_eq!(once, twice, "{field} {direction:?}");
            }
        }
    }

    #[test]
    fn test_input_is_not_mutated() {
        let input = sample();
        let _ = sort_messages(&input, SortSpec::default());
        assert_eq!(ids(&input), ["a", "b", "c", "d"]);
    }

    #[test]
    fn test_parse_field_and_direction() {
        assert_eq!("Subject".parse::<SortField>(), Ok(SortField::Subject));
        assert_eq!("from".parse::<SortField>(), Ok(SortField::Sender));
        assert_eq!("asc".parse::<SortDirection>(), Ok(SortDirection::Ascending));
        assert!("size".parse::<SortField>().is_err());
    }
}
