//! Filter criteria construction
//!
//! Raw caller input ([`FilterArgs`]) is normalized once into an immutable
//! [`FilterCriteria`]. Every validation happens here, before any message is
//! looked at: date expressions are resolved, the range is checked, importance
//! is parsed, and mutually exclusive flags are rejected.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::dates::{parse_date_expression_at, validate_date_range};
use crate::error::QueryError;
use crate::models::Importance;

/// Read-status predicate value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadStatus {
    Read,
    Unread,
}

/// Attachment-presence predicate value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentPresence {
    With,
    Without,
}

/// Filter arguments as they arrive from the command surface
#[derive(Debug, Clone, Default)]
pub struct FilterArgs {
    pub since: Option<String>,
    pub until: Option<String>,
    pub read: bool,
    pub unread: bool,
    pub has_attachment: bool,
    pub no_attachment: bool,
    pub attachment_type: Option<String>,
    pub importance: Option<String>,
    pub sender: Option<String>,
    pub subject: Option<String>,
    pub not_sender: Option<String>,
    pub not_subject: Option<String>,
    pub folders: Vec<String>,
}

/// Immutable, validated set of filter predicates.
///
/// Text needles are stored trimmed and lowercased, which is also the form
/// written to the audit log.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterCriteria {
    #[serde(skip_serializing_if = "Option::is_none")]
    since: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    read_status: Option<ReadStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachments: Option<AttachmentPresence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachment_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    importance: Option<Importance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exclude_sender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exclude_subject: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    folders: Vec<String>,
}

impl FilterCriteria {
    /// Start building criteria programmatically
    pub fn builder() -> CriteriaBuilder {
        CriteriaBuilder::default()
    }

    /// Criteria that match every message
    pub fn match_all() -> Self {
        Self::default()
    }

    pub fn since(&self) -> Option<DateTime<Utc>> {
        self.since
    }

    pub fn until(&self) -> Option<DateTime<Utc>> {
        self.until
    }

    pub fn read_status(&self) -> Option<ReadStatus> {
        self.read_status
    }

    pub fn attachments(&self) -> Option<AttachmentPresence> {
        self.attachments
    }

    pub fn attachment_type(&self) -> Option<&str> {
        self.attachment_type.as_deref()
    }

    pub fn importance(&self) -> Option<Importance> {
        self.importance
    }

    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn exclude_sender(&self) -> Option<&str> {
        self.exclude_sender.as_deref()
    }

    pub fn exclude_subject(&self) -> Option<&str> {
        self.exclude_subject.as_deref()
    }

    pub fn folders(&self) -> &[String] {
        &self.folders
    }

    /// True when no predicate is active
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Build criteria from raw arguments, resolving relative dates against now
pub fn build_criteria(args: &FilterArgs) -> Result<FilterCriteria, QueryError> {
    build_criteria_at(args, Utc::now())
}

/// Build criteria from raw arguments, resolving relative dates against `now`
pub fn build_criteria_at(
    args: &FilterArgs,
    now: DateTime<Utc>,
) -> Result<FilterCriteria, QueryError> {
    let mut builder = FilterCriteria::builder();

    if let Some(since) = non_blank(&args.since) {
        builder = builder.since(parse_date_expression_at(since, now)?);
    }
    if let Some(until) = non_blank(&args.until) {
        builder = builder.until(parse_date_expression_at(until, now)?);
    }

    match (args.read, args.unread) {
        (true, true) => {
            return Err(QueryError::invalid_argument(
                "read status",
                "--read and --unread cannot be combined",
            ));
        }
        (true, false) => builder = builder.read_status(ReadStatus::Read),
        (false, true) => builder = builder.read_status(ReadStatus::Unread),
        (false, false) => {}
    }

    match (args.has_attachment, args.no_attachment) {
        (true, true) => {
            return Err(QueryError::invalid_argument(
                "attachment filter",
                "--has-attachment and --no-attachment cannot be combined",
            ));
        }
        (true, false) => builder = builder.attachments(AttachmentPresence::With),
        (false, true) => builder = builder.attachments(AttachmentPresence::Without),
        (false, false) => {}
    }

    if let Some(importance) = non_blank(&args.importance) {
        let level = importance
            .parse::<Importance>()
            .map_err(|message| QueryError::invalid_argument("importance", message))?;
        builder = builder.importance(level);
    }

    if let Some(ext) = non_blank(&args.attachment_type) {
        builder = builder.attachment_type(ext);
    }
    if let Some(sender) = non_blank(&args.sender) {
        builder = builder.sender(sender);
    }
    if let Some(subject) = non_blank(&args.subject) {
        builder = builder.subject(subject);
    }
    if let Some(sender) = non_blank(&args.not_sender) {
        builder = builder.exclude_sender(sender);
    }
    if let Some(subject) = non_blank(&args.not_subject) {
        builder = builder.exclude_subject(subject);
    }

    builder.folders(args.folders.iter().cloned()).build()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn needle(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_lowercase())
}

/// Typed builder for [`FilterCriteria`]; validation runs in [`CriteriaBuilder::build`]
#[derive(Debug, Default)]
pub struct CriteriaBuilder {
    criteria: FilterCriteria,
}

impl CriteriaBuilder {
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.criteria.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.criteria.until = Some(until);
        self
    }

    pub fn read_status(mut self, status: ReadStatus) -> Self {
        self.criteria.read_status = Some(status);
        self
    }

    pub fn attachments(mut self, presence: AttachmentPresence) -> Self {
        self.criteria.attachments = Some(presence);
        self
    }

    /// Attachment extension, with or without the leading dot
    pub fn attachment_type(mut self, extension: &str) -> Self {
        self.criteria.attachment_type = needle(extension.trim().trim_start_matches('.'));
        self
    }

    pub fn importance(mut self, importance: Importance) -> Self {
        self.criteria.importance = Some(importance);
        self
    }

    pub fn sender(mut self, sender: &str) -> Self {
        self.criteria.sender = needle(sender);
        self
    }

    pub fn subject(mut self, subject: &str) -> Self {
        self.criteria.subject = needle(subject);
        self
    }

    pub fn exclude_sender(mut self, sender: &str) -> Self {
        self.criteria.exclude_sender = needle(sender);
        self
    }

    pub fn exclude_subject(mut self, subject: &str) -> Self {
        self.criteria.exclude_subject = needle(subject);
        self
    }

    pub fn folders<I, S>(mut self, folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.criteria.folders = folders
            .into_iter()
            .map(|f| f.into().trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        self
    }

    pub fn build(self) -> Result<FilterCriteria, QueryError> {
        validate_date_range(self.criteria.since, self.criteria.until)?;
        Ok(self.criteria)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 31, 15, 30, 0).unwrap()
    }

    #[test]
    fn test_empty_args_build_empty_criteria() {
        let criteria = build_criteria_at(&FilterArgs::default(), now()).unwrap();
        assert!(criteria.is_empty());
        assert_eq!(criteria, FilterCriteria::match_all());
    }

    #[test]
    fn test_full_args_are_normalized() {
        let args = FilterArgs {
            since: Some("7d".to_string()),
            until: Some("2025-03-31".to_string()),
            unread: true,
            has_attachment: true,
            attachment_type: Some(".PDF".to_string()),
            importance: Some("HIGH".to_string()),
            sender: Some("  Alice ".to_string()),
            subject: Some("Report".to_string()),
            not_sender: Some("Spam@Example.com".to_string()),
            not_subject: Some("URGENT".to_string()),
            folders: vec!["Inbox".to_string(), " ".to_string()],
            ..Default::default()
        };

        let criteria = build_criteria_at(&args, now()).unwrap();
        assert_eq!(criteria.since(), Some(now() - chrono::TimeDelta::days(7)));
        assert_eq!(
            criteria.until(),
            Some(Utc.with_ymd_and_hms(2025, 3, 31, 0, 0, 0).unwrap())
        );
        assert_eq!(criteria.read_status(), Some(ReadStatus::Unread));
        assert_eq!(criteria.attachments(), Some(AttachmentPresence::With));
        assert_eq!(criteria.attachment_type(), Some("pdf"));
        assert_eq!(criteria.importance(), Some(Importance::High));
        assert_eq!(criteria.sender(), Some("alice"));
        assert_eq!(criteria.subject(), Some("report"));
        assert_eq!(criteria.exclude_sender(), Some("spam@example.com"));
        assert_eq!(criteria.exclude_subject(), Some("urgent"));
        assert_eq!(criteria.folders(), ["Inbox".to_string()]);
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let args = FilterArgs {
            sender: Some("   ".to_string()),
            since: Some("".to_string()),
            ..Default::default()
        };
        assert!(build_criteria_at(&args, now()).unwrap().is_empty());
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let args = FilterArgs {
            since: Some("tomorrow".to_string()),
            until: Some("yesterday".to_string()),
            ..Default::default()
        };
        let err = build_criteria_at(&args, now()).unwrap_err();
        assert!(matches!(err, QueryError::InvalidRange { .. }));
    }

    #[test]
    fn test_bad_date_is_rejected() {
        let args = FilterArgs {
            until: Some("someday".to_string()),
            ..Default::default()
        };
        let err = build_criteria_at(&args, now()).unwrap_err();
        assert!(matches!(err, QueryError::InvalidDateFormat { ref input } if input == "someday"));
    }

    #[test]
    fn test_mutually_exclusive_flags_are_rejected() {
        let both_read = FilterArgs {
            read: true,
            unread: true,
            ..Default::default()
        };
        assert!(matches!(
            build_criteria_at(&both_read, now()),
            Err(QueryError::InvalidArgument { field: "read status", .. })
        ));

        let both_attachment = FilterArgs {
            has_attachment: true,
            no_attachment: true,
            ..Default::default()
        };
        assert!(matches!(
            build_criteria_at(&both_attachment, now()),
            Err(QueryError::InvalidArgument { field: "attachment filter", .. })
        ));
    }

    #[test]
    fn test_unknown_importance_is_rejected() {
        let args = FilterArgs {
            importance: Some("urgent".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            build_criteria_at(&args, now()),
            Err(QueryError::InvalidArgument { field: "importance", .. })
        ));
    }

    #[test]
    fn test_criteria_serialize_only_active_fields() {
        let criteria = FilterCriteria::builder()
            .sender("Alice")
            .read_status(ReadStatus::Unread)
            .build()
            .unwrap();
        let json = serde_json::to_value(&criteria).unwrap();
        assert_eq!(json, serde_json::json!({"read_status": "unread", "sender": "alice"}));
    }
}
