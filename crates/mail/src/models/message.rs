//! Message model: an immutable snapshot of one mail item

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a message as assigned by the mail store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An email address with optional display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Display name (e.g., "Alice Manager")
    pub name: Option<String>,
    /// Email address (e.g., "alice@example.com")
    pub email: String,
}

impl EmailAddress {
    /// Create a new email address with just the email
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }

    /// Create a new email address with a display name
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: email.into(),
        }
    }

    /// Parse an address from a string like "Alice Manager <alice@example.com>"
    pub fn parse(s: &str) -> Self {
        let s = s.trim();

        if let Some(angle_start) = s.rfind('<')
            && let Some(angle_end) = s.rfind('>')
            && angle_start < angle_end
        {
            let name = s[..angle_start].trim().trim_matches('"').trim();
            let email = s[angle_start + 1..angle_end].trim();
            return Self {
                name: (!name.is_empty()).then(|| name.to_string()),
                email: email.to_string(),
            };
        }

        Self::new(s)
    }

    /// Format the address for display
    pub fn display(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", name, self.email),
            None => self.email.clone(),
        }
    }
}

/// Message importance as set by the sender
///
/// Ordered by rank, so `Low < Normal < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Importance {
    Low,
    #[default]
    Normal,
    High,
}

impl Importance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::Low => "Low",
            Importance::Normal => "Normal",
            Importance::High => "High",
        }
    }
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Importance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Importance::High),
            "normal" => Ok(Importance::Normal),
            "low" => Ok(Importance::Low),
            other => Err(format!("unknown importance level '{}'", other)),
        }
    }
}

/// A single email message as materialized from a mail store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Store-assigned identifier
    pub id: MessageId,
    /// Subject line
    pub subject: String,
    /// Sender
    pub from: EmailAddress,
    /// Recipients (To field)
    pub to: Vec<EmailAddress>,
    /// CC recipients
    pub cc: Vec<EmailAddress>,
    /// BCC recipients
    pub bcc: Vec<EmailAddress>,
    /// When the message was received
    pub received_at: DateTime<Utc>,
    /// Whether the message has been read
    pub is_read: bool,
    /// Whether the message carries attachments
    pub has_attachments: bool,
    /// Number of attachments
    pub attachment_count: u32,
    /// Attachment file names, used for extension matching
    pub attachment_names: Vec<String>,
    /// Importance flag
    pub importance: Importance,
    /// Folder path (e.g., "Inbox", "Custom/Projects")
    pub folder_path: String,
    /// Plain text body
    pub body_text: String,
    /// HTML body, if any
    pub body_html: Option<String>,
}

impl Message {
    /// Create a new message builder
    pub fn builder(id: impl Into<MessageId>) -> MessageBuilder {
        MessageBuilder::new(id.into())
    }

    /// Whether any attachment has the given extension (without the dot).
    /// The comparison ignores case.
    pub fn has_attachment_with_extension(&self, extension: &str) -> bool {
        self.attachment_names.iter().any(|name| {
            name.rsplit_once('.')
                .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(extension))
        })
    }
}

/// Builder for creating Message instances
pub struct MessageBuilder {
    id: MessageId,
    subject: String,
    from: Option<EmailAddress>,
    to: Vec<EmailAddress>,
    cc: Vec<EmailAddress>,
    bcc: Vec<EmailAddress>,
    received_at: Option<DateTime<Utc>>,
    is_read: bool,
    attachment_names: Vec<String>,
    attachment_count: Option<u32>,
    importance: Importance,
    folder_path: String,
    body_text: String,
    body_html: Option<String>,
}

impl MessageBuilder {
    fn new(id: MessageId) -> Self {
        Self {
            id,
            subject: String::new(),
            from: None,
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            received_at: None,
            is_read: false,
            attachment_names: Vec::new(),
            attachment_count: None,
            importance: Importance::Normal,
            folder_path: "Inbox".to_string(),
            body_text: String::new(),
            body_html: None,
        }
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn from(mut self, from: EmailAddress) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to(mut self, to: Vec<EmailAddress>) -> Self {
        self.to = to;
        self
    }

    pub fn cc(mut self, cc: Vec<EmailAddress>) -> Self {
        self.cc = cc;
        self
    }

    pub fn bcc(mut self, bcc: Vec<EmailAddress>) -> Self {
        self.bcc = bcc;
        self
    }

    pub fn received_at(mut self, received_at: DateTime<Utc>) -> Self {
        self.received_at = Some(received_at);
        self
    }

    pub fn read(mut self, is_read: bool) -> Self {
        self.is_read = is_read;
        self
    }

    /// Attach files by name. The attachment count follows the list unless
    /// set explicitly with [`MessageBuilder::attachment_count`].
    pub fn attachments(mut self, names: Vec<String>) -> Self {
        self.attachment_names = names;
        self
    }

    pub fn attachment_count(mut self, count: u32) -> Self {
        self.attachment_count = Some(count);
        self
    }

    pub fn importance(mut self, importance: Importance) -> Self {
        self.importance = importance;
        self
    }

    pub fn folder(mut self, folder_path: impl Into<String>) -> Self {
        self.folder_path = folder_path.into();
        self
    }

    pub fn body_text(mut self, body_text: impl Into<String>) -> Self {
        self.body_text = body_text.into();
        self
    }

    pub fn body_html(mut self, body_html: Option<String>) -> Self {
        self.body_html = body_html;
        self
    }

    pub fn build(self) -> Message {
        let attachment_count = self
            .attachment_count
            .unwrap_or(self.attachment_names.len() as u32);
        Message {
            id: self.id,
            subject: self.subject,
            from: self
                .from
                .unwrap_or_else(|| EmailAddress::new("unknown@unknown.invalid")),
            to: self.to,
            cc: self.cc,
            bcc: self.bcc,
            received_at: self.received_at.unwrap_or_else(Utc::now),
            is_read: self.is_read,
            has_attachments: attachment_count > 0,
            attachment_count,
            attachment_names: self.attachment_names,
            importance: self.importance,
            folder_path: self.folder_path,
            body_text: self.body_text,
            body_html: self.body_html,
        }
    }
}
