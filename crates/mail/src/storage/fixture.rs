//! Demo mailbox used by the in-memory store
//!
//! Timestamps are relative to the moment the fixture is built so relative
//! date filters (`--since 2d`) behave sensibly against it.

use chrono::{DateTime, Duration, Utc};

use crate::models::{EmailAddress, Folder, Importance, Message};

pub(crate) fn demo_folders() -> Vec<Folder> {
    ["Inbox", "Sent Items", "Drafts", "Deleted Items", "Custom/Projects", "Custom/Archive"]
        .into_iter()
        .map(Folder::new)
        .collect()
}

struct Seed {
    id: &'static str,
    folder: &'static str,
    subject: &'static str,
    from: (&'static str, &'static str),
    to: &'static [&'static str],
    age: Duration,
    read: bool,
    importance: Importance,
    attachments: &'static [&'static str],
    body: &'static str,
}

const ME: (&str, &str) = ("Current User", "user@company.com");

fn seeds() -> Vec<Seed> {
    vec![
        Seed {
            id: "inbox-001",
            folder: "Inbox",
            subject: "Weekly Team Meeting",
            from: ("Alice Manager", "manager@company.com"),
            to: &["user@company.com"],
            age: Duration::hours(2),
            read: false,
            importance: Importance::High,
            attachments: &[],
            body: "Hi team, our weekly meeting is scheduled for Friday at 2 PM.",
        },
        Seed {
            id: "inbox-002",
            folder: "Inbox",
            subject: "Project Update Required",
            from: ("Bob ProjectManager", "pm@company.com"),
            to: &["user@company.com", "team@company.com"],
            age: Duration::days(1),
            read: true,
            importance: Importance::Normal,
            attachments: &["status.xlsx", "timeline.pdf"],
            body: "Please provide an update on the current project status.",
        },
        Seed {
            id: "inbox-003",
            folder: "Inbox",
            subject: "System Maintenance Notice",
            from: ("IT Support", "it@company.com"),
            to: &["all@company.com"],
            age: Duration::days(2),
            read: true,
            importance: Importance::Low,
            attachments: &[],
            body: "The system will be down for maintenance this weekend.",
        },
        Seed {
            id: "inbox-004",
            folder: "Inbox",
            subject: "Invoice #4411",
            from: ("Billing", "billing@vendor.example"),
            to: &["user@company.com"],
            age: Duration::days(4),
            read: false,
            importance: Importance::Normal,
            attachments: &["invoice-4411.PDF"],
            body: "Your invoice for last month is attached.",
        },
        Seed {
            id: "inbox-005",
            folder: "Inbox",
            subject: "Lunch on Thursday?",
            from: ("Alice Manager", "manager@company.com"),
            to: &["user@company.com"],
            age: Duration::days(9),
            read: true,
            importance: Importance::Normal,
            attachments: &[],
            body: "Want to grab lunch on Thursday?",
        },
        Seed {
            id: "inbox-006",
            folder: "Inbox",
            subject: "URGENT: password expires today",
            from: ("Security Bot", "no-reply@phish.example"),
            to: &["user@company.com"],
            age: Duration::days(20),
            read: false,
            importance: Importance::High,
            attachments: &[],
            body: "Click here to keep your password.",
        },
        Seed {
            id: "sent-001",
            folder: "Sent Items",
            subject: "Re: Project Update Required",
            from: ME,
            to: &["pm@company.com"],
            age: Duration::hours(6),
            read: true,
            importance: Importance::Normal,
            attachments: &[],
            body: "The project is on track and will be completed by Friday.",
        },
        Seed {
            id: "sent-002",
            folder: "Sent Items",
            subject: "Meeting Notes",
            from: ME,
            to: &["team@company.com"],
            age: Duration::days(3),
            read: true,
            importance: Importance::Normal,
            attachments: &["notes.docx"],
            body: "Here are the notes from yesterday's meeting.",
        },
        Seed {
            id: "draft-001",
            folder: "Drafts",
            subject: "Vacation Request",
            from: ME,
            to: &["hr@company.com"],
            age: Duration::hours(12),
            read: false,
            importance: Importance::Normal,
            attachments: &[],
            body: "I would like to request vacation time for next month.",
        },
        Seed {
            id: "deleted-001",
            folder: "Deleted Items",
            subject: "Newsletter: October edition",
            from: ("Newsletter", "news@updates.example"),
            to: &["user@company.com"],
            age: Duration::days(30),
            read: true,
            importance: Importance::Low,
            attachments: &[],
            body: "This month in the company...",
        },
        Seed {
            id: "projects-001",
            folder: "Custom/Projects",
            subject: "Design review: storage layer",
            from: ("Carol Architect", "carol@company.com"),
            to: &["user@company.com", "team@company.com"],
            age: Duration::days(5),
            read: false,
            importance: Importance::High,
            attachments: &["storage-design.pdf", "diagram.png"],
            body: "Draft design attached, comments welcome before Monday.",
        },
        Seed {
            id: "projects-002",
            folder: "Custom/Projects",
            subject: "Budget approval",
            from: ("Alice Manager", "manager@company.com"),
            to: &["user@company.com"],
            age: Duration::days(15),
            read: true,
            importance: Importance::Normal,
            attachments: &["budget.xlsx"],
            body: "The budget for Q3 has been approved.",
        },
        Seed {
            id: "archive-001",
            folder: "Custom/Archive",
            subject: "Welcome aboard",
            from: ("HR Team", "hr@company.com"),
            to: &["user@company.com"],
            age: Duration::days(400),
            read: true,
            importance: Importance::Normal,
            attachments: &["handbook.pdf"],
            body: "Welcome to the company! Your handbook is attached.",
        },
    ]
}

pub(crate) fn demo_messages(now: DateTime<Utc>) -> Vec<Message> {
    seeds()
        .into_iter()
        .map(|seed| {
            Message::builder(seed.id)
                .folder(seed.folder)
                .subject(seed.subject)
                .from(EmailAddress::with_name(seed.from.0, seed.from.1))
                .to(seed.to.iter().map(|addr| EmailAddress::new(*addr)).collect())
                .received_at(now - seed.age)
                .read(seed.read)
                .importance(seed.importance)
                .attachments(seed.attachments.iter().map(|name| name.to_string()).collect())
                .body_text(seed.body)
                .build()
        })
        .collect()
}
