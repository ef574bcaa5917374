//! CLI argument definitions using clap
//!
//! Commands:
//! - mailq folders
//! - mailq read [--folder <path>] [filters] [view]
//! - mailq find [--folder <path>]... [filters] [view]
//! - mailq open <id>
//! - mailq move <id>... --to <folder>

use clap::{Args, Parser, Subcommand};
use mail::{FilterArgs, SortDirection, SortField};
use std::path::PathBuf;

/// mailq - filter, sort and page through a local mailbox
#[derive(Parser, Debug)]
#[command(name = "mailq")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// SQLite mailbox to open instead of the built-in demo mailbox
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List folders with message and unread counts
    Folders,

    /// Show messages in one folder
    Read {
        /// Folder to read
        #[arg(long, default_value = "Inbox")]
        folder: String,

        #[command(flatten)]
        filters: FilterFlags,

        #[command(flatten)]
        view: ViewFlags,
    },

    /// Search messages across folders
    Find {
        /// Restrict the search to a folder (repeatable)
        #[arg(long = "folder")]
        folders: Vec<String>,

        #[command(flatten)]
        filters: FilterFlags,

        #[command(flatten)]
        view: ViewFlags,
    },

    /// Show one message in full
    Open {
        /// Message identifier
        id: String,
    },

    /// Move messages to another folder
    Move {
        /// Message identifiers
        #[arg(required = true)]
        ids: Vec<String>,

        /// Target folder
        #[arg(long)]
        to: String,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterFlags {
    /// Only messages received at or after this date (7d, 2w, 3M, yesterday, friday, 2025-06-01)
    #[arg(long)]
    pub since: Option<String>,

    /// Only messages received at or before this date
    #[arg(long)]
    pub until: Option<String>,

    /// Only read messages
    #[arg(long, conflicts_with = "unread")]
    pub read: bool,

    /// Only unread messages
    #[arg(long)]
    pub unread: bool,

    /// Only messages with attachments
    #[arg(long, conflicts_with = "no_attachment")]
    pub has_attachment: bool,

    /// Only messages without attachments
    #[arg(long)]
    pub no_attachment: bool,

    /// Only messages with an attachment of this extension (pdf, .xlsx)
    #[arg(long)]
    pub attachment_type: Option<String>,

    /// Importance level: high, normal or low
    #[arg(long)]
    pub importance: Option<String>,

    /// Sender name or address contains this text
    #[arg(long)]
    pub sender: Option<String>,

    /// Subject contains this text
    #[arg(long)]
    pub subject: Option<String>,

    /// Exclude senders containing this text
    #[arg(long)]
    pub not_sender: Option<String>,

    /// Exclude subjects containing this text
    #[arg(long)]
    pub not_subject: Option<String>,
}

impl FilterFlags {
    pub fn into_args(self, folders: Vec<String>) -> FilterArgs {
        FilterArgs {
            since: self.since,
            until: self.until,
            read: self.read,
            unread: self.unread,
            has_attachment: self.has_attachment,
            no_attachment: self.no_attachment,
            attachment_type: self.attachment_type,
            importance: self.importance,
            sender: self.sender,
            subject: self.subject,
            not_sender: self.not_sender,
            not_subject: self.not_subject,
            folders,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ViewFlags {
    /// Sort key: timestamp, subject, sender or importance
    #[arg(long, default_value = "timestamp")]
    pub sort_by: SortField,

    /// Sort direction: asc or desc
    #[arg(long, default_value = "desc")]
    pub order: SortDirection,

    /// Page to show (1-based)
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Messages per page (defaults to the configured page size)
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Stream every result in chunks instead of showing one page
    #[arg(long, conflicts_with_all = ["page", "json"])]
    pub stream: bool,

    /// Messages per streamed chunk (defaults to the configured chunk size)
    #[arg(long, requires = "stream")]
    pub chunk_size: Option<usize>,

    /// Print the page as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_find_parses_filters_and_view() {
        let cli = Cli::try_parse_from([
            "mailq",
            "find",
            "--folder",
            "Inbox",
            "--folder",
            "Custom/Projects",
            "--sender",
            "alice",
            "--unread",
            "--sort-by",
            "importance",
            "--order",
            "asc",
            "--page",
            "2",
        ])
        .unwrap();

        let Command::Find {
            folders,
            filters,
            view,
        } = cli.command
        else {
            panic!("expected find");
        };
        assert_eq!(folders, ["Inbox", "Custom/Projects"]);
        assert_eq!(filters.sender.as_deref(), Some("alice"));
        assert!(filters.unread);
        assert_eq!(view.sort_by, SortField::Importance);
        assert_eq!(view.order, SortDirection::Ascending);
        assert_eq!(view.page, 2);
    }

    #[test]
    fn test_exclusive_flags_conflict() {
        assert!(Cli::try_parse_from(["mailq", "find", "--read", "--unread"]).is_err());
        assert!(
            Cli::try_parse_from(["mailq", "find", "--has-attachment", "--no-attachment"]).is_err()
        );
    }

    #[test]
    fn test_move_requires_ids_and_target() {
        assert!(Cli::try_parse_from(["mailq", "move", "--to", "Archive"]).is_err());
        assert!(Cli::try_parse_from(["mailq", "move", "m1"]).is_err());
        let cli = Cli::try_parse_from(["mailq", "--db", "mail.db", "move", "m1", "m2", "--to", "Archive"])
            .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("mail.db")));
    }
}
