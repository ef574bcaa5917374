//! SQLite-based mail storage
//!
//! The persistent binding: folders, messages, recipients and attachment
//! names live in one database file. Folder counts are derived by query.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use rusqlite_migration::{M, Migrations};

use super::traits::MailStore;
use crate::models::{EmailAddress, Folder, Importance, Message, MessageId};

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(
        r#"
        CREATE TABLE folders (
            path TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            position INTEGER NOT NULL
        );

        CREATE TABLE messages (
            id TEXT PRIMARY KEY,
            folder_path TEXT NOT NULL,
            subject TEXT NOT NULL,
            from_name TEXT,
            from_email TEXT NOT NULL,
            received_at TEXT NOT NULL,
            is_read INTEGER NOT NULL DEFAULT 0,
            attachment_count INTEGER NOT NULL DEFAULT 0,
            importance TEXT NOT NULL DEFAULT 'Normal',
            body_text TEXT NOT NULL,
            body_html TEXT,
            FOREIGN KEY (folder_path) REFERENCES folders(path)
        );

        CREATE INDEX idx_messages_folder_received
            ON messages(folder_path, received_at DESC);

        CREATE TABLE message_recipients (
            message_id TEXT NOT NULL,
            recipient_type TEXT NOT NULL,
            name TEXT,
            email TEXT NOT NULL,
            position INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (message_id, recipient_type, position),
            FOREIGN KEY (message_id) REFERENCES messages(id) ON DELETE CASCADE
        );

        CREATE TABLE message_attachments (
            message_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            name TEXT NOT NULL,
            PRIMARY KEY (message_id, position),
            FOREIGN KEY (message_id) REFERENCES messages(id) ON DELETE CASCADE
        );
        "#,
    )])
}

const MESSAGE_COLUMNS: &str = "id, folder_path, subject, from_name, from_email, received_at, \
     is_read, attachment_count, importance, body_text, body_html";

/// Message columns as read from the `messages` table, before recipients
/// and attachments are joined in
struct MessageRow {
    id: String,
    folder_path: String,
    subject: String,
    from_name: Option<String>,
    from_email: String,
    received_at: String,
    is_read: bool,
    attachment_count: u32,
    importance: String,
    body_text: String,
    body_html: Option<String>,
}

impl MessageRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            folder_path: row.get(1)?,
            subject: row.get(2)?,
            from_name: row.get(3)?,
            from_email: row.get(4)?,
            received_at: row.get(5)?,
            is_read: row.get(6)?,
            attachment_count: row.get(7)?,
            importance: row.get(8)?,
            body_text: row.get(9)?,
            body_html: row.get(10)?,
        })
    }
}

/// SQLite-based mail storage
pub struct SqliteMailStore {
    conn: Mutex<Connection>,
}

impl SqliteMailStore {
    /// Open (or create) a store at `db_path` and bring its schema up to date
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;

        // WAL keeps readers unblocked while a move is written; foreign keys
        // are needed for the cascading deletes on recipients/attachments.
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            "#,
        )?;

        migrations()
            .to_latest(&mut conn)
            .context("Failed to run database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn load_recipients(
        conn: &Connection,
        message_id: &str,
        recipient_type: &str,
    ) -> Result<Vec<EmailAddress>> {
        let mut stmt = conn.prepare_cached(
            "SELECT name, email FROM message_recipients
             WHERE message_id = ? AND recipient_type = ?
             ORDER BY position",
        )?;

        let recipients = stmt
            .query_map(params![message_id, recipient_type], |row| {
                Ok(EmailAddress {
                    name: row.get(0)?,
                    email: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(recipients)
    }

    fn load_attachments(conn: &Connection, message_id: &str) -> Result<Vec<String>> {
        let mut stmt = conn.prepare_cached(
            "SELECT name FROM message_attachments WHERE message_id = ? ORDER BY position",
        )?;
        let names = stmt
            .query_map([message_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn save_recipients(
        conn: &Connection,
        message_id: &str,
        recipient_type: &str,
        recipients: &[EmailAddress],
    ) -> Result<()> {
        let mut stmt = conn.prepare_cached(
            "INSERT INTO message_recipients (message_id, recipient_type, name, email, position)
             VALUES (?, ?, ?, ?, ?)",
        )?;

        for (i, addr) in recipients.iter().enumerate() {
            stmt.execute(params![message_id, recipient_type, addr.name, addr.email, i as i64])?;
        }

        Ok(())
    }

    fn ensure_folder(conn: &Connection, folder: &Folder) -> Result<()> {
        conn.execute(
            "INSERT INTO folders (path, name, position)
             VALUES (?, ?, (SELECT COALESCE(MAX(position), -1) + 1 FROM folders))
             ON CONFLICT(path) DO NOTHING",
            params![folder.path, folder.name],
        )?;
        Ok(())
    }

    fn hydrate(conn: &Connection, row: MessageRow) -> Result<Message> {
        let received_at = DateTime::parse_from_rfc3339(&row.received_at)
            .map(|dt| dt.with_timezone(&Utc))
            .with_context(|| format!("Corrupt received_at for message {}", row.id))?;
        let importance = row
            .importance
            .parse::<Importance>()
            .map_err(|e| anyhow::anyhow!("Corrupt importance for message {}: {}", row.id, e))?;

        Ok(Message {
            to: Self::load_recipients(conn, &row.id, "to")?,
            cc: Self::load_recipients(conn, &row.id, "cc")?,
            bcc: Self::load_recipients(conn, &row.id, "bcc")?,
            attachment_names: Self::load_attachments(conn, &row.id)?,
            from: EmailAddress {
                name: row.from_name,
                email: row.from_email,
            },
            id: MessageId::new(row.id),
            subject: row.subject,
            received_at,
            is_read: row.is_read,
            has_attachments: row.attachment_count > 0,
            attachment_count: row.attachment_count,
            importance,
            folder_path: row.folder_path,
            body_text: row.body_text,
            body_html: row.body_html,
        })
    }

    fn query_messages(
        conn: &Connection,
        sql: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Message>> {
        let rows = {
            let mut stmt = conn.prepare(sql)?;
            stmt.query_map(args, MessageRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?
        };
        rows.into_iter().map(|row| Self::hydrate(conn, row)).collect()
    }

    fn folder_exists(conn: &Connection, path: &str) -> Result<bool> {
        let exists = conn
            .query_row("SELECT 1 FROM folders WHERE path = ?", [path], |_| Ok(()))
            .optional()?
            .is_some();
        Ok(exists)
    }
}

impl MailStore for SqliteMailStore {
    fn list_folders(&self) -> Result<Vec<Folder>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT f.path, f.name,
                    COUNT(m.id),
                    COALESCE(SUM(CASE WHEN m.is_read = 0 THEN 1 ELSE 0 END), 0)
             FROM folders f
             LEFT JOIN messages m ON m.folder_path = f.path
             GROUP BY f.path
             ORDER BY f.position",
        )?;

        let folders = stmt
            .query_map([], |row| {
                Ok(Folder {
                    path: row.get(0)?,
                    name: row.get(1)?,
                    message_count: row.get::<_, i64>(2)? as usize,
                    unread_count: row.get::<_, i64>(3)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(folders)
    }

    fn get_folder(&self, path: &str) -> Result<Option<Folder>> {
        Ok(self.list_folders()?.into_iter().find(|f| f.path == path))
    }

    fn upsert_folder(&self, folder: Folder) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        Self::ensure_folder(&conn, &folder)
    }

    fn upsert_message(&self, message: Message) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        Self::ensure_folder(&tx, &Folder::new(message.folder_path.clone()))?;

        // Children are rewritten wholesale on every upsert
        tx.execute(
            "DELETE FROM message_recipients WHERE message_id = ?",
            [message.id.as_str()],
        )?;
        tx.execute(
            "DELETE FROM message_attachments WHERE message_id = ?",
            [message.id.as_str()],
        )?;

        tx.execute(
            "INSERT INTO messages
             (id, folder_path, subject, from_name, from_email, received_at,
              is_read, attachment_count, importance, body_text, body_html)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                folder_path = excluded.folder_path,
                subject = excluded.subject,
                from_name = excluded.from_name,
                from_email = excluded.from_email,
                received_at = excluded.received_at,
                is_read = excluded.is_read,
                attachment_count = excluded.attachment_count,
                importance = excluded.importance,
                body_text = excluded.body_text,
                body_html = excluded.body_html",
            params![
                message.id.as_str(),
                message.folder_path,
                message.subject,
                message.from.name,
                message.from.email,
                message
                    .received_at
                    .to_rfc3339_opts(SecondsFormat::Micros, true),
                message.is_read,
                message.attachment_count,
                message.importance.as_str(),
                message.body_text,
                message.body_html,
            ],
        )?;

        Self::save_recipients(&tx, message.id.as_str(), "to", &message.to)?;
        Self::save_recipients(&tx, message.id.as_str(), "cc", &message.cc)?;
        Self::save_recipients(&tx, message.id.as_str(), "bcc", &message.bcc)?;

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO message_attachments (message_id, position, name) VALUES (?, ?, ?)",
            )?;
            for (i, name) in message.attachment_names.iter().enumerate() {
                stmt.execute(params![message.id.as_str(), i as i64, name])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn list_messages(&self, folder_path: &str) -> Result<Vec<Message>> {
        let conn = self.conn.lock().unwrap();
        if !Self::folder_exists(&conn, folder_path)? {
            bail!("Folder '{}' not found", folder_path);
        }
        let sql = format!(
            "SELECT {} FROM messages WHERE folder_path = ? ORDER BY received_at DESC, id ASC",
            MESSAGE_COLUMNS
        );
        Self::query_messages(&conn, &sql, &[&folder_path])
    }

    fn list_all_messages(&self) -> Result<Vec<Message>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM messages m
             JOIN folders f ON f.path = m.folder_path
             ORDER BY f.position, m.received_at DESC, m.id ASC",
            MESSAGE_COLUMNS
                .split(", ")
                .map(|c| format!("m.{}", c))
                .collect::<Vec<_>>()
                .join(", ")
        );
        Self::query_messages(&conn, &sql, &[])
    }

    fn get_message(&self, id: &MessageId) -> Result<Option<Message>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT {} FROM messages WHERE id = ?", MESSAGE_COLUMNS);
        let row = conn
            .query_row(&sql, [id.as_str()], MessageRow::from_row)
            .optional()?;
        row.map(|row| Self::hydrate(&conn, row)).transpose()
    }

    fn move_message(&self, id: &MessageId, target_folder: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        if !Self::folder_exists(&conn, target_folder)? {
            bail!("Target folder '{}' not found", target_folder);
        }
        let updated = conn.execute(
            "UPDATE messages SET folder_path = ? WHERE id = ?",
            params![target_folder, id.as_str()],
        )?;
        if updated == 0 {
            bail!("Message '{}' not found", id);
        }
        Ok(())
    }

    fn count_messages(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "DELETE FROM message_attachments;
             DELETE FROM message_recipients;
             DELETE FROM messages;
             DELETE FROM folders;",
        )?;
        Ok(())
    }
}
