// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message audit log operations.

use std::str::FromStr;

use antispam_core::{
    Action, ActionKind, AntispamError, ChatMessage, Identity, MediaDescriptor, SavedMessage,
    Sender, Source,
};
use chrono::{DateTime, Utc};
use rusqlite::params;
use rusqlite::types::Type;

use crate::database::Database;
use crate::queries::{format_timestamp, now_timestamp};

/// Append a message to the audit log and return its record id.
///
/// The chat row is upserted in the same transaction so the chat title stays current.
pub async fn save_message(db: &Database, msg: &ChatMessage) -> Result<i64, AntispamError> {
    let msg = msg.clone();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let identity = &msg.sender.identity;
            let source = identity.source.to_string();
            tx.execute(
                "INSERT INTO chats (source, chat_id, title, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (source, chat_id) DO UPDATE SET
                     title = excluded.title,
                     updated_at = excluded.updated_at",
                params![source, identity.chat_id, msg.sender.chat_title, now],
            )?;
            tx.execute(
                "INSERT INTO messages (source, chat_id, user_id, user_name, message_id, text,
                     media_file_id, media_mime_type, media_size, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    source,
                    identity.chat_id,
                    identity.user_id,
                    msg.sender.name,
                    msg.id,
                    msg.text,
                    msg.media.as_ref().map(|m| m.file_id.clone()),
                    msg.media.as_ref().map(|m| m.mime_type.clone()),
                    msg.media.as_ref().and_then(|m| m.size),
                    now,
                ],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(id)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record the action taken on a saved message.
pub async fn save_action(
    db: &Database,
    record_id: i64,
    action: &Action,
) -> Result<(), AntispamError> {
    let kind = action.kind.as_str();
    let note = action.note.clone();
    let updated = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET action = ?1, action_note = ?2 WHERE id = ?3",
                params![kind, note, record_id],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    ensure_updated(updated, record_id)
}

/// Record a classification error against a saved message.
pub async fn save_error(db: &Database, record_id: i64, error: &str) -> Result<(), AntispamError> {
    let error = error.to_string();
    let updated = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET error = ?1 WHERE id = ?2",
                params![error, record_id],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    ensure_updated(updated, record_id)
}

fn ensure_updated(rows: usize, record_id: i64) -> Result<(), AntispamError> {
    if rows == 0 {
        return Err(AntispamError::storage(format!(
            "message record {record_id} not found"
        )));
    }
    Ok(())
}

/// List messages saved at or after `since`, newest first.
pub async fn list_messages(
    db: &Database,
    since: DateTime<Utc>,
) -> Result<Vec<SavedMessage>, AntispamError> {
    let since = format_timestamp(since);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.source, m.chat_id, m.user_id, m.user_name, COALESCE(c.title, ''),
                        m.message_id, m.text, m.media_file_id, m.media_mime_type, m.media_size,
                        m.created_at, m.action, m.action_note, m.error
                 FROM messages m
                 LEFT JOIN chats c ON c.source = m.source AND c.chat_id = m.chat_id
                 WHERE m.created_at >= ?1
                 ORDER BY m.created_at DESC, m.id DESC",
            )?;
            let rows = stmt.query_map(params![since], |row| {
                let source: String = row.get(1)?;
                let source = Source::from_str(&source).map_err(|e| conversion_err(1, e))?;
                let file_id: Option<String> = row.get(8)?;
                let mime_type: Option<String> = row.get(9)?;
                let size: Option<i64> = row.get(10)?;
                let action: Option<String> = row.get(12)?;
                let action = action
                    .map(|a| ActionKind::from_str(&a))
                    .transpose()
                    .map_err(|e| conversion_err(12, e))?;

                Ok(SavedMessage {
                    record_id: row.get(0)?,
                    sender: Sender {
                        identity: Identity::new(
                            source,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                        ),
                        name: row.get(4)?,
                        chat_title: row.get(5)?,
                    },
                    message_id: row.get(6)?,
                    text: row.get(7)?,
                    media: file_id.map(|file_id| MediaDescriptor {
                        file_id,
                        mime_type: mime_type.unwrap_or_default(),
                        size,
                    }),
                    created_at: row.get(11)?,
                    action,
                    action_note: row.get(13)?,
                    error: row.get(14)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn conversion_err(column: usize, e: strum::ParseError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_msg(id: &str, text: &str, media: Option<MediaDescriptor>) -> ChatMessage {
        ChatMessage {
            sender: Sender {
                identity: Identity::new(Source::Telegram, "-100", "42"),
                name: "Jane (@jane)".to_string(),
                chat_title: "Rust Group".to_string(),
            },
            id: id.to_string(),
            text: text.to_string(),
            media,
        }
    }

    async fn backdate(db: &Database, record_id: i64, ts: &str) {
        let ts = ts.to_string();
        db.connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE messages SET created_at = ?1 WHERE id = ?2",
                    params![ts, record_id],
                )
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn save_message_returns_increasing_ids() {
        let (db, _dir) = setup_db().await;
        let a = save_message(&db, &make_msg("1", "hello", None)).await.unwrap();
        let b = save_message(&db, &make_msg("2", "world", None)).await.unwrap();
        assert!(b > a);
    }

    #[tokio::test]
    async fn saved_message_round_trips_with_action_and_media() {
        let (db, _dir) = setup_db().await;
        let media = MediaDescriptor {
            file_id: "AgAD".to_string(),
            mime_type: "image/jpeg".to_string(),
            size: Some(2048),
        };
        let id = save_message(&db, &make_msg("7", "buy now", Some(media.clone())))
            .await
            .unwrap();
        save_action(&db, id, &Action::erase("crypto ad")).await.unwrap();

        let since = Utc::now() - chrono::Duration::hours(1);
        let saved = list_messages(&db, since).await.unwrap();
        assert_eq!(saved.len(), 1);
        let m = &saved[0];
        assert_eq!(m.record_id, id);
        assert_eq!(m.message_id, "7");
        assert_eq!(m.text, "buy now");
        assert_eq!(m.media.as_ref(), Some(&media));
        assert_eq!(m.sender.chat_title, "Rust Group");
        assert_eq!(m.sender.identity.user_id, "42");
        assert_eq!(m.action, Some(ActionKind::Erase));
        assert_eq!(m.action_note.as_deref(), Some("crypto ad"));
        assert!(m.error.is_none());
        assert!(m.was_spam());
    }

    #[tokio::test]
    async fn unresolved_message_has_null_action() {
        let (db, _dir) = setup_db().await;
        let id = save_message(&db, &make_msg("1", "hi", None)).await.unwrap();
        save_error(&db, id, "classifier error: timeout").await.unwrap();

        let saved = list_messages(&db, Utc::now() - chrono::Duration::hours(1))
            .await
            .unwrap();
        assert!(saved[0].action.is_none());
        assert_eq!(saved[0].error.as_deref(), Some("classifier error: timeout"));
    }

    #[tokio::test]
    async fn updates_on_missing_record_fail() {
        let (db, _dir) = setup_db().await;
        assert!(save_action(&db, 999, &Action::noop()).await.is_err());
        assert!(save_error(&db, 999, "boom").await.is_err());
    }

    #[tokio::test]
    async fn list_messages_filters_by_time_newest_first() {
        let (db, _dir) = setup_db().await;
        let old = save_message(&db, &make_msg("1", "old", None)).await.unwrap();
        let mid = save_message(&db, &make_msg("2", "mid", None)).await.unwrap();
        let new = save_message(&db, &make_msg("3", "new", None)).await.unwrap();
        backdate(&db, old, "2020-01-01T00:00:00.000Z").await;
        backdate(&db, mid, "2026-01-01T00:00:00.000Z").await;
        backdate(&db, new, "2026-01-02T00:00:00.000Z").await;

        let since = DateTime::parse_from_rfc3339("2025-12-31T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let saved = list_messages(&db, since).await.unwrap();
        let texts: Vec<&str> = saved.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["new", "mid"]);

        db.close().await.unwrap();
    }
}
