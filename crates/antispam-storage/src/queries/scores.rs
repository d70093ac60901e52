// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reputation score reads and upserts.

use antispam_core::{AntispamError, Identity, Sender};
use rusqlite::params;

use crate::database::Database;
use crate::queries::now_timestamp;

/// Get the stored score for an identity, `None` if the sender was never scored.
pub async fn get_score(db: &Database, identity: &Identity) -> Result<Option<i64>, AntispamError> {
    let identity = identity.clone();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT score FROM scores WHERE source = ?1 AND chat_id = ?2 AND user_id = ?3",
                params![
                    identity.source.to_string(),
                    identity.chat_id,
                    identity.user_id
                ],
                |row| row.get(0),
            );
            match result {
                Ok(score) => Ok(Some(score)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert or replace the score for a sender, refreshing the stored display name.
pub async fn set_score(db: &Database, sender: &Sender, score: i64) -> Result<(), AntispamError> {
    let sender = sender.clone();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO scores (source, chat_id, user_id, user_name, score, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (source, chat_id, user_id) DO UPDATE SET
                     user_name = excluded.user_name,
                     score = excluded.score,
                     updated_at = excluded.updated_at",
                params![
                    sender.identity.source.to_string(),
                    sender.identity.chat_id,
                    sender.identity.user_id,
                    sender.name,
                    score,
                    now,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
