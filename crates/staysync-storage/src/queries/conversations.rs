// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation upsert and lookups.

use std::str::FromStr;

use rusqlite::params;
use staysync_core::SyncError;
use staysync_core::types::{Conversation, ConversationStatus, NewConversation, Transport};

use crate::database::Database;

const CONVERSATION_COLUMNS: &str = "id, listing_id, guest_display_name, external_thread_id,
     source_transport, external_booking_id, status, last_message_at, created_at";

pub(crate) fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    let transport: String = row.get(4)?;
    let status: String = row.get(6)?;
    Ok(Conversation {
        id: row.get(0)?,
        listing_id: row.get(1)?,
        guest_display_name: row.get(2)?,
        external_thread_id: row.get(3)?,
        source_transport: Transport::from_str(&transport).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?,
        external_booking_id: row.get(5)?,
        status: ConversationStatus::from_str(&status).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?,
        last_message_at: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Insert or return the conversation for a remote thread.
///
/// The dedup key is `(external_thread_id, source_transport)` on the partial
/// unique index; an existing row keeps its id and the upsert refreshes the
/// guest display name and fills a newly learned booking id. Conversations
/// without an external id are always inserted fresh.
pub async fn upsert_conversation(
    db: &Database,
    conversation: &NewConversation,
) -> Result<Conversation, SyncError> {
    let new = conversation.clone();
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    db.connection()
        .call(move |conn| {
            let transport = new.source_transport.to_string();
            match &new.external_thread_id {
                Some(external_id) => {
                    conn.execute(
                        "INSERT INTO conversations
                             (id, listing_id, guest_display_name, external_thread_id,
                              source_transport, external_booking_id, status, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'open', ?7)
                         ON CONFLICT (external_thread_id, source_transport)
                             WHERE external_thread_id IS NOT NULL
                         DO UPDATE SET
                             guest_display_name = excluded.guest_display_name,
                             external_booking_id = COALESCE(
                                 excluded.external_booking_id,
                                 conversations.external_booking_id)",
                        params![
                            id,
                            new.listing_id,
                            new.guest_display_name,
                            external_id,
                            transport,
                            new.external_booking_id,
                            now,
                        ],
                    )?;
                    let query = format!(
                        "SELECT {CONVERSATION_COLUMNS} FROM conversations
                         WHERE external_thread_id = ?1 AND source_transport = ?2"
                    );
                    let mut stmt = conn.prepare(&query)?;
                    let conversation =
                        stmt.query_row(params![external_id, transport], row_to_conversation)?;
                    Ok(conversation)
                }
                None => {
                    conn.execute(
                        "INSERT INTO conversations
                             (id, listing_id, guest_display_name, external_thread_id,
                              source_transport, external_booking_id, status, created_at)
                         VALUES (?1, ?2, ?3, NULL, ?4, ?5, 'open', ?6)",
                        params![
                            id,
                            new.listing_id,
                            new.guest_display_name,
                            transport,
                            new.external_booking_id,
                            now,
                        ],
                    )?;
                    let query = format!(
                        "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"
                    );
                    let mut stmt = conn.prepare(&query)?;
                    let conversation = stmt.query_row(params![id], row_to_conversation)?;
                    Ok(conversation)
                }
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a conversation by internal id.
pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, SyncError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let query =
                format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1");
            let mut stmt = conn.prepare(&query)?;
            let result = stmt.query_row(params![id], row_to_conversation);
            match result {
                Ok(conversation) => Ok(Some(conversation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::registry::{create_host, create_property};
    use staysync_core::types::{HostRecord, PropertyRecord};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let host = HostRecord {
            id: "host-1".into(),
            name: "Alice".into(),
            pms_enabled: false,
            automation_enabled: true,
            platform_login: None,
            created_at: "2026-01-01T00:00:00Z".into(),
        };
        create_host(&db, &host).await.unwrap();
        let property = PropertyRecord {
            id: "prop-1".into(),
            host_id: "host-1".into(),
            name: "Sea View Flat".into(),
            external_listing_id: None,
            created_at: "2026-01-01T00:00:00Z".into(),
        };
        create_property(&db, &property).await.unwrap();
        (db, dir)
    }

    fn make_new(external_thread_id: Option<&str>) -> NewConversation {
        NewConversation {
            listing_id: "prop-1".into(),
            guest_display_name: "Bob".into(),
            external_thread_id: external_thread_id.map(String::from),
            source_transport: Transport::BrowserAutomation,
            external_booking_id: None,
        }
    }

    #[tokio::test]
    async fn upsert_same_external_thread_yields_one_row() {
        let (db, _dir) = setup_db().await;

        let first = upsert_conversation(&db, &make_new(Some("thread-9"))).await.unwrap();
        let second = upsert_conversation(&db, &make_new(Some("thread-9"))).await.unwrap();
        assert_eq!(first.id, second.id);

        let count: i64 = db
            .connection()
            .call(|conn| {
                let n = conn.query_row("SELECT count(*) FROM conversations", [], |r| r.get(0))?;
                Ok::<i64, rusqlite::Error>(n)
            })
            .await
            .unwrap();
        assert_eq!(count, 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn upsert_fills_booking_id_without_clearing_it() {
        let (db, _dir) = setup_db().await;

        let mut new = make_new(Some("thread-1"));
        upsert_conversation(&db, &new).await.unwrap();

        new.external_booking_id = Some("booking-7".into());
        let updated = upsert_conversation(&db, &new).await.unwrap();
        assert_eq!(updated.external_booking_id.as_deref(), Some("booking-7"));

        // A later snapshot without the booking id must not clear it.
        new.external_booking_id = None;
        let kept = upsert_conversation(&db, &new).await.unwrap();
        assert_eq!(kept.external_booking_id.as_deref(), Some("booking-7"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn conversations_without_external_id_are_distinct() {
        let (db, _dir) = setup_db().await;

        let a = upsert_conversation(&db, &make_new(None)).await.unwrap();
        let b = upsert_conversation(&db, &make_new(None)).await.unwrap();
        assert_ne!(a.id, b.id);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_nonexistent_conversation_returns_none() {
        let (db, _dir) = setup_db().await;
        let result = get_conversation(&db, "no-such").await.unwrap();
        assert!(result.is_none());
        db.close().await.unwrap();
    }
}
