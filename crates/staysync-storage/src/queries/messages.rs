// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message append and listing, with the idempotent-ingestion dedup gate.

use std::str::FromStr;

use rusqlite::params;
use staysync_core::SyncError;
use staysync_core::types::{Direction, MessageRecord, NewMessage};

use crate::database::Database;

const MESSAGE_COLUMNS: &str = "id, conversation_id, content, direction, is_ai_generated,
     external_message_id, sent_at, metadata, created_at";

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRecord> {
    let direction: String = row.get(3)?;
    Ok(MessageRecord {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        content: row.get(2)?,
        direction: Direction::from_str(&direction).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?,
        is_ai_generated: row.get(4)?,
        external_message_id: row.get(5)?,
        sent_at: row.get(6)?,
        metadata: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Append a message unless an identical `(content, direction)` pair already
/// exists in the conversation.
///
/// The remote transports return full thread snapshots, not deltas, so this
/// gate is what makes re-ingestion idempotent across passes. The exists
/// check, insert, and `last_message_at` touch run in one transaction on the
/// serialized writer connection.
///
/// Returns the stored row on insert, `None` when deduplicated.
pub async fn append_message_if_new(
    db: &Database,
    message: &NewMessage,
) -> Result<Option<MessageRecord>, SyncError> {
    let msg = message.clone();
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let direction = msg.direction.to_string();

            let exists: bool = tx.query_row(
                "SELECT EXISTS(
                     SELECT 1 FROM messages
                     WHERE conversation_id = ?1 AND content = ?2 AND direction = ?3)",
                params![msg.conversation_id, msg.content, direction],
                |row| row.get(0),
            )?;
            if exists {
                return Ok(None);
            }

            tx.execute(
                "INSERT INTO messages
                     (id, conversation_id, content, direction, is_ai_generated,
                      external_message_id, sent_at, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    id,
                    msg.conversation_id,
                    msg.content,
                    direction,
                    msg.is_ai_generated,
                    msg.external_message_id,
                    msg.sent_at,
                    msg.metadata,
                    now,
                ],
            )?;

            // Every message write touches the parent conversation.
            tx.execute(
                "UPDATE conversations SET last_message_at = ?1 WHERE id = ?2",
                params![msg.sent_at, msg.conversation_id],
            )?;

            tx.commit()?;

            Ok(Some(MessageRecord {
                id,
                conversation_id: msg.conversation_id,
                content: msg.content,
                direction: msg.direction,
                is_ai_generated: msg.is_ai_generated,
                external_message_id: msg.external_message_id,
                sent_at: msg.sent_at,
                metadata: msg.metadata,
                created_at: now,
            }))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Messages of a conversation in ascending `sent_at` order.
pub async fn list_messages(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<MessageRecord>, SyncError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let query = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE conversation_id = ?1
                 ORDER BY sent_at ASC, created_at ASC"
            );
            let mut stmt = conn.prepare(&query)?;
            let rows = stmt.query_map(params![conversation_id], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::conversations::upsert_conversation;
    use crate::queries::registry::{create_host, create_property};
    use staysync_core::types::{HostRecord, NewConversation, PropertyRecord, Transport};
    use tempfile::tempdir;

    async fn setup_db_with_conversation() -> (Database, String, tempfile::TempDir) {
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

        let conversation = upsert_conversation(
            &db,
            &NewConversation {
                listing_id: "prop-1".into(),
                guest_display_name: "Bob".into(),
                external_thread_id: Some("thread-1".into()),
                source_transport: Transport::BrowserAutomation,
                external_booking_id: None,
            },
        )
        .await
        .unwrap();
        (db, conversation.id, dir)
    }

    fn make_msg(conversation_id: &str, content: &str, sent_at: &str) -> NewMessage {
        NewMessage {
            conversation_id: conversation_id.to_string(),
            content: content.to_string(),
            direction: Direction::Inbound,
            is_ai_generated: false,
            external_message_id: None,
            sent_at: sent_at.to_string(),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn append_twice_with_identical_content_inserts_once() {
        let (db, conv_id, _dir) = setup_db_with_conversation().await;

        let msg = make_msg(&conv_id, "Where is the key?", "2026-01-01T10:00:00Z");
        let first = append_message_if_new(&db, &msg).await.unwrap();
        assert!(first.is_some());
        let second = append_message_if_new(&db, &msg).await.unwrap();
        assert!(second.is_none());

        let messages = list_messages(&db, &conv_id).await.unwrap();
        assert_eq!(messages.len(), 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn same_content_different_direction_both_stored() {
        let (db, conv_id, _dir) = setup_db_with_conversation().await;

        let inbound = make_msg(&conv_id, "Thanks!", "2026-01-01T10:00:00Z");
        let mut outbound = make_msg(&conv_id, "Thanks!", "2026-01-01T10:05:00Z");
        outbound.direction = Direction::Outbound;

        assert!(append_message_if_new(&db, &inbound).await.unwrap().is_some());
        assert!(append_message_if_new(&db, &outbound).await.unwrap().is_some());

        let messages = list_messages(&db, &conv_id).await.unwrap();
        assert_eq!(messages.len(), 2);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn insert_touches_last_message_at() {
        let (db, conv_id, _dir) = setup_db_with_conversation().await;

        let msg = make_msg(&conv_id, "hello", "2026-01-02T08:30:00Z");
        append_message_if_new(&db, &msg).await.unwrap();

        let conversation = crate::queries::conversations::get_conversation(&db, &conv_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            conversation.last_message_at.as_deref(),
            Some("2026-01-02T08:30:00Z")
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_is_ordered_by_sent_at() {
        let (db, conv_id, _dir) = setup_db_with_conversation().await;

        for (content, ts) in [
            ("first", "2026-01-01T10:00:00Z"),
            ("second", "2026-01-01T10:01:00Z"),
            ("third", "2026-01-01T10:02:00Z"),
        ] {
            append_message_if_new(&db, &make_msg(&conv_id, content, ts))
                .await
                .unwrap();
        }

        let messages = list_messages(&db, &conv_id).await.unwrap();
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);

        let sent: Vec<&str> = messages.iter().map(|m| m.sent_at.as_str()).collect();
        assert!(sent.windows(2).all(|w| w[0] <= w[1]));

        db.close().await.unwrap();
    }
}
