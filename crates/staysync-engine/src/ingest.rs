// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound ingestion: write a remote thread snapshot into the store and
//! decide whether the conversation awaits a reply.
//!
//! Messages are written in ascending `sent_at` order through the idempotent
//! append gate, so re-ingesting an unchanged thread is a no-op and the reply
//! generator always sees the true most-recent guest message.

use staysync_core::types::{Conversation, MessageRecord, NewMessage, RemoteMessage};
use staysync_core::{Direction, Sender, SyncError, SyncStore, Transport};
use tracing::{debug, warn};

/// Result of ingesting one thread snapshot.
#[derive(Debug)]
pub struct IngestOutcome {
    /// Messages actually inserted (not deduplicated).
    pub stored: usize,
    /// The message a reply should answer, when one is awaited.
    pub reply_to: Option<MessageRecord>,
}

/// Write a thread snapshot and evaluate the reply decision.
pub async fn ingest_thread(
    store: &dyn SyncStore,
    conversation: &Conversation,
    remote_messages: &[RemoteMessage],
) -> Result<IngestOutcome, SyncError> {
    // The fetcher normalizes to chronological order; enforce it here anyway
    // since the ordering invariant belongs to ingestion.
    let mut ordered: Vec<&RemoteMessage> = remote_messages.iter().collect();
    ordered.sort_by(|a, b| a.sent_at.cmp(&b.sent_at));

    let mut stored = 0;
    for remote in ordered {
        let new_message = to_new_message(conversation, remote);
        if store.append_message_if_new(&new_message).await?.is_some() {
            stored += 1;
        }
    }
    debug!(
        conversation_id = conversation.id.as_str(),
        snapshot = remote_messages.len(),
        stored,
        "thread snapshot ingested"
    );

    let messages = store.list_messages(&conversation.id).await?;
    let reply_to = messages.into_iter().next_back().filter(needs_reply);
    Ok(IngestOutcome { stored, reply_to })
}

fn to_new_message(conversation: &Conversation, remote: &RemoteMessage) -> NewMessage {
    let (direction, sender_label, confidence) = match remote.sender {
        Sender::Guest => (Direction::Inbound, "guest", "role"),
        Sender::Host => (Direction::Outbound, "host", "role"),
        Sender::UnknownLowConfidence => (Direction::Inbound, "unknown", "low"),
    };
    let metadata = serde_json::json!({
        "listing_id": conversation.listing_id,
        "sender": sender_label,
        "sender_confidence": confidence,
        "observed_via": Transport::BrowserAutomation,
        "remote_sent_at": remote.sent_at,
    });
    NewMessage {
        conversation_id: conversation.id.clone(),
        content: remote.content.clone(),
        direction,
        is_ai_generated: false,
        external_message_id: remote.external_message_id.clone(),
        sent_at: remote.sent_at.clone(),
        metadata: Some(metadata.to_string()),
    }
}

/// A reply is awaited only when the newest stored message is inbound AND
/// confidently guest-classified. A low-confidence newest message suppresses
/// the auto-reply and leaves the conversation for a future pass or a manual
/// answer.
fn needs_reply(latest: &MessageRecord) -> bool {
    if latest.direction != Direction::Inbound {
        return false;
    }
    let sender = latest
        .metadata
        .as_deref()
        .and_then(|m| serde_json::from_str::<serde_json::Value>(m).ok())
        .and_then(|v| v.get("sender").and_then(|s| s.as_str()).map(String::from));
    match sender.as_deref() {
        Some("guest") => true,
        Some("unknown") => {
            warn!(
                message_id = latest.id.as_str(),
                "newest message has low-confidence sender; suppressing auto-reply"
            );
            false
        }
        // Manually inserted inbound rows without metadata still get answered.
        None => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(direction: Direction, metadata: Option<&str>) -> MessageRecord {
        MessageRecord {
            id: "m1".into(),
            conversation_id: "c1".into(),
            content: "hi".into(),
            direction,
            is_ai_generated: false,
            external_message_id: None,
            sent_at: "2026-01-01T10:00:00Z".into(),
            metadata: metadata.map(String::from),
            created_at: "2026-01-01T10:00:00Z".into(),
        }
    }

    #[test]
    fn guest_inbound_needs_reply() {
        let latest = record(Direction::Inbound, Some(r#"{"sender":"guest"}"#));
        assert!(needs_reply(&latest));
    }

    #[test]
    fn outbound_never_needs_reply() {
        let latest = record(Direction::Outbound, Some(r#"{"sender":"host"}"#));
        assert!(!needs_reply(&latest));
    }

    #[test]
    fn low_confidence_suppresses_reply() {
        let latest = record(Direction::Inbound, Some(r#"{"sender":"unknown"}"#));
        assert!(!needs_reply(&latest));
    }

    #[test]
    fn inbound_without_metadata_still_replied() {
        let latest = record(Direction::Inbound, None);
        assert!(needs_reply(&latest));
    }
}
