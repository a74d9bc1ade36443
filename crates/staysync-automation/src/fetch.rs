// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound fetch through the platform's internal JSON API.
//!
//! Issues the same authenticated requests the platform's single-page app
//! issues internally (thread listing and thread detail keyed by the opaque
//! thread id) instead of re-rendering pages per fetch. Remote payloads are
//! deserialized once into explicit intermediate shapes and normalized here;
//! this module is the one place that must change when the platform's wire
//! shape changes.

use serde::Deserialize;
use staysync_core::SyncError;
use staysync_core::types::{RemoteListing, RemoteMessage, RemoteThread, Sender};
use tracing::{debug, warn};

use crate::threadid::{decode_thread_id, encode_thread_id};

/// Phrases the platform's own auto-responder inserts; used by the lossy
/// sender-classification fallback.
const AUTOREPLY_PHRASES: &[&str] = &[
    "this is an automated response",
    "thank you for your inquiry",
    "we will get back to you shortly",
];

// --- Wire shapes (validated once, then normalized) ---

#[derive(Debug, Deserialize)]
pub struct ListingsPayload {
    pub listings: Vec<ListingPayload>,
}

#[derive(Debug, Deserialize)]
pub struct ListingPayload {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ThreadsPayload {
    pub threads: Vec<ThreadSummaryPayload>,
}

#[derive(Debug, Deserialize)]
pub struct ThreadSummaryPayload {
    /// Opaque or plain-numeric thread id.
    pub id: String,
    pub guest: Option<ParticipantPayload>,
    #[serde(default)]
    pub listing_id: Option<String>,
    #[serde(default)]
    pub booking_id: Option<String>,
    /// Direct host-guest conversation outside any listing.
    #[serde(default)]
    pub direct: bool,
    #[serde(default)]
    pub last_activity_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ThreadDetailPayload {
    #[serde(default)]
    pub participants: Vec<ParticipantPayload>,
    pub messages: Vec<MessagePayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct MessagePayload {
    pub id: Option<String>,
    #[serde(default)]
    pub sender_id: Option<String>,
    pub body: String,
    pub created_at: String,
}

// --- HTTP fetch (cookie-authenticated reqwest client) ---

/// Enumerate listings visible to the session.
pub async fn fetch_listings(
    http: &reqwest::Client,
    base_url: &str,
    host_id: &str,
) -> Result<Vec<RemoteListing>, SyncError> {
    let url = format!("{base_url}/api/hosting/listings");
    let payload: ListingsPayload = get_json(http, &url, host_id).await?;
    Ok(payload
        .listings
        .into_iter()
        .map(|l| RemoteListing {
            external_id: l.id,
            name: l.name,
        })
        .collect())
}

/// Thread summaries visible to the session, across all listings.
pub async fn fetch_threads(
    http: &reqwest::Client,
    base_url: &str,
    host_id: &str,
) -> Result<Vec<RemoteThread>, SyncError> {
    let url = format!("{base_url}/api/messaging/threads");
    let payload: ThreadsPayload = get_json(http, &url, host_id).await?;

    let mut threads = Vec::new();
    for summary in payload.threads {
        match normalize_thread_summary(summary) {
            Ok(thread) => threads.push(thread),
            Err(e) => {
                // One undecodable summary must not hide the rest.
                warn!(error = %e, "skipping undecodable thread summary");
            }
        }
    }
    Ok(threads)
}

/// Full message history of one thread, newest-complete-snapshot each call.
pub async fn fetch_thread_messages(
    http: &reqwest::Client,
    base_url: &str,
    host_id: &str,
    external_thread_id: &str,
) -> Result<Vec<RemoteMessage>, SyncError> {
    let numeric = decode_thread_id(external_thread_id).ok_or_else(|| {
        SyncError::RemoteFetchFailed {
            message: format!("unrecognized thread id `{external_thread_id}`"),
            source: None,
        }
    })?;
    let opaque = encode_thread_id(numeric);
    let url = format!("{base_url}/api/messaging/threads/{opaque}");
    let payload: ThreadDetailPayload = get_json(http, &url, host_id).await?;
    Ok(normalize_thread_detail(payload))
}

async fn get_json<T: serde::de::DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
    host_id: &str,
) -> Result<T, SyncError> {
    let response = http
        .get(url)
        .header("x-requested-with", "XMLHttpRequest")
        .send()
        .await
        .map_err(|e| SyncError::RemoteFetchFailed {
            message: format!("request to {url} failed: {e}"),
            source: Some(Box::new(e)),
        })?;

    // A redirect onto a login surface means the cookie jar went stale.
    if is_login_path(response.url().path()) {
        return Err(SyncError::SessionExpired {
            host_id: host_id.to_string(),
        });
    }

    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(SyncError::SessionExpired {
            host_id: host_id.to_string(),
        });
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SyncError::RemoteFetchFailed {
            message: format!("{url} returned {status}: {body}"),
            source: None,
        });
    }

    let body = response.text().await.map_err(|e| SyncError::RemoteFetchFailed {
        message: format!("failed to read body from {url}: {e}"),
        source: Some(Box::new(e)),
    })?;
    serde_json::from_str(&body).map_err(|e| SyncError::RemoteFetchFailed {
        message: format!("malformed payload from {url}: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Whether a URL path is part of the platform's login surface.
pub fn is_login_path(path: &str) -> bool {
    path.contains("/login") || path.contains("/signin") || path.contains("/authenticate")
}

// --- Normalization ---

fn normalize_thread_summary(summary: ThreadSummaryPayload) -> Result<RemoteThread, SyncError> {
    let numeric = decode_thread_id(&summary.id).ok_or_else(|| SyncError::RemoteFetchFailed {
        message: format!("unrecognized thread id `{}`", summary.id),
        source: None,
    })?;
    Ok(RemoteThread {
        external_id: numeric.to_string(),
        guest_display_name: summary
            .guest
            .map(|g| g.name)
            .unwrap_or_else(|| "Guest".to_string()),
        external_listing_id: summary.listing_id,
        external_booking_id: summary.booking_id,
        is_direct: summary.direct,
        last_activity_at: summary.last_activity_at,
    })
}

/// Normalize a thread detail payload into ordered remote messages.
pub fn normalize_thread_detail(payload: ThreadDetailPayload) -> Vec<RemoteMessage> {
    let mut messages: Vec<RemoteMessage> = payload
        .messages
        .iter()
        .map(|m| RemoteMessage {
            content: m.body.clone(),
            sender: classify_sender(m, &payload.participants),
            sent_at: m.created_at.clone(),
            external_message_id: m.id.clone(),
        })
        .collect();
    // The engine requires ascending sent_at before any reply decision.
    messages.sort_by(|a, b| a.sent_at.cmp(&b.sent_at));
    messages
}

/// Classify a message's sender from the participant-role map, falling back
/// to content heuristics when no participant matches.
///
/// The fallback is lossy: it can recognize the platform's autoreply phrasing
/// as host-side, but anything else becomes `UnknownLowConfidence`, logged at
/// WARN and never coerced to a confident role.
pub fn classify_sender(message: &MessagePayload, participants: &[ParticipantPayload]) -> Sender {
    if let Some(sender_id) = &message.sender_id
        && let Some(participant) = participants
            .iter()
            .find(|p| p.id.as_deref() == Some(sender_id.as_str()))
    {
        return match participant.role.as_deref() {
            Some("guest") => Sender::Guest,
            Some("host") | Some("cohost") | Some("self") => Sender::Host,
            other => {
                debug!(role = other.unwrap_or("-"), "unmapped participant role");
                heuristic_sender(message)
            }
        };
    }
    heuristic_sender(message)
}

fn heuristic_sender(message: &MessagePayload) -> Sender {
    let lowered = message.body.to_lowercase();
    if AUTOREPLY_PHRASES.iter().any(|p| lowered.contains(p)) {
        return Sender::Host;
    }
    warn!(
        external_message_id = message.id.as_deref().unwrap_or("-"),
        "low-confidence sender classification"
    );
    Sender::UnknownLowConfidence
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn participant(id: &str, role: &str) -> ParticipantPayload {
        ParticipantPayload {
            id: Some(id.to_string()),
            role: Some(role.to_string()),
            name: id.to_string(),
        }
    }

    fn message(sender_id: Option<&str>, body: &str, created_at: &str) -> MessagePayload {
        MessagePayload {
            id: Some(format!("m-{created_at}")),
            sender_id: sender_id.map(String::from),
            body: body.to_string(),
            created_at: created_at.to_string(),
        }
    }

    #[test]
    fn classify_by_participant_role() {
        let participants = vec![participant("u1", "guest"), participant("u2", "host")];
        assert_eq!(
            classify_sender(&message(Some("u1"), "hi", "t"), &participants),
            Sender::Guest
        );
        assert_eq!(
            classify_sender(&message(Some("u2"), "hello", "t"), &participants),
            Sender::Host
        );
    }

    #[test]
    fn unmatched_sender_with_autoreply_phrasing_is_host() {
        let sender = classify_sender(
            &message(Some("u9"), "This is an automated response.", "t"),
            &[],
        );
        assert_eq!(sender, Sender::Host);
    }

    #[test]
    fn unmatched_sender_is_low_confidence_not_host() {
        let sender = classify_sender(&message(None, "see you at 3pm", "t"), &[]);
        assert_eq!(sender, Sender::UnknownLowConfidence);
    }

    #[test]
    fn normalize_sorts_ascending_by_sent_at() {
        let payload = ThreadDetailPayload {
            participants: vec![participant("u1", "guest")],
            messages: vec![
                message(Some("u1"), "second", "2026-01-01T10:01:00Z"),
                message(Some("u1"), "first", "2026-01-01T10:00:00Z"),
            ],
        };
        let normalized = normalize_thread_detail(payload);
        assert_eq!(normalized[0].content, "first");
        assert_eq!(normalized[1].content, "second");
    }

    #[test]
    fn login_path_detection() {
        assert!(is_login_path("/login"));
        assert!(is_login_path("/account/signin"));
        assert!(!is_login_path("/messaging/thread/1"));
    }

    #[tokio::test]
    async fn fetch_threads_decodes_opaque_ids_and_skips_foreign_ones() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/messaging/threads"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "threads": [
                    {
                        "id": "TWVzc2FnaW5nVGhyZWFkOjEyMzQ1",
                        "guest": {"name": "Bob"},
                        "listing_id": "ext-1",
                        "booking_id": "b-1"
                    },
                    {"id": "bm90LWEtdGhyZWFk", "guest": {"name": "Eve"}}
                ]
            })))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let threads = fetch_threads(&http, &server.uri(), "h1").await.unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].external_id, "12345");
        assert_eq!(threads[0].guest_display_name, "Bob");
        assert_eq!(threads[0].external_booking_id.as_deref(), Some("b-1"));
        assert!(!threads[0].is_direct);
    }

    #[tokio::test]
    async fn fetch_thread_messages_requests_by_opaque_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/messaging/threads/TWVzc2FnaW5nVGhyZWFkOjEyMzQ1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "participants": [{"id": "u1", "role": "guest", "name": "Bob"}],
                "messages": [
                    {"id": "m1", "sender_id": "u1", "body": "Where is the key?",
                     "created_at": "2026-01-01T10:00:00Z"}
                ]
            })))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let messages = fetch_thread_messages(&http, &server.uri(), "h1", "12345")
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, Sender::Guest);
        assert_eq!(messages[0].external_message_id.as_deref(), Some("m1"));
    }

    #[tokio::test]
    async fn unauthorized_fetch_is_session_expired() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/messaging/threads"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let err = fetch_threads(&http, &server.uri(), "h1").await.unwrap_err();
        assert!(err.is_session_expired());
    }

    #[tokio::test]
    async fn server_error_is_fetch_failure_not_expiry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/messaging/threads"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let err = fetch_threads(&http, &server.uri(), "h1").await.unwrap_err();
        assert!(matches!(err, SyncError::RemoteFetchFailed { .. }));
    }
}
