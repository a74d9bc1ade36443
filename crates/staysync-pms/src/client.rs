// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the PMS API.
//!
//! Handles request construction, authentication, and transient error retry.
//! The PMS wire format is owned by the PMS vendor and explicitly unstable;
//! only the fields this engine consumes are modeled.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use staysync_core::SyncError;
use tracing::{debug, warn};

/// Wire request for the PMS send-message endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest<'a> {
    pub booking_id: &'a str,
    pub body: &'a str,
    pub channel: &'a str,
}

/// Wire response from the PMS send-message endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageResponse {
    pub message_id: Option<String>,
}

/// Wire shape of a PMS booking record, reduced to the fields this engine
/// touches.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingResponse {
    pub id: String,
    #[serde(default)]
    pub guest_name: Option<String>,
    #[serde(default)]
    pub listing_id: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
}

/// HTTP client for PMS API communication.
///
/// Manages authentication headers, connection pooling, and a single retry
/// for transient errors (429, 500, 503).
#[derive(Debug, Clone)]
pub struct PmsClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl PmsClient {
    /// Creates a new PMS API client.
    pub fn new(base_url: String, api_key: &str, timeout: Duration) -> Result<Self, SyncError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|e| SyncError::Config(format!("invalid PMS API key header value: {e}")))?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build PMS HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: 1,
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Send a guest message through the PMS.
    pub async fn send_message(
        &self,
        request: &SendMessageRequest<'_>,
    ) -> Result<SendMessageResponse, SyncError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.post_with_retry(&url, request).await?;
        serde_json::from_str(&body).map_err(|e| remote_error("malformed send response", e))
    }

    /// Fetch a booking record.
    pub async fn fetch_booking(&self, booking_id: &str) -> Result<BookingResponse, SyncError> {
        let url = format!("{}/v1/bookings/{booking_id}", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| remote_error("HTTP request failed", e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(SyncError::RemoteFetchFailed {
                message: format!("PMS returned {status} for booking {booking_id}: {body}"),
                source: None,
            });
        }
        serde_json::from_str(&body).map_err(|e| remote_error("malformed booking response", e))
    }

    /// POST with one retry on transient statuses (429, 500, 503).
    async fn post_with_retry<T: Serialize>(
        &self,
        url: &str,
        payload: &T,
    ) -> Result<String, SyncError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, url, "retrying PMS request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(url)
                .json(payload)
                .send()
                .await
                .map_err(|e| pms_send_error(format!("HTTP request failed: {e}"), Some(e)))?;

            let status = response.status();
            debug!(status = %status, attempt, "PMS response received");

            if status.is_success() {
                return response
                    .text()
                    .await
                    .map_err(|e| pms_send_error(format!("failed to read body: {e}"), Some(e)));
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, body = %body, "transient PMS error, will retry");
                last_error = Some(pms_send_error(format!("PMS returned {status}: {body}"), None));
                continue;
            }

            return Err(pms_send_error(format!("PMS returned {status}: {body}"), None));
        }

        Err(last_error
            .unwrap_or_else(|| pms_send_error("PMS request failed after retries".into(), None)))
    }
}

fn is_transient_error(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}

fn pms_send_error(message: String, source: Option<reqwest::Error>) -> SyncError {
    SyncError::RemoteSendFailed {
        stage: None,
        message,
        source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
    }
}

fn remote_error(context: &str, e: impl std::error::Error + Send + Sync + 'static) -> SyncError {
    SyncError::RemoteFetchFailed {
        message: format!("{context}: {e}"),
        source: Some(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base: String) -> PmsClient {
        PmsClient::new(base, "test-key", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn send_message_posts_json_and_parses_ack() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "booking_id": "b-1",
                "channel": "booking_platform"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"message_id": "pms-42"})),
            )
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let ack = client
            .send_message(&SendMessageRequest {
                booking_id: "b-1",
                body: "Your key is in the lockbox.",
                channel: "booking_platform",
            })
            .await
            .unwrap();
        assert_eq!(ack.message_id.as_deref(), Some("pms-42"));
    }

    #[tokio::test]
    async fn send_message_retries_transient_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"message_id": null})),
            )
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let ack = client
            .send_message(&SendMessageRequest {
                booking_id: "b-1",
                body: "hi",
                channel: "booking_platform",
            })
            .await
            .unwrap();
        assert!(ack.message_id.is_none());
    }

    #[tokio::test]
    async fn send_message_maps_client_error_to_send_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let err = client
            .send_message(&SendMessageRequest {
                booking_id: "b-1",
                body: "hi",
                channel: "booking_platform",
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::RemoteSendFailed { .. }));
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn fetch_booking_parses_reduced_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/bookings/b-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "b-9",
                "guest_name": "Bob",
                "listing_id": "ext-1",
                "channel": "booking_platform",
                "unmodeled_field": true
            })))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let booking = client.fetch_booking("b-9").await.unwrap();
        assert_eq!(booking.id, "b-9");
        assert_eq!(booking.guest_name.as_deref(), Some("Bob"));
    }

    #[tokio::test]
    async fn fetch_booking_maps_404_to_fetch_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/bookings/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let err = client.fetch_booking("missing").await.unwrap_err();
        assert!(matches!(err, SyncError::RemoteFetchFailed { .. }));
    }
}
