// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock PMS API for deterministic testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use staysync_core::types::{BookingRecord, PmsAck};
use staysync_core::{PmsApi, SyncError};
use tokio::sync::Mutex;

/// One captured PMS send.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedPmsSend {
    pub booking_id: String,
    pub text: String,
    pub channel: String,
}

/// Captures sends and serves scripted bookings.
#[derive(Default)]
pub struct MockPmsApi {
    fail_sends: AtomicBool,
    sent: Mutex<Vec<CapturedPmsSend>>,
    bookings: Mutex<HashMap<String, BookingRecord>>,
}

impl MockPmsApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail (to exercise channel demotion).
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub async fn add_booking(&self, booking: BookingRecord) {
        self.bookings.lock().await.insert(booking.id.clone(), booking);
    }

    pub async fn sent(&self) -> Vec<CapturedPmsSend> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl PmsApi for MockPmsApi {
    async fn send_message(
        &self,
        booking_id: &str,
        text: &str,
        channel: &str,
    ) -> Result<PmsAck, SyncError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(SyncError::RemoteSendFailed {
                stage: None,
                message: "mock PMS outage".into(),
                source: None,
            });
        }
        self.sent.lock().await.push(CapturedPmsSend {
            booking_id: booking_id.to_string(),
            text: text.to_string(),
            channel: channel.to_string(),
        });
        Ok(PmsAck {
            external_message_id: Some(format!("pms-{}", uuid::Uuid::new_v4())),
        })
    }

    async fn fetch_booking(&self, booking_id: &str) -> Result<BookingRecord, SyncError> {
        self.bookings
            .lock()
            .await
            .get(booking_id)
            .cloned()
            .ok_or_else(|| SyncError::RemoteFetchFailed {
                message: format!("unknown booking {booking_id}"),
                source: None,
            })
    }
}
