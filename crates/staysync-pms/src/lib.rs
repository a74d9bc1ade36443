// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PMS API integration for the staysync engine.
//!
//! Implements [`PmsApi`] over the vendor's JSON API via reqwest. Used as the
//! preferred outbound delivery channel when a host has an active,
//! credentialed PMS integration and a booking id is known for the
//! conversation.

pub mod client;

use std::time::Duration;

use async_trait::async_trait;
use staysync_config::model::PmsConfig;
use staysync_core::types::{BookingRecord, PmsAck};
use staysync_core::{PmsApi, SyncError};
use tracing::debug;

use crate::client::{PmsClient, SendMessageRequest};

/// PMS adapter implementing [`PmsApi`].
pub struct PmsChannel {
    client: PmsClient,
}

impl PmsChannel {
    /// Creates a new PMS adapter.
    ///
    /// Requires `config.api_key` (or the `STAYSYNC_PMS_API_KEY` environment
    /// variable) to be set.
    pub fn new(config: &PmsConfig) -> Result<Self, SyncError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("STAYSYNC_PMS_API_KEY").ok())
            .ok_or_else(|| {
                SyncError::Config("pms.api_key is required for the PMS adapter".into())
            })?;

        let client = PmsClient::new(
            config.base_url.clone(),
            &api_key,
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self { client })
    }

    /// Wrap an existing client (for testing with wiremock).
    pub fn from_client(client: PmsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PmsApi for PmsChannel {
    async fn send_message(
        &self,
        booking_id: &str,
        text: &str,
        channel: &str,
    ) -> Result<PmsAck, SyncError> {
        let response = self
            .client
            .send_message(&SendMessageRequest {
                booking_id,
                body: text,
                channel,
            })
            .await?;
        debug!(
            booking_id,
            external_message_id = response.message_id.as_deref().unwrap_or("-"),
            "PMS message accepted"
        );
        Ok(PmsAck {
            external_message_id: response.message_id,
        })
    }

    async fn fetch_booking(&self, booking_id: &str) -> Result<BookingRecord, SyncError> {
        let booking = self.client.fetch_booking(booking_id).await?;
        Ok(BookingRecord {
            id: booking.id,
            guest_name: booking.guest_name,
            listing_external_id: booking.listing_id,
            channel: booking.channel,
        })
    }
}
