// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PMS API client trait.

use async_trait::async_trait;

use crate::error::SyncError;
use crate::types::{BookingRecord, PmsAck};

/// Official property-management-system integration, used for outbound
/// delivery and booking lookups when a host has one configured.
#[async_trait]
pub trait PmsApi: Send + Sync {
    /// Send a message to the guest of the given booking.
    async fn send_message(
        &self,
        booking_id: &str,
        text: &str,
        channel: &str,
    ) -> Result<PmsAck, SyncError>;

    /// Fetch the booking record behind an external booking id.
    async fn fetch_booking(&self, booking_id: &str) -> Result<BookingRecord, SyncError>;
}
