// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the staysync engine.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The transport a conversation or delivery attempt goes through.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// Official property-management-system API integration.
    PmsApi,
    /// Simulated-browser automation against the platform's own web UI.
    BrowserAutomation,
    /// Created locally, no remote counterpart.
    Local,
}

/// Message direction from the host's point of view.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Guest to host.
    Inbound,
    /// Host to guest.
    Outbound,
}

/// Conversation lifecycle state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Open,
    Closed,
}

/// The stage of the UI send primitive that an error is tagged with.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SendStage {
    /// Navigate to the thread view.
    Navigate,
    /// Locate the message-composition input.
    LocateInput,
    /// Set the input's content.
    EnterText,
    /// Locate and activate the send control.
    LocateSend,
    /// Opportunistic post-send verification.
    Verify,
}

/// Classified sender of a remote message.
///
/// `UnknownLowConfidence` is a distinct state: the participant-role map had
/// no match and the heuristic fallback is lossy. It is logged at WARN when
/// produced and never coerced to `Host`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    Guest,
    Host,
    UnknownLowConfidence,
}

/// A host account whose guest conversations this engine synchronizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostRecord {
    pub id: String,
    pub name: String,
    /// Whether an active, credentialed PMS integration exists for this host.
    pub pms_enabled: bool,
    /// Whether the browser-automation transport is enabled for this host.
    pub automation_enabled: bool,
    /// Login identity on the booking platform, used by the session provider.
    pub platform_login: Option<String>,
    pub created_at: String,
}

/// A local property (listing) belonging to a host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub id: String,
    pub host_id: String,
    pub name: String,
    /// Platform-native listing id, once known.
    pub external_listing_id: Option<String>,
    pub created_at: String,
}

/// Per-listing record of which external identifier is known and over which
/// transport, letting the resolver skip automated discovery once it exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingBinding {
    pub listing_id: String,
    pub external_listing_id: String,
    pub transport: Transport,
    /// `configured` or `name_heuristic`.
    pub matched_by: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A stored conversation: one guest-host thread for one listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub listing_id: String,
    pub guest_display_name: String,
    pub external_thread_id: Option<String>,
    pub source_transport: Transport,
    /// External booking reference, when the remote thread carries one.
    /// Required for the PMS delivery channel to be eligible.
    pub external_booking_id: Option<String>,
    pub status: ConversationStatus,
    pub last_message_at: Option<String>,
    pub created_at: String,
}

/// Input for conversation upsert. The store assigns the id on first sight
/// and returns the canonical row for an already-known remote thread.
#[derive(Debug, Clone, PartialEq)]
pub struct NewConversation {
    pub listing_id: String,
    pub guest_display_name: String,
    pub external_thread_id: Option<String>,
    pub source_transport: Transport,
    pub external_booking_id: Option<String>,
}

/// A stored message. Append-only: never edited or deleted by this subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub conversation_id: String,
    pub content: String,
    pub direction: Direction,
    pub is_ai_generated: bool,
    pub external_message_id: Option<String>,
    pub sent_at: String,
    /// Free-form JSON: delivering channel, listing id, raw remote timestamps,
    /// sender-classification confidence.
    pub metadata: Option<String>,
    pub created_at: String,
}

/// Input for the idempotent message append.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub conversation_id: String,
    pub content: String,
    pub direction: Direction,
    pub is_ai_generated: bool,
    pub external_message_id: Option<String>,
    pub sent_at: String,
    pub metadata: Option<String>,
}

/// A listing as enumerated from the automated platform session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteListing {
    pub external_id: String,
    pub name: String,
}

/// A thread summary as returned by the platform surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteThread {
    pub external_id: String,
    pub guest_display_name: String,
    /// Absent for direct host-guest conversations outside any listing.
    pub external_listing_id: Option<String>,
    pub external_booking_id: Option<String>,
    /// Direct host-guest conversation flagged by the remote UI.
    pub is_direct: bool,
    pub last_activity_at: Option<String>,
}

/// One normalized message from a remote thread snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteMessage {
    pub content: String,
    pub sender: Sender,
    pub sent_at: String,
    pub external_message_id: Option<String>,
}

/// One cookie of an authenticated platform session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
}

/// Receipt from the UI send primitive.
///
/// `verified: false` still means "probably sent": a failed verification after
/// a non-throwing send action is reported as success, because false negatives
/// cause duplicate-send retries that are worse than an unverified send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiSendReceipt {
    pub external_message_id: Option<String>,
    pub verified: bool,
}

/// Acknowledgement from the PMS send endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PmsAck {
    pub external_message_id: Option<String>,
}

/// Booking record fields this core touches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub id: String,
    pub guest_name: Option<String>,
    pub listing_external_id: Option<String>,
    pub channel: Option<String>,
}

/// Listing context handed to the reply generator alongside the guest message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingContext {
    pub listing_name: String,
    pub guest_display_name: String,
    pub host_name: String,
}

/// Outcome of a delivery attempt through the channel failover router.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryOutcome {
    pub delivered: bool,
    /// The channel that actually delivered, distinct from `first_attempted`
    /// when failover happened.
    pub channel_used: Option<Transport>,
    pub first_attempted: Option<Transport>,
    pub error: Option<String>,
}

/// Aggregate result of one synchronization pass for one host.
///
/// Always reports partial success counts plus accumulated error strings;
/// a pass never raises out of the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub host_id: String,
    pub listings_found: usize,
    pub conversations_found: usize,
    pub messages_processed: usize,
    pub replies_sent: usize,
    pub errors: Vec<String>,
}

impl SyncReport {
    pub fn new(host_id: &str) -> Self {
        Self {
            host_id: host_id.to_string(),
            ..Default::default()
        }
    }

    /// Record a scoped failure without aborting sibling work.
    pub fn push_error(&mut self, context: &str, err: &crate::error::SyncError) {
        self.errors.push(format!("{context}: {err}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn transport_round_trips_through_strings() {
        for t in [Transport::PmsApi, Transport::BrowserAutomation, Transport::Local] {
            let s = t.to_string();
            assert_eq!(Transport::from_str(&s).unwrap(), t);
        }
        assert_eq!(Transport::PmsApi.to_string(), "pms_api");
        assert_eq!(
            Transport::BrowserAutomation.to_string(),
            "browser_automation"
        );
    }

    #[test]
    fn direction_and_status_serialize_snake_case() {
        assert_eq!(Direction::Inbound.to_string(), "inbound");
        assert_eq!(ConversationStatus::Open.to_string(), "open");
        let json = serde_json::to_string(&Direction::Outbound).unwrap();
        assert_eq!(json, "\"outbound\"");
    }

    #[test]
    fn send_stage_names_are_stable() {
        assert_eq!(SendStage::Navigate.to_string(), "navigate");
        assert_eq!(SendStage::LocateInput.to_string(), "locate_input");
        assert_eq!(SendStage::Verify.to_string(), "verify");
    }

    #[test]
    fn report_accumulates_errors() {
        let mut report = SyncReport::new("host-1");
        report.push_error(
            "listing prop-1",
            &crate::error::SyncError::NoDeliveryChannel,
        );
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("listing prop-1:"));
    }
}
