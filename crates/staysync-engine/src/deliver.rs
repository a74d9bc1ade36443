// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery routing with channel failover.
//!
//! The attempt order is data, not control flow: a plan is built per
//! conversation, evaluated in order, stopping at the first success. A PMS
//! failure is logged and demoted to the next channel, never re-raised. On
//! success the router persists the outbound message with `metadata.channel`
//! naming the channel that actually delivered, which may differ from the
//! first one attempted.

use staysync_core::types::{Conversation, DeliveryOutcome, HostRecord, NewMessage};
use staysync_core::{Direction, PlatformSession, PmsApi, SyncError, SyncStore, Transport};
use tracing::{debug, info, warn};

/// PMS channel identifier passed through to the vendor API.
const PMS_MESSAGE_CHANNEL: &str = "booking_platform";

/// Everything one delivery needs.
pub struct DeliveryRequest<'a> {
    pub host: &'a HostRecord,
    pub conversation: &'a Conversation,
    pub text: &'a str,
    /// False for diagnostic/manual sends bypassing reply generation.
    pub is_ai_generated: bool,
}

/// Build the ordered channel attempt list for one conversation.
///
/// PMS is eligible only with an active, credentialed integration AND a known
/// booking id; browser automation is the universal fallback when enabled.
pub fn build_plan(
    host: &HostRecord,
    conversation: &Conversation,
    pms_available: bool,
    automation_available: bool,
) -> Vec<Transport> {
    let mut plan = Vec::new();
    if pms_available && host.pms_enabled && conversation.external_booking_id.is_some() {
        plan.push(Transport::PmsApi);
    }
    if automation_available && host.automation_enabled {
        plan.push(Transport::BrowserAutomation);
    }
    plan
}

/// Attempt delivery along the plan and persist the outbound message on
/// success.
///
/// `Err` is reserved for [`SyncError::SessionExpired`], which the caller
/// must treat as a pass-level short-circuit; every other failure lands in
/// the returned outcome.
pub async fn deliver(
    store: &dyn SyncStore,
    pms: Option<&dyn PmsApi>,
    session: Option<&dyn PlatformSession>,
    request: &DeliveryRequest<'_>,
) -> Result<DeliveryOutcome, SyncError> {
    let plan = build_plan(
        request.host,
        request.conversation,
        pms.is_some(),
        session.is_some(),
    );
    if plan.is_empty() {
        // Terminal per-message: nothing is persisted as sent.
        debug!(
            conversation_id = request.conversation.id.as_str(),
            "no delivery channel available"
        );
        return Ok(DeliveryOutcome {
            delivered: false,
            channel_used: None,
            first_attempted: None,
            error: Some(SyncError::NoDeliveryChannel.to_string()),
        });
    }

    let first_attempted = plan[0];
    let mut last_error: Option<SyncError> = None;

    for channel in plan {
        let attempt = attempt_channel(pms, session, request, channel).await;
        match attempt {
            Ok(receipt) => {
                if let Err(e) = persist_outbound(store, request, channel, receipt).await {
                    // Delivered but not recorded: surface loudly, the next
                    // pass's dedup gate will reconcile against the remote
                    // snapshot.
                    warn!(
                        conversation_id = request.conversation.id.as_str(),
                        error = %e,
                        "outbound delivered but not persisted"
                    );
                }
                metrics::counter!("staysync_replies_delivered_total").increment(1);
                info!(
                    conversation_id = request.conversation.id.as_str(),
                    channel = %channel,
                    first_attempted = %first_attempted,
                    "reply delivered"
                );
                return Ok(DeliveryOutcome {
                    delivered: true,
                    channel_used: Some(channel),
                    first_attempted: Some(first_attempted),
                    error: None,
                });
            }
            Err(e) if e.is_session_expired() => return Err(e),
            Err(e) => {
                // Demote to the next channel; keep the original error for
                // diagnostics.
                warn!(
                    conversation_id = request.conversation.id.as_str(),
                    channel = %channel,
                    error = %e,
                    "delivery attempt failed, demoting"
                );
                last_error = Some(e);
            }
        }
    }

    metrics::counter!("staysync_replies_failed_total").increment(1);
    Ok(DeliveryOutcome {
        delivered: false,
        channel_used: None,
        first_attempted: Some(first_attempted),
        error: last_error.map(|e| e.to_string()),
    })
}

struct ChannelReceipt {
    external_message_id: Option<String>,
    verified: Option<bool>,
}

async fn attempt_channel(
    pms: Option<&dyn PmsApi>,
    session: Option<&dyn PlatformSession>,
    request: &DeliveryRequest<'_>,
    channel: Transport,
) -> Result<ChannelReceipt, SyncError> {
    match channel {
        Transport::PmsApi => {
            let pms = pms.ok_or(SyncError::NoDeliveryChannel)?;
            let booking_id = request
                .conversation
                .external_booking_id
                .as_deref()
                .ok_or(SyncError::NoDeliveryChannel)?;
            let ack = pms
                .send_message(booking_id, request.text, PMS_MESSAGE_CHANNEL)
                .await?;
            Ok(ChannelReceipt {
                external_message_id: ack.external_message_id,
                verified: None,
            })
        }
        Transport::BrowserAutomation => {
            let session = session.ok_or(SyncError::NoDeliveryChannel)?;
            let thread_id = request
                .conversation
                .external_thread_id
                .as_deref()
                .ok_or_else(|| SyncError::RemoteSendFailed {
                    stage: None,
                    message: "conversation has no external thread id".into(),
                    source: None,
                })?;
            let receipt = session.send_reply(thread_id, request.text).await?;
            Ok(ChannelReceipt {
                external_message_id: receipt.external_message_id,
                verified: Some(receipt.verified),
            })
        }
        Transport::Local => Err(SyncError::TransportUnavailable {
            transport: Transport::Local,
            reason: "local conversations have no delivery channel".into(),
        }),
    }
}

async fn persist_outbound(
    store: &dyn SyncStore,
    request: &DeliveryRequest<'_>,
    channel: Transport,
    receipt: ChannelReceipt,
) -> Result<(), SyncError> {
    let metadata = serde_json::json!({
        "channel": channel,
        "listing_id": request.conversation.listing_id,
        "verified": receipt.verified,
    });
    store
        .append_message_if_new(&NewMessage {
            conversation_id: request.conversation.id.clone(),
            content: request.text.to_string(),
            direction: Direction::Outbound,
            is_ai_generated: request.is_ai_generated,
            external_message_id: receipt.external_message_id,
            sent_at: chrono::Utc::now().to_rfc3339(),
            metadata: Some(metadata.to_string()),
        })
        .await?;
    Ok(())
}
