// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sync orchestrator for the staysync engine.
//!
//! The [`SyncEngine`] ties the listing resolver, inbound fetcher, reply
//! generator, and delivery router into one pass-per-host synchronization
//! cycle:
//! - at most one pass per host in flight; passes for different hosts run
//!   concurrently
//! - each pass owns exactly one platform session, closed on every exit path
//! - failures scoped to one conversation or listing are accumulated into the
//!   pass report, never aborting sibling work
//! - `SessionExpired` short-circuits the remainder of the host's pass

pub mod deliver;
pub mod ingest;
pub mod resolver;

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use staysync_core::types::{
    DeliveryOutcome, HostRecord, ListingContext, NewConversation, PropertyRecord, RemoteThread,
    SyncReport,
};
use staysync_core::{
    BrowserTransport, PlatformSession, PmsApi, ReplyGenerator, SyncError, SyncStore, Transport,
};
use tracing::{debug, info, warn};

use crate::deliver::DeliveryRequest;
use crate::resolver::ResolvedListing;

/// Pass phases, logged as the state machine advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassState {
    Resolving,
    Fetching,
    Generating,
    Delivering,
}

/// The guest-message synchronization engine: one instance serves all hosts.
pub struct SyncEngine {
    store: Arc<dyn SyncStore>,
    reply: Arc<dyn ReplyGenerator>,
    pms: Option<Arc<dyn PmsApi>>,
    browser: Arc<dyn BrowserTransport>,
    in_flight: DashMap<String, ()>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn SyncStore>,
        reply: Arc<dyn ReplyGenerator>,
        pms: Option<Arc<dyn PmsApi>>,
        browser: Arc<dyn BrowserTransport>,
    ) -> Self {
        Self {
            store,
            reply,
            pms,
            browser,
            in_flight: DashMap::new(),
        }
    }

    /// Run one synchronization pass for a host.
    ///
    /// Never panics and never returns an error: every pass completes and
    /// reports partial success counts plus accumulated error strings. A pass
    /// already in flight for the same host yields an immediate one-error
    /// report, which makes overlapping timer ticks safe.
    pub async fn sync_host(&self, host_id: &str) -> SyncReport {
        let mut report = SyncReport::new(host_id);

        let Some(_guard) = PassGuard::acquire(&self.in_flight, host_id) else {
            report
                .errors
                .push(format!("pass already in flight for host {host_id}"));
            return report;
        };
        metrics::counter!("staysync_passes_total").increment(1);
        info!(host_id, "sync pass starting");

        let host = match self.store.get_host(host_id).await {
            Ok(Some(host)) => host,
            Ok(None) => {
                report.errors.push(format!("unknown host {host_id}"));
                return report;
            }
            Err(e) => {
                report.push_error("load host", &e);
                return report;
            }
        };

        let session = match self.browser.open(&host).await {
            Ok(session) => session,
            Err(e) => {
                report.push_error("open platform session", &e);
                return report;
            }
        };

        self.run_pass(&host, session.as_ref(), &mut report).await;

        // Scoped-resource discipline: the session is released on every exit
        // path, success or failure.
        if let Err(e) = session.close().await {
            report.push_error("close platform session", &e);
        }

        info!(
            host_id,
            listings = report.listings_found,
            conversations = report.conversations_found,
            messages = report.messages_processed,
            replies = report.replies_sent,
            errors = report.errors.len(),
            "sync pass complete"
        );
        report
    }

    /// Run one pass for every registered host, concurrently. The per-host
    /// guard keeps each host to a single in-flight pass.
    pub async fn sync_all_hosts(&self) -> Vec<SyncReport> {
        let hosts = match self.store.list_hosts().await {
            Ok(hosts) => hosts,
            Err(e) => {
                warn!(error = %e, "cannot enumerate hosts");
                return Vec::new();
            }
        };
        futures::future::join_all(hosts.iter().map(|host| self.sync_host(&host.id))).await
    }

    /// Diagnostic/manual send bypassing reply generation.
    ///
    /// The outbound message, if delivered, is persisted with
    /// `is_ai_generated = false` and the delivering channel in metadata.
    pub async fn send_test_reply(&self, conversation_id: &str, text: &str) -> DeliveryOutcome {
        let conversation = match self.store.get_conversation(conversation_id).await {
            Ok(Some(conversation)) => conversation,
            Ok(None) => return failed(format!("unknown conversation {conversation_id}")),
            Err(e) => return failed(e.to_string()),
        };
        let property = match self.store.get_property(&conversation.listing_id).await {
            Ok(Some(property)) => property,
            Ok(None) => return failed(format!("unknown listing {}", conversation.listing_id)),
            Err(e) => return failed(e.to_string()),
        };
        let host = match self.store.get_host(&property.host_id).await {
            Ok(Some(host)) => host,
            Ok(None) => return failed(format!("unknown host {}", property.host_id)),
            Err(e) => return failed(e.to_string()),
        };

        // A session is only needed when the browser channel is in play.
        let session = if host.automation_enabled {
            match self.browser.open(&host).await {
                Ok(session) => Some(session),
                Err(e) => {
                    warn!(host_id = host.id.as_str(), error = %e, "no session for test send");
                    None
                }
            }
        } else {
            None
        };

        let request = DeliveryRequest {
            host: &host,
            conversation: &conversation,
            text,
            is_ai_generated: false,
        };
        let outcome = match deliver::deliver(
            self.store.as_ref(),
            self.pms.as_deref(),
            session.as_deref(),
            &request,
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => failed(e.to_string()),
        };

        if let Some(session) = session
            && let Err(e) = session.close().await
        {
            warn!(error = %e, "failed to close test-send session");
        }
        outcome
    }

    async fn run_pass(
        &self,
        host: &HostRecord,
        session: &dyn PlatformSession,
        report: &mut SyncReport,
    ) {
        debug!(host_id = host.id.as_str(), state = ?PassState::Resolving);
        let properties = match self.store.list_properties(&host.id).await {
            Ok(properties) => properties,
            Err(e) => {
                report.push_error("list properties", &e);
                return;
            }
        };

        let resolved = match resolver::resolve_listings(
            host,
            &properties,
            session,
            self.store.as_ref(),
            &mut report.errors,
        )
        .await
        {
            Ok(resolved) => resolved,
            Err(e) => {
                // Only session expiry escapes the resolver.
                report.push_error("resolve listings", &e);
                return;
            }
        };
        report.listings_found = resolved.len();

        debug!(host_id = host.id.as_str(), state = ?PassState::Fetching);
        let threads = match session.list_threads().await {
            Ok(threads) => threads,
            Err(e) => {
                report.push_error("list threads", &e);
                return;
            }
        };

        let by_external: HashMap<&str, &ResolvedListing> = resolved
            .iter()
            .map(|r| (r.external_listing_id.as_str(), r))
            .collect();
        let default_property = properties.first();

        for thread in &threads {
            let result = self
                .process_thread(host, session, thread, &by_external, default_property, report)
                .await;
            if let Err(e) = result {
                // process_thread only propagates session expiry.
                report.push_error(&format!("thread {}", thread.external_id), &e);
                return;
            }
        }
    }

    /// Handle one remote thread. Per-conversation failures are recorded in
    /// the report and do not abort siblings; only `SessionExpired`
    /// propagates.
    async fn process_thread(
        &self,
        host: &HostRecord,
        session: &dyn PlatformSession,
        thread: &RemoteThread,
        by_external: &HashMap<&str, &ResolvedListing>,
        default_property: Option<&PropertyRecord>,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        // Direct host-guest conversations get the host's first listing as
        // default context.
        let (listing_id, listing_name) = if thread.is_direct {
            match default_property {
                Some(property) => (property.id.clone(), property.name.clone()),
                None => {
                    debug!(thread = thread.external_id.as_str(), "direct thread, no properties");
                    return Ok(());
                }
            }
        } else {
            match thread
                .external_listing_id
                .as_deref()
                .and_then(|id| by_external.get(id))
            {
                Some(resolved) => (resolved.property.id.clone(), resolved.property.name.clone()),
                None => {
                    debug!(
                        thread = thread.external_id.as_str(),
                        "thread belongs to no resolved listing"
                    );
                    return Ok(());
                }
            }
        };

        let conversation = match self
            .store
            .upsert_conversation(&NewConversation {
                listing_id,
                guest_display_name: thread.guest_display_name.clone(),
                external_thread_id: Some(thread.external_id.clone()),
                source_transport: Transport::BrowserAutomation,
                external_booking_id: thread.external_booking_id.clone(),
            })
            .await
        {
            Ok(conversation) => conversation,
            Err(e) => {
                report.push_error(&format!("thread {}", thread.external_id), &e);
                return Ok(());
            }
        };
        report.conversations_found += 1;

        let remote_messages = match session.fetch_thread(&thread.external_id).await {
            Ok(messages) => messages,
            Err(e) if e.is_session_expired() => return Err(e),
            Err(e) => {
                // Zero messages for this thread this pass.
                report.push_error(&format!("fetch thread {}", thread.external_id), &e);
                return Ok(());
            }
        };

        let outcome =
            match ingest::ingest_thread(self.store.as_ref(), &conversation, &remote_messages).await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    report.push_error(&format!("ingest {}", conversation.id), &e);
                    return Ok(());
                }
            };
        report.messages_processed += outcome.stored;

        let Some(reply_to) = outcome.reply_to else {
            return Ok(());
        };

        debug!(host_id = host.id.as_str(), state = ?PassState::Generating);
        let context = ListingContext {
            listing_name,
            guest_display_name: conversation.guest_display_name.clone(),
            host_name: host.name.clone(),
        };
        let reply_text = match self.reply.generate_reply(&reply_to.content, &context).await {
            Ok(text) => text,
            Err(e) => {
                report.push_error(&format!("generate reply for {}", conversation.id), &e);
                return Ok(());
            }
        };

        debug!(host_id = host.id.as_str(), state = ?PassState::Delivering);
        let request = DeliveryRequest {
            host,
            conversation: &conversation,
            text: &reply_text,
            is_ai_generated: true,
        };
        let delivery = deliver::deliver(
            self.store.as_ref(),
            self.pms.as_deref(),
            Some(session),
            &request,
        )
        .await?;

        if delivery.delivered {
            report.replies_sent += 1;
        } else if let Some(error) = delivery.error {
            report
                .errors
                .push(format!("deliver to {}: {error}", conversation.id));
        }
        Ok(())
    }
}

fn failed(error: String) -> DeliveryOutcome {
    DeliveryOutcome {
        delivered: false,
        channel_used: None,
        first_attempted: None,
        error: Some(error),
    }
}

/// RAII single-flight guard keyed by host id.
struct PassGuard<'a> {
    map: &'a DashMap<String, ()>,
    key: String,
}

impl<'a> PassGuard<'a> {
    fn acquire(map: &'a DashMap<String, ()>, key: &str) -> Option<Self> {
        use dashmap::mapref::entry::Entry;
        match map.entry(key.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(vacant) => {
                vacant.insert(());
                Some(Self {
                    map,
                    key: key.to_string(),
                })
            }
        }
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.key);
    }
}
