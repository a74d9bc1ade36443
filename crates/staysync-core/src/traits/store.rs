// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical conversation/message store trait.

use async_trait::async_trait;

use crate::error::SyncError;
use crate::types::{
    Conversation, HostRecord, ListingBinding, MessageRecord, NewConversation, NewMessage,
    PropertyRecord,
};

/// The canonical, persistent, append-mostly record of conversations and
/// messages, plus the read-mostly host/property registry lookups the
/// resolver needs.
///
/// All writes are idempotent upserts or dedup-guarded appends, which is what
/// makes concurrent passes for different hosts safe without cross-host
/// locking.
#[async_trait]
pub trait SyncStore: Send + Sync {
    /// Insert or return the conversation for a remote thread.
    ///
    /// Dedup key: `(external_thread_id, source_transport)` when the external
    /// id is non-null. Returns the canonical stored row either way.
    async fn upsert_conversation(
        &self,
        conversation: &NewConversation,
    ) -> Result<Conversation, SyncError>;

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, SyncError>;

    /// Append a message unless an identical `(content, direction)` pair
    /// already exists in the conversation. Safe to call with the same input
    /// any number of times across passes.
    ///
    /// Returns the stored row on insert, `None` when deduplicated. An insert
    /// always touches the parent conversation's `last_message_at`.
    async fn append_message_if_new(
        &self,
        message: &NewMessage,
    ) -> Result<Option<MessageRecord>, SyncError>;

    /// Messages of a conversation in ascending `sent_at` insertion order.
    async fn list_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<MessageRecord>, SyncError>;

    // --- Registry lookups (read-only except for binding persistence) ---

    async fn get_host(&self, id: &str) -> Result<Option<HostRecord>, SyncError>;

    async fn list_hosts(&self) -> Result<Vec<HostRecord>, SyncError>;

    async fn get_property(&self, id: &str) -> Result<Option<PropertyRecord>, SyncError>;

    async fn list_properties(&self, host_id: &str) -> Result<Vec<PropertyRecord>, SyncError>;

    async fn get_binding(&self, listing_id: &str) -> Result<Option<ListingBinding>, SyncError>;

    /// Persist or refresh a listing-transport binding. Bindings are never
    /// destroyed, only updated when a better external id becomes known.
    async fn upsert_binding(&self, binding: &ListingBinding) -> Result<(), SyncError>;
}
