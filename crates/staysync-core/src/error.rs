// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the staysync engine.

use thiserror::Error;

use crate::types::{SendStage, Transport};

/// The primary error type used across all staysync adapter traits and core operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Store {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The automated platform session is no longer authenticated.
    ///
    /// Short-circuits the remainder of a host's pass: every subsequent
    /// automated call would fail identically. Surfaced to the credential
    /// layer as a request-new-session signal.
    #[error("platform session expired for host {host_id}")]
    SessionExpired { host_id: String },

    /// A delivery or fetch transport is disabled or not configured for this host.
    #[error("transport {transport} unavailable: {reason}")]
    TransportUnavailable {
        transport: Transport,
        reason: String,
    },

    /// A remote fetch (thread listing, thread detail, listing enumeration) failed.
    #[error("remote fetch failed: {message}")]
    RemoteFetchFailed {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A remote send failed. UI-driven sends tag the stage that broke;
    /// API-channel sends carry no stage.
    #[error("remote send failed{}: {message}", stage_suffix(.stage))]
    RemoteSendFailed {
        stage: Option<SendStage>,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No delivery channel is configured or eligible for this conversation.
    ///
    /// Terminal per-message: the inbound message stays persisted, no outbound
    /// is recorded, and the conversation awaits a future pass or manual reply.
    #[error("no delivery channel available")]
    NoDeliveryChannel,

    /// The reply-generation collaborator failed. Not retried by this core.
    #[error("reply generation failed: {message}")]
    ReplyGeneration {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Conflicting concurrent store write. Should not occur given the
    /// idempotent upsert/append operations; modeled for completeness.
    #[error("store write conflict: {0}")]
    StoreWriteConflict(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

fn stage_suffix(stage: &Option<SendStage>) -> String {
    match stage {
        Some(stage) => format!(" at stage {stage}"),
        None => String::new(),
    }
}

impl SyncError {
    /// Whether this error should short-circuit the remainder of a host's pass.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, SyncError::SessionExpired { .. })
    }
}
