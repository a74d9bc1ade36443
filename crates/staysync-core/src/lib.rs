// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the staysync engine.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the staysync workspace. All transport and
//! storage adapters implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::SyncError;
pub use types::{
    Conversation, ConversationStatus, DeliveryOutcome, Direction, MessageRecord, SendStage,
    Sender, SyncReport, Transport,
};

// Re-export all adapter traits at crate root.
pub use traits::{
    BrowserTransport, CredentialStore, PlatformSession, PmsApi, ReplyGenerator, SyncStore,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_error_has_all_variants() {
        // Verify the full error taxonomy exists and can be constructed.
        let _config = SyncError::Config("test".into());
        let _store = SyncError::Store {
            source: Box::new(std::io::Error::other("test")),
        };
        let _expired = SyncError::SessionExpired {
            host_id: "h".into(),
        };
        let _unavailable = SyncError::TransportUnavailable {
            transport: Transport::PmsApi,
            reason: "disabled".into(),
        };
        let _fetch = SyncError::RemoteFetchFailed {
            message: "test".into(),
            source: None,
        };
        let _send = SyncError::RemoteSendFailed {
            stage: Some(SendStage::Navigate),
            message: "test".into(),
            source: None,
        };
        let _none = SyncError::NoDeliveryChannel;
        let _conflict = SyncError::StoreWriteConflict("test".into());
        let _reply = SyncError::ReplyGeneration {
            message: "test".into(),
            source: None,
        };
        let _timeout = SyncError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = SyncError::Internal("test".into());
    }

    #[test]
    fn all_trait_modules_are_exported() {
        // If any seam trait is missing or fails to compile, this won't build.
        fn _assert_store<T: SyncStore>() {}
        fn _assert_reply<T: ReplyGenerator>() {}
        fn _assert_pms<T: PmsApi>() {}
        fn _assert_browser<T: BrowserTransport>() {}
        fn _assert_session<T: PlatformSession>() {}
        fn _assert_credentials<T: CredentialStore>() {}
    }
}
