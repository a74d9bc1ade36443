// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Browser-automation transport traits.

use async_trait::async_trait;

use crate::error::SyncError;
use crate::types::{HostRecord, RemoteListing, RemoteMessage, RemoteThread, UiSendReceipt};

/// Factory for authenticated platform sessions.
///
/// Each synchronization pass owns exactly one session; the orchestrator is
/// responsible for calling [`PlatformSession::close`] on every exit path.
#[async_trait]
pub trait BrowserTransport: Send + Sync {
    async fn open(&self, host: &HostRecord) -> Result<Box<dyn PlatformSession>, SyncError>;
}

/// One authenticated session against the booking platform, threaded as an
/// explicit value through resolver, fetcher, and UI send for the duration of
/// a single pass. Never stored in process-wide state.
#[async_trait]
pub trait PlatformSession: Send + Sync {
    fn host_id(&self) -> &str;

    /// Enumerate listings visible to this session.
    async fn list_listings(&self) -> Result<Vec<RemoteListing>, SyncError>;

    /// Thread summaries visible to this session, across all listings plus
    /// direct host-guest conversations.
    async fn list_threads(&self) -> Result<Vec<RemoteThread>, SyncError>;

    /// Full message history of one thread. Remote surfaces return complete
    /// snapshots, not deltas.
    async fn fetch_thread(
        &self,
        external_thread_id: &str,
    ) -> Result<Vec<RemoteMessage>, SyncError>;

    /// Send reply text into the thread via the platform's own UI.
    async fn send_reply(
        &self,
        external_thread_id: &str,
        text: &str,
    ) -> Result<UiSendReceipt, SyncError>;

    /// Release the session and its underlying browser resources.
    async fn close(&self) -> Result<(), SyncError>;
}
