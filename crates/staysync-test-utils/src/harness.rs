// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness wiring a real SQLite store with mock adapters.

use std::sync::Arc;

use staysync_config::model::StorageConfig;
use staysync_core::types::{HostRecord, PropertyRecord, RemoteMessage, RemoteThread, Sender};
use staysync_engine::SyncEngine;
use staysync_storage::SqliteStore;

use crate::mock_browser::{MockBrowserTransport, MockPlatform};
use crate::mock_pms::MockPmsApi;
use crate::mock_reply::MockReplyGenerator;

/// An engine over a tempdir-backed SQLite store with scripted collaborators.
pub struct TestHarness {
    pub engine: SyncEngine,
    pub store: Arc<SqliteStore>,
    pub reply: Arc<MockReplyGenerator>,
    pub pms: Arc<MockPmsApi>,
    pub platform: Arc<MockPlatform>,
    _dir: tempfile::TempDir,
}

impl TestHarness {
    /// Harness with the PMS adapter wired in.
    pub async fn new() -> Self {
        Self::build(true).await
    }

    /// Harness without any PMS adapter configured.
    pub async fn without_pms() -> Self {
        Self::build(false).await
    }

    async fn build(with_pms: bool) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("staysync-test.db");
        let store = Arc::new(SqliteStore::new(StorageConfig {
            database_path: db_path.to_str().expect("utf-8 path").to_string(),
            wal_mode: true,
        }));
        store.initialize().await.expect("store init");

        let reply = Arc::new(MockReplyGenerator::new("Thanks, checking for you!"));
        let pms = Arc::new(MockPmsApi::new());
        let platform = MockPlatform::new();
        let browser = Arc::new(MockBrowserTransport::new(platform.clone()));

        let engine = SyncEngine::new(
            store.clone(),
            reply.clone(),
            if with_pms { Some(pms.clone()) } else { None },
            browser,
        );

        Self {
            engine,
            store,
            reply,
            pms,
            platform,
            _dir: dir,
        }
    }

    /// Seed a host record.
    pub async fn seed_host(&self, id: &str, pms_enabled: bool, automation_enabled: bool) {
        self.store
            .create_host(&HostRecord {
                id: id.to_string(),
                name: "Alice".to_string(),
                pms_enabled,
                automation_enabled,
                platform_login: Some("alice@example.com".to_string()),
                created_at: chrono::Utc::now().to_rfc3339(),
            })
            .await
            .expect("seed host");
    }

    /// Seed a property for a host.
    pub async fn seed_property(
        &self,
        id: &str,
        host_id: &str,
        name: &str,
        external_listing_id: Option<&str>,
    ) {
        self.store
            .create_property(&PropertyRecord {
                id: id.to_string(),
                host_id: host_id.to_string(),
                name: name.to_string(),
                external_listing_id: external_listing_id.map(String::from),
                created_at: chrono::Utc::now().to_rfc3339(),
            })
            .await
            .expect("seed property");
    }
}

/// A remote thread summary with the fields tests usually care about.
pub fn thread(external_id: &str, listing: Option<&str>, booking: Option<&str>) -> RemoteThread {
    RemoteThread {
        external_id: external_id.to_string(),
        guest_display_name: "Bob".to_string(),
        external_listing_id: listing.map(String::from),
        external_booking_id: booking.map(String::from),
        is_direct: listing.is_none(),
        last_activity_at: None,
    }
}

/// A guest message at the given timestamp.
pub fn guest_message(content: &str, sent_at: &str) -> RemoteMessage {
    RemoteMessage {
        content: content.to_string(),
        sender: Sender::Guest,
        sent_at: sent_at.to_string(),
        external_message_id: None,
    }
}

/// A host message at the given timestamp.
pub fn host_message(content: &str, sent_at: &str) -> RemoteMessage {
    RemoteMessage {
        content: content.to_string(),
        sender: Sender::Host,
        sent_at: sent_at.to_string(),
        external_message_id: None,
    }
}

/// A message whose sender classification fell back to heuristics.
pub fn low_confidence_message(content: &str, sent_at: &str) -> RemoteMessage {
    RemoteMessage {
        content: content.to_string(),
        sender: Sender::UnknownLowConfidence,
        sent_at: sent_at.to_string(),
        external_message_id: None,
    }
}
