// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the SyncStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use staysync_config::model::StorageConfig;
use staysync_core::types::{
    Conversation, HostRecord, ListingBinding, MessageRecord, NewConversation, NewMessage,
    PropertyRecord,
};
use staysync_core::{SyncError, SyncStore};

use crate::database::Database;
use crate::queries;

/// SQLite-backed sync store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first call
/// to [`SqliteStore::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given configuration.
    ///
    /// The database connection is not opened until `initialize` is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database at the configured path and run migrations.
    pub async fn initialize(&self) -> Result<(), SyncError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| SyncError::Store {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    /// Checkpoint and release the database.
    pub async fn close(&self) -> Result<(), SyncError> {
        self.db()?.close().await
    }

    /// Seed a host record (CLI setup and tests; not part of the sync seam).
    pub async fn create_host(&self, host: &HostRecord) -> Result<(), SyncError> {
        queries::registry::create_host(self.db()?, host).await
    }

    /// Seed a property record (CLI setup and tests; not part of the sync seam).
    pub async fn create_property(&self, property: &PropertyRecord) -> Result<(), SyncError> {
        queries::registry::create_property(self.db()?, property).await
    }

    fn db(&self) -> Result<&Database, SyncError> {
        self.db.get().ok_or_else(|| SyncError::Store {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl SyncStore for SqliteStore {
    async fn upsert_conversation(
        &self,
        conversation: &NewConversation,
    ) -> Result<Conversation, SyncError> {
        queries::conversations::upsert_conversation(self.db()?, conversation).await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, SyncError> {
        queries::conversations::get_conversation(self.db()?, id).await
    }

    async fn append_message_if_new(
        &self,
        message: &NewMessage,
    ) -> Result<Option<MessageRecord>, SyncError> {
        queries::messages::append_message_if_new(self.db()?, message).await
    }

    async fn list_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<MessageRecord>, SyncError> {
        queries::messages::list_messages(self.db()?, conversation_id).await
    }

    async fn get_host(&self, id: &str) -> Result<Option<HostRecord>, SyncError> {
        queries::registry::get_host(self.db()?, id).await
    }

    async fn list_hosts(&self) -> Result<Vec<HostRecord>, SyncError> {
        queries::registry::list_hosts(self.db()?).await
    }

    async fn get_property(&self, id: &str) -> Result<Option<PropertyRecord>, SyncError> {
        queries::registry::get_property(self.db()?, id).await
    }

    async fn list_properties(&self, host_id: &str) -> Result<Vec<PropertyRecord>, SyncError> {
        queries::registry::list_properties(self.db()?, host_id).await
    }

    async fn get_binding(&self, listing_id: &str) -> Result<Option<ListingBinding>, SyncError> {
        queries::bindings::get_binding(self.db()?, listing_id).await
    }

    async fn upsert_binding(&self, binding: &ListingBinding) -> Result<(), SyncError> {
        queries::bindings::upsert_binding(self.db()?, binding).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use staysync_core::types::{Direction, Transport};
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    async fn seeded_store(path: &str) -> SqliteStore {
        let store = SqliteStore::new(make_config(path));
        store.initialize().await.unwrap();
        store
            .create_host(&HostRecord {
                id: "h1".into(),
                name: "Alice".into(),
                pms_enabled: false,
                automation_enabled: true,
                platform_login: None,
                created_at: "2026-01-01T00:00:00Z".into(),
            })
            .await
            .unwrap();
        store
            .create_property(&PropertyRecord {
                id: "p1".into(),
                host_id: "h1".into(),
                name: "Flat".into(),
                external_listing_id: None,
                created_at: "2026-01-01T00:00:00Z".into(),
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let store = SqliteStore::new(make_config(db_path.to_str().unwrap()));

        store.initialize().await.unwrap();
        assert!(store.initialize().await.is_err());
    }

    #[tokio::test]
    async fn operations_fail_before_initialize() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("uninit.db");
        let store = SqliteStore::new(make_config(db_path.to_str().unwrap()));
        assert!(store.get_host("h1").await.is_err());
    }

    #[tokio::test]
    async fn full_conversation_lifecycle_through_store() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("lifecycle.db");
        let store = seeded_store(db_path.to_str().unwrap()).await;

        let conversation = store
            .upsert_conversation(&NewConversation {
                listing_id: "p1".into(),
                guest_display_name: "Bob".into(),
                external_thread_id: Some("t1".into()),
                source_transport: Transport::BrowserAutomation,
                external_booking_id: None,
            })
            .await
            .unwrap();

        let inserted = store
            .append_message_if_new(&NewMessage {
                conversation_id: conversation.id.clone(),
                content: "Where is the key?".into(),
                direction: Direction::Inbound,
                is_ai_generated: false,
                external_message_id: Some("m1".into()),
                sent_at: "2026-01-01T10:00:00Z".into(),
                metadata: None,
            })
            .await
            .unwrap();
        assert!(inserted.is_some());

        let messages = store.list_messages(&conversation.id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].direction, Direction::Inbound);

        store.close().await.unwrap();
    }
}
