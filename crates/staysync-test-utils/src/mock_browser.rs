// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock browser transport and platform session for deterministic testing.
//!
//! The scripted platform state is shared between the transport and every
//! session it opens, so tests can assert on sends and session lifecycle
//! after a pass completes.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use staysync_core::types::{
    HostRecord, RemoteListing, RemoteMessage, RemoteThread, UiSendReceipt,
};
use staysync_core::{
    BrowserTransport, PlatformSession, SendStage, SyncError, Transport,
};
use tokio::sync::Mutex;

/// One captured UI send.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedUiSend {
    pub external_thread_id: String,
    pub text: String,
}

/// Scripted remote platform state.
#[derive(Default)]
pub struct MockPlatform {
    listings: Mutex<Vec<RemoteListing>>,
    threads: Mutex<Vec<RemoteThread>>,
    messages: Mutex<HashMap<String, Vec<RemoteMessage>>>,
    sent: Mutex<Vec<CapturedUiSend>>,
    fail_list_listings: AtomicBool,
    fail_ui_sends: AtomicBool,
    expire_on_list_threads: AtomicBool,
    expire_on_fetch: AtomicBool,
    fail_open: AtomicBool,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl MockPlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn add_listing(&self, external_id: &str, name: &str) {
        self.listings.lock().await.push(RemoteListing {
            external_id: external_id.to_string(),
            name: name.to_string(),
        });
    }

    /// Script one thread and its full message snapshot.
    pub async fn add_thread(&self, thread: RemoteThread, messages: Vec<RemoteMessage>) {
        self.messages
            .lock()
            .await
            .insert(thread.external_id.clone(), messages);
        self.threads.lock().await.push(thread);
    }

    pub fn set_fail_list_listings(&self, fail: bool) {
        self.fail_list_listings.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_ui_sends(&self, fail: bool) {
        self.fail_ui_sends.store(fail, Ordering::SeqCst);
    }

    pub fn set_expire_on_list_threads(&self, expire: bool) {
        self.expire_on_list_threads.store(expire, Ordering::SeqCst);
    }

    pub fn set_expire_on_fetch(&self, expire: bool) {
        self.expire_on_fetch.store(expire, Ordering::SeqCst);
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    pub async fn ui_sends(&self) -> Vec<CapturedUiSend> {
        self.sent.lock().await.clone()
    }

    pub fn opened_sessions(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed_sessions(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Transport handing out sessions over the shared scripted state.
pub struct MockBrowserTransport {
    platform: Arc<MockPlatform>,
}

impl MockBrowserTransport {
    pub fn new(platform: Arc<MockPlatform>) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl BrowserTransport for MockBrowserTransport {
    async fn open(&self, host: &HostRecord) -> Result<Box<dyn PlatformSession>, SyncError> {
        if self.platform.fail_open.load(Ordering::SeqCst) {
            return Err(SyncError::TransportUnavailable {
                transport: Transport::BrowserAutomation,
                reason: "mock transport scripted to fail".into(),
            });
        }
        self.platform.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            platform: self.platform.clone(),
            host_id: host.id.clone(),
        }))
    }
}

/// One scripted platform session.
pub struct MockSession {
    platform: Arc<MockPlatform>,
    host_id: String,
}

#[async_trait]
impl PlatformSession for MockSession {
    fn host_id(&self) -> &str {
        &self.host_id
    }

    async fn list_listings(&self) -> Result<Vec<RemoteListing>, SyncError> {
        if self.platform.fail_list_listings.load(Ordering::SeqCst) {
            return Err(SyncError::RemoteFetchFailed {
                message: "mock listing enumeration failure".into(),
                source: None,
            });
        }
        Ok(self.platform.listings.lock().await.clone())
    }

    async fn list_threads(&self) -> Result<Vec<RemoteThread>, SyncError> {
        if self.platform.expire_on_list_threads.load(Ordering::SeqCst) {
            return Err(SyncError::SessionExpired {
                host_id: self.host_id.clone(),
            });
        }
        Ok(self.platform.threads.lock().await.clone())
    }

    async fn fetch_thread(
        &self,
        external_thread_id: &str,
    ) -> Result<Vec<RemoteMessage>, SyncError> {
        if self.platform.expire_on_fetch.load(Ordering::SeqCst) {
            return Err(SyncError::SessionExpired {
                host_id: self.host_id.clone(),
            });
        }
        Ok(self
            .platform
            .messages
            .lock()
            .await
            .get(external_thread_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_reply(
        &self,
        external_thread_id: &str,
        text: &str,
    ) -> Result<UiSendReceipt, SyncError> {
        if self.platform.fail_ui_sends.load(Ordering::SeqCst) {
            return Err(SyncError::RemoteSendFailed {
                stage: Some(SendStage::LocateInput),
                message: "mock composer not found".into(),
                source: None,
            });
        }
        self.platform.sent.lock().await.push(CapturedUiSend {
            external_thread_id: external_thread_id.to_string(),
            text: text.to_string(),
        });
        Ok(UiSendReceipt {
            external_message_id: None,
            verified: true,
        })
    }

    async fn close(&self) -> Result<(), SyncError> {
        self.platform.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
