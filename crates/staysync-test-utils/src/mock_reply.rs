// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock reply generator for deterministic testing.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use staysync_core::types::ListingContext;
use staysync_core::{ReplyGenerator, SyncError};
use tokio::sync::Mutex;

/// Returns a canned reply and records every invocation for assertions.
pub struct MockReplyGenerator {
    reply: String,
    fail: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl MockReplyGenerator {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            fail: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make subsequent calls fail with a generic generation error.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Guest messages the generator was asked to answer.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl ReplyGenerator for MockReplyGenerator {
    async fn generate_reply(
        &self,
        guest_message: &str,
        _context: &ListingContext,
    ) -> Result<String, SyncError> {
        self.calls.lock().await.push(guest_message.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(SyncError::ReplyGeneration {
                message: "mock generation failure".into(),
                source: None,
            });
        }
        Ok(self.reply.clone())
    }
}
