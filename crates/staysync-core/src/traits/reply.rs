// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply-generation collaborator trait.

use async_trait::async_trait;

use crate::error::SyncError;
use crate::types::ListingContext;

/// External reply-generation service.
///
/// Opaque to the engine: no retry or backoff logic lives on the caller side,
/// and a failure is accumulated into the pass report as-is.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Produce reply text for the given guest message and listing context.
    async fn generate_reply(
        &self,
        guest_message: &str,
        context: &ListingContext,
    ) -> Result<String, SyncError>;
}
