// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential store collaborator trait.

use async_trait::async_trait;

use crate::error::SyncError;
use crate::types::SessionCookie;

/// Supplies and caches the cookie jar of a host's automated-session
/// identity. Opaque to the engine; an implementation may perform an
/// interactive login flow to refresh stale cookies.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn cookies_for(&self, host_id: &str) -> Result<Option<Vec<SessionCookie>>, SyncError>;

    async fn store_cookies(
        &self,
        host_id: &str,
        cookies: &[SessionCookie],
    ) -> Result<(), SyncError>;
}
