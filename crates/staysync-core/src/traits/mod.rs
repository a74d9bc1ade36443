// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the staysync engine.
//!
//! Every external collaborator the engine touches sits behind one of these
//! seams: the canonical store, the reply-generation service, the PMS API
//! client, the browser-automation transport, and the credential store.

pub mod browser;
pub mod credentials;
pub mod pms;
pub mod reply;
pub mod store;

pub use browser::{BrowserTransport, PlatformSession};
pub use credentials::CredentialStore;
pub use pms::PmsApi;
pub use reply::ReplyGenerator;
pub use store::SyncStore;
