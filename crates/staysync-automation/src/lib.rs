// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Browser-automation transport for the staysync engine.
//!
//! Drives the booking platform's own web interface under an authenticated
//! WebDriver session when no PMS integration exists: session acquisition
//! with cookie reuse or interactive login, inbound fetch through the SPA's
//! internal JSON API, and the staged UI send primitive with ranked
//! element-locator strategies.

pub mod fetch;
pub mod locator;
pub mod send;
pub mod session;
pub mod threadid;

pub use session::{BrowserSession, MemoryCredentialStore, WebDriverSessionProvider};
pub use threadid::{decode_thread_id, encode_thread_id};
