// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for staysync integration tests.
//!
//! Mock implementations of every engine seam plus a harness that wires a
//! real SQLite store (over a tempdir) to scripted collaborators.

pub mod harness;
pub mod mock_browser;
pub mod mock_pms;
pub mod mock_reply;

pub use harness::{TestHarness, guest_message, host_message, low_confidence_message, thread};
pub use mock_browser::{CapturedUiSend, MockBrowserTransport, MockPlatform, MockSession};
pub use mock_pms::{CapturedPmsSend, MockPmsApi};
pub use mock_reply::MockReplyGenerator;
