// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thread-id codec.
//!
//! The platform's SPA addresses threads by an opaque identifier: a
//! colon-delimited type-prefixed string, base64-encoded
//! (`base64("MessagingThread:12345")`). The externally visible id is the
//! numeric part. Both directions are needed: encode to build internal API
//! requests, decode to interpret thread listings.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

const THREAD_TYPE_PREFIX: &str = "MessagingThread";

/// Build the platform's opaque identifier from the numeric thread id.
pub fn encode_thread_id(numeric_id: u64) -> String {
    STANDARD.encode(format!("{THREAD_TYPE_PREFIX}:{numeric_id}"))
}

/// Extract the numeric thread id from an opaque identifier.
///
/// Tolerates an already-numeric input, since some listing payloads surface
/// the plain id. Returns `None` for foreign payloads (wrong type prefix,
/// invalid base64, non-numeric suffix).
pub fn decode_thread_id(opaque: &str) -> Option<u64> {
    if !opaque.is_empty() && opaque.bytes().all(|b| b.is_ascii_digit()) {
        return opaque.parse().ok();
    }

    let decoded = STANDARD.decode(opaque).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (prefix, id) = decoded.split_once(':')?;
    if prefix != THREAD_TYPE_PREFIX {
        return None;
    }
    id.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trips() {
        for id in [0u64, 1, 12345, u64::MAX] {
            assert_eq!(decode_thread_id(&encode_thread_id(id)), Some(id));
        }
    }

    #[test]
    fn encode_matches_known_shape() {
        // base64("MessagingThread:12345")
        assert_eq!(encode_thread_id(12345), "TWVzc2FnaW5nVGhyZWFkOjEyMzQ1");
    }

    #[test]
    fn decode_accepts_plain_numeric() {
        assert_eq!(decode_thread_id("4711"), Some(4711));
    }

    #[test]
    fn decode_rejects_foreign_payloads() {
        // Wrong type prefix.
        let other = STANDARD.encode("Listing:12345");
        assert_eq!(decode_thread_id(&other), None);
        // Not base64 at all.
        assert_eq!(decode_thread_id("!!not-base64!!"), None);
        // No colon delimiter.
        let flat = STANDARD.encode("MessagingThread12345");
        assert_eq!(decode_thread_id(&flat), None);
        // Non-numeric suffix.
        let bad = STANDARD.encode("MessagingThread:abc");
        assert_eq!(decode_thread_id(&bad), None);
        // Empty input.
        assert_eq!(decode_thread_id(""), None);
    }
}
