// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote listing resolution.
//!
//! A property with a stored binding (or a configured external listing id) is
//! authoritative. Everything else falls back to enumerating the listings
//! visible to the automated session and matching them to local properties by
//! normalized-name containment; a fresh match persists a binding so future
//! passes skip the heuristic.

use staysync_core::types::{HostRecord, ListingBinding, PropertyRecord};
use staysync_core::{PlatformSession, SyncError, SyncStore, Transport};
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;

/// One listing the pass will synchronize.
#[derive(Debug, Clone)]
pub struct ResolvedListing {
    pub property: PropertyRecord,
    pub external_listing_id: String,
    /// Preferred outbound transport for this listing's conversations.
    pub delivery_transport: Transport,
}

/// Lowercase, strip diacritics (NFKD, drop combining marks), drop
/// non-alphanumerics.
pub fn normalize_name(name: &str) -> String {
    name.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

fn is_combining_mark(c: char) -> bool {
    // Unicode combining diacritical marks blocks.
    matches!(c, '\u{0300}'..='\u{036f}' | '\u{1ab0}'..='\u{1aff}' | '\u{20d0}'..='\u{20ff}')
}

/// Substring containment in both directions over normalized names.
pub fn names_match(local: &str, remote: &str) -> bool {
    let local = normalize_name(local);
    let remote = normalize_name(remote);
    if local.is_empty() || remote.is_empty() {
        return false;
    }
    local.contains(&remote) || remote.contains(&local)
}

/// Resolve the listings to synchronize for one host.
///
/// Enumeration failure (other than session expiry) degrades to bound
/// listings only; the caller records the error. `SessionExpired` propagates
/// so the pass can short-circuit.
pub async fn resolve_listings(
    host: &HostRecord,
    properties: &[PropertyRecord],
    session: &dyn PlatformSession,
    store: &dyn SyncStore,
    errors: &mut Vec<String>,
) -> Result<Vec<ResolvedListing>, SyncError> {
    let delivery_transport = if host.pms_enabled {
        Transport::PmsApi
    } else {
        Transport::BrowserAutomation
    };

    let mut resolved = Vec::new();
    let mut unbound = Vec::new();

    for property in properties {
        if let Some(binding) = store.get_binding(&property.id).await? {
            resolved.push(ResolvedListing {
                property: property.clone(),
                external_listing_id: binding.external_listing_id,
                delivery_transport,
            });
        } else if let Some(external_id) = &property.external_listing_id {
            // Configured id without a binding yet: persist one so the source
            // of the match is recorded.
            persist_binding(store, &property.id, external_id, delivery_transport, "configured")
                .await?;
            resolved.push(ResolvedListing {
                property: property.clone(),
                external_listing_id: external_id.clone(),
                delivery_transport,
            });
        } else {
            unbound.push(property.clone());
        }
    }

    if unbound.is_empty() {
        return Ok(resolved);
    }

    let remote_listings = match session.list_listings().await {
        Ok(listings) => listings,
        Err(e) if e.is_session_expired() => return Err(e),
        Err(e) => {
            // Discovery failure must not take down the bound listings.
            warn!(host_id = host.id.as_str(), error = %e, "listing enumeration failed");
            errors.push(format!("listing enumeration: {e}"));
            return Ok(resolved);
        }
    };
    debug!(
        host_id = host.id.as_str(),
        remote = remote_listings.len(),
        unbound = unbound.len(),
        "matching unbound properties by name"
    );

    for property in unbound {
        let matched = remote_listings
            .iter()
            .find(|remote| names_match(&property.name, &remote.name));
        match matched {
            Some(remote) => {
                info!(
                    listing_id = property.id.as_str(),
                    external_listing_id = remote.external_id.as_str(),
                    "listing matched by name heuristic"
                );
                persist_binding(
                    store,
                    &property.id,
                    &remote.external_id,
                    delivery_transport,
                    "name_heuristic",
                )
                .await?;
                resolved.push(ResolvedListing {
                    property,
                    external_listing_id: remote.external_id.clone(),
                    delivery_transport,
                });
            }
            None => {
                debug!(listing_id = property.id.as_str(), "no remote listing matched");
            }
        }
    }

    Ok(resolved)
}

async fn persist_binding(
    store: &dyn SyncStore,
    listing_id: &str,
    external_listing_id: &str,
    transport: Transport,
    matched_by: &str,
) -> Result<(), SyncError> {
    let now = chrono::Utc::now().to_rfc3339();
    store
        .upsert_binding(&ListingBinding {
            listing_id: listing_id.to_string(),
            external_listing_id: external_listing_id.to_string(),
            transport,
            matched_by: matched_by.to_string(),
            created_at: now.clone(),
            updated_at: now,
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_case_diacritics_and_punctuation() {
        assert_eq!(normalize_name("Côte d'Azur — Flat #2"), "cotedazurflat2");
        assert_eq!(normalize_name("SEA  VIEW"), "seaview");
        assert_eq!(normalize_name("Ferienwohnung Müller"), "ferienwohnungmuller");
    }

    #[test]
    fn names_match_is_bidirectional_containment() {
        assert!(names_match("Sea View Flat", "Sea View Flat - Downtown"));
        assert!(names_match("Sea View Flat - Downtown", "sea view flat"));
        assert!(names_match("Côte d'Azur", "cote dazur apartment"));
        assert!(!names_match("Sea View Flat", "Mountain Cabin"));
    }

    #[test]
    fn empty_names_never_match() {
        assert!(!names_match("", "anything"));
        assert!(!names_match("---", "anything"));
    }
}
