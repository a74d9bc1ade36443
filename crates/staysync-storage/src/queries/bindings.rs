// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Listing-transport binding persistence.

use std::str::FromStr;

use rusqlite::params;
use staysync_core::SyncError;
use staysync_core::types::{ListingBinding, Transport};

use crate::database::Database;

fn row_to_binding(row: &rusqlite::Row<'_>) -> rusqlite::Result<ListingBinding> {
    let transport: String = row.get(2)?;
    Ok(ListingBinding {
        listing_id: row.get(0)?,
        external_listing_id: row.get(1)?,
        transport: Transport::from_str(&transport).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?,
        matched_by: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Get the binding for a listing, if one has been learned.
pub async fn get_binding(
    db: &Database,
    listing_id: &str,
) -> Result<Option<ListingBinding>, SyncError> {
    let listing_id = listing_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT listing_id, external_listing_id, transport, matched_by, created_at, updated_at
                 FROM listing_bindings WHERE listing_id = ?1",
            )?;
            let result = stmt.query_row(params![listing_id], row_to_binding);
            match result {
                Ok(binding) => Ok(Some(binding)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Persist or refresh a binding. Bindings are never destroyed; a re-match
/// with a better external id updates the row in place.
pub async fn upsert_binding(db: &Database, binding: &ListingBinding) -> Result<(), SyncError> {
    let binding = binding.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO listing_bindings
                     (listing_id, external_listing_id, transport, matched_by, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (listing_id) DO UPDATE SET
                     external_listing_id = excluded.external_listing_id,
                     transport = excluded.transport,
                     matched_by = excluded.matched_by,
                     updated_at = excluded.updated_at",
                params![
                    binding.listing_id,
                    binding.external_listing_id,
                    binding.transport.to_string(),
                    binding.matched_by,
                    binding.created_at,
                    binding.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
