// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host/property registry lookups.
//!
//! The registry is a consumed collaborator: this core reads it and only ever
//! writes the learned external listing id via the binding path. The create
//! helpers exist for seeding (CLI setup and tests).

use rusqlite::params;
use staysync_core::SyncError;
use staysync_core::types::{HostRecord, PropertyRecord};

use crate::database::Database;

fn row_to_host(row: &rusqlite::Row<'_>) -> rusqlite::Result<HostRecord> {
    Ok(HostRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        pms_enabled: row.get(2)?,
        automation_enabled: row.get(3)?,
        platform_login: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn row_to_property(row: &rusqlite::Row<'_>) -> rusqlite::Result<PropertyRecord> {
    Ok(PropertyRecord {
        id: row.get(0)?,
        host_id: row.get(1)?,
        name: row.get(2)?,
        external_listing_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Seed a host record.
pub async fn create_host(db: &Database, host: &HostRecord) -> Result<(), SyncError> {
    let host = host.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO hosts (id, name, pms_enabled, automation_enabled, platform_login, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    host.id,
                    host.name,
                    host.pms_enabled,
                    host.automation_enabled,
                    host.platform_login,
                    host.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Seed a property record.
pub async fn create_property(db: &Database, property: &PropertyRecord) -> Result<(), SyncError> {
    let property = property.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO properties (id, host_id, name, external_listing_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    property.id,
                    property.host_id,
                    property.name,
                    property.external_listing_id,
                    property.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a host by id.
pub async fn get_host(db: &Database, id: &str) -> Result<Option<HostRecord>, SyncError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, pms_enabled, automation_enabled, platform_login, created_at
                 FROM hosts WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], row_to_host);
            match result {
                Ok(host) => Ok(Some(host)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List all hosts.
pub async fn list_hosts(db: &Database) -> Result<Vec<HostRecord>, SyncError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, pms_enabled, automation_enabled, platform_login, created_at
                 FROM hosts ORDER BY created_at ASC",
            )?;
            let rows = stmt.query_map([], row_to_host)?;
            let mut hosts = Vec::new();
            for row in rows {
                hosts.push(row?);
            }
            Ok(hosts)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a property by id.
pub async fn get_property(db: &Database, id: &str) -> Result<Option<PropertyRecord>, SyncError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, host_id, name, external_listing_id, created_at
                 FROM properties WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], row_to_property);
            match result {
                Ok(property) => Ok(Some(property)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Properties of one host, in creation order (the first is the default
/// context for direct host-guest conversations).
pub async fn list_properties(
    db: &Database,
    host_id: &str,
) -> Result<Vec<PropertyRecord>, SyncError> {
    let host_id = host_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, host_id, name, external_listing_id, created_at
                 FROM properties WHERE host_id = ?1 ORDER BY created_at ASC, id ASC",
            )?;
            let rows = stmt.query_map(params![host_id], row_to_property)?;
            let mut properties = Vec::new();
            for row in rows {
                properties.push(row?);
            }
            Ok(properties)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_host(id: &str) -> HostRecord {
        HostRecord {
            id: id.to_string(),
            name: "Alice".into(),
            pms_enabled: true,
            automation_enabled: true,
            platform_login: Some("alice@example.com".into()),
            created_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[tokio::test]
    async fn create_and_get_host_roundtrips() {
        let (db, _dir) = setup_db().await;
        create_host(&db, &make_host("h1")).await.unwrap();

        let host = get_host(&db, "h1").await.unwrap().unwrap();
        assert_eq!(host.name, "Alice");
        assert!(host.pms_enabled);
        assert_eq!(host.platform_login.as_deref(), Some("alice@example.com"));

        assert!(get_host(&db, "missing").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_properties_in_creation_order() {
        let (db, _dir) = setup_db().await;
        create_host(&db, &make_host("h1")).await.unwrap();

        for (id, ts) in [("p1", "2026-01-01T00:00:01Z"), ("p2", "2026-01-01T00:00:02Z")] {
            create_property(
                &db,
                &PropertyRecord {
                    id: id.into(),
                    host_id: "h1".into(),
                    name: format!("Listing {id}"),
                    external_listing_id: None,
                    created_at: ts.into(),
                },
            )
            .await
            .unwrap();
        }

        let properties = list_properties(&db, "h1").await.unwrap();
        assert_eq!(properties.len(), 2);
        assert_eq!(properties[0].id, "p1");

        db.close().await.unwrap();
    }
}
