// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Principal rows: the candidate source and credential lifecycle updates.

use chrono::{DateTime, Utc};
use regroup_core::RegroupError;
use regroup_core::types::Principal;
use rusqlite::{Row, params};

use super::{fmt_ts, parse_ts};
use crate::database::{Database, map_tr_err};

fn principal_from_row(row: &Row<'_>) -> Result<Principal, rusqlite::Error> {
    let expires: Option<String> = row.get(3)?;
    Ok(Principal {
        id: row.get(0)?,
        enc_access_token: row.get(1)?,
        enc_refresh_token: row.get(2)?,
        token_expires_at: expires.map(|s| parse_ts(3, &s)).transpose()?,
        manually_authorized: row.get(4)?,
        revoked: row.get(5)?,
    })
}

/// Fetch all principals in authorization order (oldest first).
pub async fn fetch_all(db: &Database) -> Result<Vec<Principal>, RegroupError> {
    db.connection()
        .call(|conn| -> Result<Vec<Principal>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, enc_access_token, enc_refresh_token, token_expires_at,
                        manually_authorized, revoked
                 FROM principals ORDER BY rowid",
            )?;
            let rows = stmt.query_map([], principal_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a principal row (used by the authorization handshake and tests).
pub async fn insert_principal(db: &Database, principal: &Principal) -> Result<(), RegroupError> {
    let p = principal.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO principals
                   (id, enc_access_token, enc_refresh_token, token_expires_at,
                    manually_authorized, revoked)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    p.id,
                    p.enc_access_token,
                    p.enc_refresh_token,
                    p.token_expires_at.map(|ts| fmt_ts(&ts)),
                    p.manually_authorized,
                    p.revoked,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Atomically replace the stored credential pair and expiry after a refresh.
pub async fn store_credentials(
    db: &Database,
    principal_id: &str,
    enc_access_token: Vec<u8>,
    enc_refresh_token: Vec<u8>,
    expires_at: DateTime<Utc>,
) -> Result<(), RegroupError> {
    let principal_id = principal_id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE principals SET enc_access_token = ?1, enc_refresh_token = ?2,
                 token_expires_at = ?3,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?4",
                params![
                    enc_access_token,
                    enc_refresh_token,
                    fmt_ts(&expires_at),
                    principal_id,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Mark a principal revoked and clear stored credentials.
pub async fn mark_revoked(db: &Database, principal_id: &str) -> Result<(), RegroupError> {
    let principal_id = principal_id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE principals SET revoked = 1,
                 enc_access_token = NULL, enc_refresh_token = NULL, token_expires_at = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![principal_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn principal(id: &str) -> Principal {
        Principal {
            id: id.to_string(),
            enc_access_token: Some(vec![1, 2, 3]),
            enc_refresh_token: Some(vec![4, 5, 6]),
            token_expires_at: Some(Utc::now() + Duration::hours(2)),
            manually_authorized: false,
            revoked: false,
        }
    }

    #[tokio::test]
    async fn fetch_all_preserves_insertion_order() {
        let (db, _dir) = setup_db().await;
        for id in ["alpha", "bravo", "charlie"] {
            insert_principal(&db, &principal(id)).await.unwrap();
        }

        let all = fetch_all(&db).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "bravo", "charlie"]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn store_credentials_replaces_pair_and_expiry() {
        let (db, _dir) = setup_db().await;
        insert_principal(&db, &principal("u1")).await.unwrap();

        let new_expiry = Utc::now() + Duration::days(7);
        store_credentials(&db, "u1", vec![9, 9], vec![8, 8], new_expiry)
            .await
            .unwrap();

        let all = fetch_all(&db).await.unwrap();
        let p = &all[0];
        assert_eq!(p.enc_access_token.as_deref(), Some(&[9u8, 9][..]));
        assert_eq!(p.enc_refresh_token.as_deref(), Some(&[8u8, 8][..]));
        // Millisecond precision survives the round-trip.
        let stored = p.token_expires_at.unwrap();
        assert!((stored - new_expiry).num_milliseconds().abs() <= 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_revoked_clears_credentials() {
        let (db, _dir) = setup_db().await;
        insert_principal(&db, &principal("u1")).await.unwrap();

        mark_revoked(&db, "u1").await.unwrap();

        let all = fetch_all(&db).await.unwrap();
        let p = &all[0];
        assert!(p.revoked);
        assert!(p.enc_access_token.is_none());
        assert!(p.enc_refresh_token.is_none());
        assert!(p.token_expires_at.is_none());

        db.close().await.unwrap();
    }
}
