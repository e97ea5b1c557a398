// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use regroup_core::RegroupError;
use tracing::debug;

use crate::migrations;

/// Handle to the single-writer SQLite database.
///
/// Cloning is cheap: clones share the same background connection thread.
#[derive(Debug, Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run all
    /// pending migrations.
    pub async fn open(path: &str) -> Result<Self, RegroupError> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| RegroupError::Storage {
                    source: Box::new(e),
                })?;
            }
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| RegroupError::Storage {
                source: Box::new(e),
            })?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            // WAL keeps readers unblocked during the long-running writer loop.
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(migrations::run_migrations)
            .await
            .map_err(map_tr_err)?;

        debug!(path, "database opened");
        Ok(Self { conn })
    }

    /// Returns the underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Close the database, flushing pending writes.
    pub async fn close(self) -> Result<(), RegroupError> {
        self.conn.close().await.map_err(map_tr_err)
    }
}

/// Convert tokio-rusqlite errors to RegroupError::Storage.
pub(crate) fn map_tr_err<E>(e: tokio_rusqlite::Error<E>) -> RegroupError
where
    E: std::error::Error + Send + Sync + 'static,
{
    RegroupError::Storage {
        source: Box::new(e),
    }
}
