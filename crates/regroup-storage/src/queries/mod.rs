// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules over the single-writer [`Database`](crate::Database).

pub mod principals;
pub mod runs;

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use regroup_core::types::{ItemOutcome, RunStatus};

/// Format a timestamp the way the schema defaults do
/// (`strftime('%Y-%m-%dT%H:%M:%fZ', 'now')`).
pub(crate) fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp back into `DateTime<Utc>`.
pub(crate) fn parse_ts(column: usize, s: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

/// Parse a stored outcome tag. Unknown tags surface as conversion errors
/// rather than being silently dropped from tallies.
pub(crate) fn parse_outcome(column: usize, s: &str) -> Result<ItemOutcome, rusqlite::Error> {
    ItemOutcome::from_str(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

/// Parse a stored run status tag.
pub(crate) fn parse_status(column: usize, s: &str) -> Result<RunStatus, rusqlite::Error> {
    RunStatus::from_str(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}
