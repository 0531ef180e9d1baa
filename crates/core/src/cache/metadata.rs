//! Metadata record persistence.
//!
//! One row keyed by [`METADATA_KEY`] holds every per-URL fetch timestamp and
//! the network-health fields, serialized in the shape
//! `{ "<url>": millis, "slowUntil"?: millis, "retryAt"?: millis }`.

use std::collections::BTreeMap;

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Constant key of the single metadata row.
pub const METADATA_KEY: &str = "bundlecache-meta";

/// Per-URL timestamps merged with the network-health singleton.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    /// Network is distrusted while `now < slow_until`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow_until: Option<i64>,

    /// Recorded alongside `slow_until`; nothing gates on it yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_at: Option<i64>,

    /// Last successful fetch (or resync touch) per normalized URL, epoch millis.
    #[serde(flatten)]
    pub fetched_at: BTreeMap<String, i64>,
}

impl MetadataRecord {
    pub fn last_fetched(&self, url: &str) -> Option<i64> {
        self.fetched_at.get(url).copied()
    }

    pub fn stamp(&mut self, url: &str, now: i64) {
        self.fetched_at.insert(url.to_string(), now);
    }

    /// Age of the entry for `url` at `now`, if a timestamp is known.
    pub fn age(&self, url: &str, now: i64) -> Option<i64> {
        self.last_fetched(url).map(|at| now.saturating_sub(at))
    }
}

impl CacheDb {
    /// Read the metadata record.
    ///
    /// Returns None if nothing has been persisted yet.
    pub async fn load_metadata(&self) -> Result<Option<MetadataRecord>, Error> {
        self.conn
            .call(|conn| -> Result<Option<MetadataRecord>, Error> {
                let result = conn.query_row(
                    "SELECT record_json FROM metadata WHERE key = ?1",
                    params![METADATA_KEY],
                    |row| row.get::<_, String>(0),
                );

                match result {
                    Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Overwrite the metadata record. Last write wins.
    pub async fn save_metadata(&self, record: &MetadataRecord) -> Result<(), Error> {
        let json = serde_json::to_string(record)?;
        let updated_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO metadata (key, record_json, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET
                        record_json = excluded.record_json,
                        updated_at = excluded.updated_at",
                    params![METADATA_KEY, json, updated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}
