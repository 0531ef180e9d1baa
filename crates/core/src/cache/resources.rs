//! Resource cache operations.
//!
//! Response bytes are stored per cache generation, keyed by normalized URL.
//! Entries are only ever superseded wholesale by purging a generation.

use super::connection::CacheDb;
use crate::Error;
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A cached response body with the headers needed to replay it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResource {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    /// Response headers as `[name, value]` pairs, in arrival order.
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// Epoch milliseconds at which the bytes were written.
    pub stored_at: i64,
}

impl CacheDb {
    /// Insert or replace the resource for `resource.url` in `generation`.
    pub async fn put_resource(&self, generation: &str, resource: &StoredResource) -> Result<(), Error> {
        let generation = generation.to_string();
        let resource = resource.clone();
        let headers_json = serde_json::to_string(&resource.headers)?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO resources (generation, url, status, content_type, headers_json, body, stored_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     ON CONFLICT(generation, url) DO UPDATE SET
                        status = excluded.status,
                        content_type = excluded.content_type,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        generation,
                        resource.url,
                        resource.status,
                        resource.content_type,
                        headers_json,
                        resource.body.as_ref(),
                        resource.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a resource in `generation`.
    ///
    /// Returns None if the URL has never been stored under this generation.
    pub async fn get_resource(&self, generation: &str, url: &str) -> Result<Option<StoredResource>, Error> {
        let generation = generation.to_string();
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<StoredResource>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status, content_type, headers_json, body, stored_at
                     FROM resources WHERE generation = ?1 AND url = ?2",
                )?;

                let result = stmt.query_row(params![generation, url], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u16>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Vec<u8>>(4)?,
                        row.get::<_, i64>(5)?,
                    ))
                });

                match result {
                    Ok((url, status, content_type, headers_json, body, stored_at)) => {
                        let headers = match headers_json {
                            Some(json) => serde_json::from_str(&json)?,
                            None => Vec::new(),
                        };
                        Ok(Some(StoredResource {
                            url,
                            status,
                            content_type,
                            headers,
                            body: Bytes::from(body),
                            stored_at,
                        }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every resource outside the `keep` generation.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_other_generations(&self, keep: &str) -> Result<u64, Error> {
        let keep = keep.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM resources WHERE generation <> ?1", params![keep])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of resources stored under `generation`.
    pub async fn count_resources(&self, generation: &str) -> Result<u64, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM resources WHERE generation = ?1",
                    params![generation],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
