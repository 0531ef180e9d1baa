//! Request/response types and the network seam.
//!
//! The engine never talks to the network directly; it hands a
//! [`ResourceRequest`] to a [`Fetcher`] together with the bound to apply.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, StatusCode};
use url::Url;

use crate::Error;
use crate::cache::StoredResource;

/// Whether the request is a top-level page navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    Navigate,
    #[default]
    Subresource,
}

/// A request key: normalized absolute URL, method, and navigation flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub url: Url,
    pub method: Method,
    pub mode: RequestMode,
    /// Only forwarded on pass-through requests.
    pub body: Option<Bytes>,
}

impl ResourceRequest {
    pub fn get(url: Url) -> Self {
        Self { url, method: Method::GET, mode: RequestMode::Subresource, body: None }
    }

    pub fn navigate(url: Url) -> Self {
        Self { mode: RequestMode::Navigate, ..Self::get(url) }
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }
}

/// A response as it came off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkResponse {
    /// Final URL after redirects.
    pub url: Url,
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl NetworkResponse {
    /// Snapshot for the resource cache, keyed by the requested URL.
    pub fn to_stored(&self, key: &Url, now: i64) -> StoredResource {
        StoredResource {
            url: key.to_string(),
            status: self.status.as_u16(),
            content_type: self.content_type.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            stored_at: now,
        }
    }
}

/// Performs network requests on behalf of the engine.
///
/// Implementations map every transport failure, and an elapsed `timeout`,
/// to [`Error::NetworkUnreachable`]. A timed-out request must be abandoned,
/// not left running. HTTP error statuses are responses, not failures.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &ResourceRequest, timeout: Option<Duration>) -> Result<NetworkResponse, Error>;

    /// Coarse connectivity signal consulted before a bulk resync.
    fn is_online(&self) -> bool {
        true
    }
}
