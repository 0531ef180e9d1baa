//! Asset manifest: the ordered list of URLs the bundle precaches.
//!
//! Entries may be same-origin paths or fully-qualified cross-origin URLs.
//! Exactly one entry is the sentinel, the placeholder served to navigations
//! whose cached copy is older than the offline ceiling. The sentinel is cached
//! like any other asset.

pub mod url;

use std::path::Path;

use ::url::Url;
use serde::{Deserialize, Serialize};

use crate::Error;

pub use self::url::{UrlError, normalize};

/// Manifest compiled into the binary, used when no manifest file is configured.
const BUILTIN_MANIFEST: &str = include_str!("../../manifest.json");

/// On-disk manifest shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestFile {
    pub assets: Vec<String>,
    pub sentinel: String,
}

/// A resolved, deduplicated asset manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetManifest {
    assets: Vec<Url>,
    sentinel: Url,
}

impl AssetManifest {
    /// Resolve raw manifest entries against `origin`.
    ///
    /// Order is preserved and duplicates keep their first position. The
    /// sentinel is appended when the asset list does not already carry it.
    pub fn resolve(file: &ManifestFile, origin: &Url) -> Result<Self, Error> {
        if file.assets.is_empty() {
            return Err(Error::InvalidManifest("asset list is empty".into()));
        }
        if file.sentinel.trim().is_empty() {
            return Err(Error::InvalidManifest("sentinel entry is empty".into()));
        }

        let sentinel = normalize(&file.sentinel, origin)?;

        let mut assets: Vec<Url> = Vec::with_capacity(file.assets.len() + 1);
        for entry in &file.assets {
            let url = normalize(entry, origin)
                .map_err(|e| Error::InvalidManifest(format!("entry {entry:?}: {e}")))?;
            if !assets.contains(&url) {
                assets.push(url);
            }
        }
        if !assets.contains(&sentinel) {
            assets.push(sentinel.clone());
        }

        Ok(Self { assets, sentinel })
    }

    /// Parse a manifest from its JSON form.
    pub fn from_json(json: &str, origin: &Url) -> Result<Self, Error> {
        let file: ManifestFile =
            serde_json::from_str(json).map_err(|e| Error::InvalidManifest(e.to_string()))?;
        Self::resolve(&file, origin)
    }

    /// Read and resolve a manifest file.
    pub fn load(path: impl AsRef<Path>, origin: &Url) -> Result<Self, Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::InvalidManifest(format!("{}: {e}", path.display())))?;
        Self::from_json(&json, origin)
    }

    /// The manifest shipped with this build.
    pub fn builtin(origin: &Url) -> Result<Self, Error> {
        Self::from_json(BUILTIN_MANIFEST, origin)
    }

    pub fn assets(&self) -> &[Url] {
        &self.assets
    }

    pub fn sentinel(&self) -> &Url {
        &self.sentinel
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn is_sentinel(&self, url: &Url) -> bool {
        &self.sentinel == url
    }
}
