//! Storage seams consumed by the policy engine.
//!
//! [`MetadataStore`] never fails: a read that cannot complete yields an empty
//! record and a write that cannot complete is dropped, both with a warning.
//! Missing metadata only ever makes entries look expired.

use async_trait::async_trait;

use crate::Error;
use crate::cache::{CacheDb, MetadataRecord, StoredResource};

/// Durable key→timestamp mapping merged with the network-health record.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Current record, or an empty one if it cannot be read.
    async fn get(&self) -> MetadataRecord;

    /// Replace the record. Concurrent writers: last write wins.
    async fn put(&self, record: &MetadataRecord);
}

/// URL → response bytes, partitioned by cache generation.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get(&self, generation: &str, url: &str) -> Result<Option<StoredResource>, Error>;

    async fn put(&self, generation: &str, resource: &StoredResource) -> Result<(), Error>;

    /// Drop every generation except `keep`, returning the number of entries removed.
    async fn purge_except(&self, keep: &str) -> Result<u64, Error>;
}

#[async_trait]
impl MetadataStore for CacheDb {
    async fn get(&self) -> MetadataRecord {
        match self.load_metadata().await {
            Ok(record) => record.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "metadata unavailable, using empty record");
                MetadataRecord::default()
            }
        }
    }

    async fn put(&self, record: &MetadataRecord) {
        if let Err(e) = self.save_metadata(record).await {
            tracing::warn!(error = %e, "failed to persist metadata");
        }
    }
}

#[async_trait]
impl ResourceStore for CacheDb {
    async fn get(&self, generation: &str, url: &str) -> Result<Option<StoredResource>, Error> {
        self.get_resource(generation, url).await
    }

    async fn put(&self, generation: &str, resource: &StoredResource) -> Result<(), Error> {
        self.put_resource(generation, resource).await
    }

    async fn purge_except(&self, keep: &str) -> Result<u64, Error> {
        self.purge_other_generations(keep).await
    }
}
