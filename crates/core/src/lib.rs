//! Core types and policy for bundlecache.
//!
//! This crate provides:
//! - Resource cache and metadata store with SQLite backend
//! - Network health tracking
//! - The freshness policy engine and bulk resync
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod health;
pub mod manifest;
pub mod policy;
pub mod store;

pub use cache::{CacheDb, MetadataRecord, StoredResource};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use fetch::{Fetcher, NetworkResponse, RequestMode, ResourceRequest};
pub use manifest::AssetManifest;
pub use policy::{CacheStatus, Command, PolicyEngine, ResyncEvent, Served, ServedFrom, StartupReport};
pub use store::{MetadataStore, ResourceStore};
