//! SQLite-backed resource cache and metadata store.
//!
//! This module provides persistent storage using SQLite with async access via
//! tokio-rusqlite. It supports:
//!
//! - Response bytes partitioned by cache generation
//! - A single merged metadata record (timestamps plus network health)
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod metadata;
pub mod migrations;
pub mod resources;

pub use crate::Error;

pub use connection::CacheDb;
pub use metadata::{METADATA_KEY, MetadataRecord};
pub use resources::StoredResource;
