//! Network client for bundlecache.
//!
//! This crate provides the reqwest-backed [`TimedFetcher`], the production
//! implementation of the core [`Fetcher`](bundlecache_core::Fetcher) seam.

pub mod fetch;

pub use fetch::{FetchConfig, TimedFetcher};
