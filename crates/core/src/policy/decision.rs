//! The freshness decision table.
//!
//! Evaluated in order:
//! 1. non-GET requests pass straight through to the network;
//! 2. a cached entry under slow-network mode is served as-is;
//! 3. an expired cached entry (or one with no known age) is refreshed;
//! 4. everything else goes to the network, a fresh hit included.
//!
//! Freshness alone never skips the network. Only slow-network mode does.

use serde::{Deserialize, Serialize};

/// What the engine does with a request before touching the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    PassThrough,
    ServeCached,
    RefreshExpired,
    FetchNetwork,
}

/// What a failed refresh falls back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    Stale,
    Sentinel,
}

/// Where a response came from, reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ServedFrom {
    /// Fetched just now (and cached, if successful).
    Network,
    /// Answered from cache without a network attempt.
    Cache,
    /// Network attempt failed; the cached copy was served instead.
    CacheFallback,
    /// Navigation older than the offline ceiling; placeholder served.
    Sentinel,
    /// Non-GET request forwarded without cache interaction.
    PassThrough,
}

/// Inputs to [`decide`], all read before any I/O beyond the two stores.
#[derive(Debug, Clone, Copy)]
pub struct RequestFacts {
    pub is_get: bool,
    pub has_entry: bool,
    pub is_sentinel: bool,
    /// Age of the cached entry in millis; None when no timestamp is recorded.
    pub age: Option<i64>,
    pub slow_network: bool,
}

pub fn decide(facts: RequestFacts, cache_expiry_ms: i64) -> Decision {
    if !facts.is_get {
        return Decision::PassThrough;
    }
    if !facts.has_entry {
        return Decision::FetchNetwork;
    }
    if facts.slow_network || facts.is_sentinel {
        return Decision::ServeCached;
    }
    if is_expired(facts.age, cache_expiry_ms) {
        return Decision::RefreshExpired;
    }
    Decision::FetchNetwork
}

/// Unknown age counts as expired.
pub fn is_expired(age: Option<i64>, cache_expiry_ms: i64) -> bool {
    age.is_none_or(|age| age > cache_expiry_ms)
}

/// Fallback after a failed refresh.
///
/// The sentinel needs a known age: an entry without a timestamp is served
/// stale even for navigations.
pub fn fallback_after_failed_refresh(is_navigation: bool, age: Option<i64>, max_offline_ms: i64) -> Fallback {
    if is_navigation && age.is_some_and(|age| age > max_offline_ms) { Fallback::Sentinel } else { Fallback::Stale }
}
