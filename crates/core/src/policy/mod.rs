//! Freshness and degraded-network policy.
//!
//! - [`decision`]: the pure decision table
//! - [`engine`]: request handling, startup and install
//! - [`resync`]: sequential bulk refresh with progress events

pub mod decision;
pub mod engine;
pub mod resync;

#[cfg(test)]
mod testing;

pub use decision::{Decision, ServedFrom};
pub use engine::{CacheStatus, Clock, PolicyEngine, Served, StartupReport};
pub use resync::{Command, NO_INTERNET_OR_SLOW_NETWORK, ResyncEvent};
