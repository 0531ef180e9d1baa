//! Network health tracking over the metadata record.
//!
//! The slow-network flag is a value threaded through the policy engine: callers
//! read it from the record, decide, and persist whatever comes back. Nothing
//! clears the flag explicitly; it lapses once `now >= slow_until`.

use crate::cache::MetadataRecord;

/// Durations governing the slow-network cooldown, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlowNetworkWindow {
    /// How long the network stays distrusted after a failed attempt.
    pub remember_ms: i64,
    /// Offset of the advisory `retry_at` mark.
    pub retry_delay_ms: i64,
}

impl SlowNetworkWindow {
    pub fn from_config(config: &crate::AppConfig) -> Self {
        Self { remember_ms: config.slow_net_remember_ms, retry_delay_ms: config.slow_net_retry_delay_ms }
    }
}

/// True while a recorded `slow_until` lies in the future.
pub fn is_slow_network_active(record: &MetadataRecord, now: i64) -> bool {
    record.slow_until.is_some_and(|until| now < until)
}

/// Distrust the network for the configured window starting at `now`.
pub fn mark_network_slow(record: &mut MetadataRecord, now: i64, window: SlowNetworkWindow) {
    let slow_until = now.saturating_add(window.remember_ms);
    let retry_at = now.saturating_add(window.retry_delay_ms);
    record.slow_until = Some(slow_until);
    record.retry_at = Some(retry_at);
    tracing::warn!(slow_until, retry_at, "network marked slow");
}
