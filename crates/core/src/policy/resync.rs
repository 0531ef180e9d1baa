//! Bulk resync: refetch every manifest asset, reporting progress.
//!
//! Assets are processed strictly in manifest order, one at a time, so
//! `completed` counts rise monotonically and a weak connection only ever
//! carries one request. A failed asset marks the network slow, still gets its
//! timestamp touched, and the pass moves on.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::engine::PolicyEngine;
use crate::Error;
use crate::cache::MetadataRecord;
use crate::fetch::ResourceRequest;
use crate::health::{is_slow_network_active, mark_network_slow};

/// Reason reported when the resync precondition fails.
pub const NO_INTERNET_OR_SLOW_NETWORK: &str = "no internet or slow network";

/// Inbound commands from an external caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "type")]
pub enum Command {
    #[serde(rename = "RECACHE_ALL")]
    RecacheAll,
}

/// Events published while a resync runs. Exactly one terminal event
/// (`Done` or `Error`) ends every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "kind")]
pub enum ResyncEvent {
    Progress { completed: usize, total: usize },
    Done,
    Error { reason: String },
}

impl ResyncEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResyncEvent::Progress { .. })
    }
}

impl PolicyEngine {
    /// Run a command, publishing its events to `events`.
    pub async fn dispatch(&self, command: Command, events: mpsc::Sender<ResyncEvent>) {
        match command {
            Command::RecacheAll => self.handle_resync(events).await,
        }
    }

    /// Refresh every manifest asset, publishing progress and one terminal event.
    ///
    /// Refuses up front, without any fetch, when the fetcher reports offline
    /// or slow-network mode is active. Metadata is persisted once at the end.
    pub async fn handle_resync(&self, events: mpsc::Sender<ResyncEvent>) {
        let mut record = self.metadata.get().await;

        if !self.fetcher.is_online() || is_slow_network_active(&record, self.now()) {
            info!("resync refused: {NO_INTERNET_OR_SLOW_NETWORK}");
            publish(&events, ResyncEvent::Error { reason: NO_INTERNET_OR_SLOW_NETWORK.into() }).await;
            return;
        }

        info!(total = self.manifest.len(), "resync started");
        match self.resync_assets(&mut record, &events).await {
            Ok(()) => {
                self.metadata.put(&record).await;
                info!("resync complete");
                publish(&events, ResyncEvent::Done).await;
            }
            Err(e) => {
                warn!(error = %e, "resync aborted");
                mark_network_slow(&mut record, self.now(), self.window());
                self.metadata.put(&record).await;
                publish(&events, ResyncEvent::Error { reason: e.to_string() }).await;
            }
        }
    }

    /// Dispatch `command` and collect the events it published, in order.
    pub async fn run_command(&self, command: Command) -> Vec<ResyncEvent> {
        let (tx, mut rx) = mpsc::channel(self.manifest.len() + 1);
        self.dispatch(command, tx).await;

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    async fn resync_assets(
        &self, record: &mut MetadataRecord, events: &mpsc::Sender<ResyncEvent>,
    ) -> Result<(), Error> {
        let total = self.manifest.len();

        for (index, url) in self.manifest.assets().iter().enumerate() {
            let request = ResourceRequest::get(url.clone());
            match self.fetcher.fetch(&request, Some(self.timeout())).await {
                Ok(response) if response.status.is_success() => {
                    let now = self.now();
                    self.resources
                        .put(&self.config.cache_tag, &response.to_stored(url, now))
                        .await?;
                    record.stamp(url.as_str(), now);
                }
                Ok(response) => {
                    debug!(url = %url, status = response.status.as_u16(), "resync skipped unsuccessful response");
                    record.stamp(url.as_str(), self.now());
                }
                Err(e) => {
                    debug!(url = %url, error = %e, "resync fetch failed");
                    let now = self.now();
                    mark_network_slow(record, now, self.window());
                    record.stamp(url.as_str(), now);
                }
            }

            publish(events, ResyncEvent::Progress { completed: index + 1, total }).await;
        }

        Ok(())
    }
}

/// Listeners may have gone away; the resync carries on regardless.
async fn publish(events: &mpsc::Sender<ResyncEvent>, event: ResyncEvent) {
    if events.send(event).await.is_err() {
        debug!("resync listener dropped");
    }
}
