//! Background discovery and registration.
//!
//! Runs periodic discovery rounds that feed the [`ServerRegistry`] and keeps
//! the client registration loop alive until shutdown. Rounds never overlap:
//! an on-demand [`GdmService::refresh`] waits for a running background round.

use std::sync::Arc;

use log::{debug, info};
use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::gdm::GdmBeacon;
use crate::registry::ServerRegistry;

/// Owns the discovery and registration background tasks.
pub struct GdmService {
    beacon: Arc<GdmBeacon>,
    registry: Arc<ServerRegistry>,
    cancel_token: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    /// Held for the duration of a discovery round.
    round: Arc<AsyncMutex<()>>,
}

impl GdmService {
    /// `cancel_token` stops both loops; it is usually the application-wide token.
    pub fn new(
        beacon: Arc<GdmBeacon>,
        registry: Arc<ServerRegistry>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            beacon,
            registry,
            cancel_token,
            tasks: Mutex::new(Vec::new()),
            round: Arc::new(AsyncMutex::new(())),
        }
    }

    pub fn beacon(&self) -> &Arc<GdmBeacon> {
        &self.beacon
    }

    pub fn registry(&self) -> &Arc<ServerRegistry> {
        &self.registry
    }

    /// Runs one discovery round and merges the result into the registry.
    ///
    /// Returns the number of servers that answered.
    pub async fn refresh(&self) -> usize {
        refresh_once(&self.round, &self.beacon, &self.registry).await
    }

    /// Spawns the discovery and registration loops.
    ///
    /// Calling this again while the loops are running does nothing.
    pub fn start(&self) {
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() {
            debug!("[GDM] Background tasks already running");
            return;
        }

        let beacon = Arc::clone(&self.beacon);
        let registry = Arc::clone(&self.registry);
        let round = Arc::clone(&self.round);
        let cancel = self.cancel_token.clone();
        tasks.push(tokio::spawn(async move {
            let interval = beacon.config().discovery_interval;
            loop {
                refresh_once(&round, &beacon, &registry).await;
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            debug!("[GDM] Discovery loop stopped");
        }));

        let beacon = Arc::clone(&self.beacon);
        let cancel = self.cancel_token.clone();
        tasks.push(tokio::spawn(async move {
            beacon.run_registration_loop(cancel).await;
        }));

        info!("[GDM] Background discovery and registration started");
    }

    /// Cancels both loops and waits for them to finish.
    pub async fn shutdown(&self) {
        self.cancel_token.cancel();
        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                log::warn!("[GDM] Background task ended abnormally: {}", e);
            }
        }
        info!("[GDM] Background tasks stopped");
    }
}

async fn refresh_once(
    round: &AsyncMutex<()>,
    beacon: &GdmBeacon,
    registry: &ServerRegistry,
) -> usize {
    let _round = round.lock().await;
    let servers = beacon.discover().await;
    registry.replace_discovered(&servers);
    debug!(
        "[GDM] Registry holds {} server(s) after discovery",
        registry.len()
    );
    servers.len()
}
