//! Service composition root.
//!
//! Builds every long-lived component once and wires their dependencies.
//! Front ends (the CLI, an embedding player) call [`bootstrap_services`] and
//! keep the returned [`BootstrappedServices`] for the process lifetime.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::connection::{ConnectionArbiter, HttpTransport, Prober, ReqwestTransport};
use crate::error::PmsResult;
use crate::gdm::{GdmBeacon, GdmConfig};
use crate::identity::ClientIdentity;
use crate::playback::{Chooser, FileSystem, PlaybackResolver};
use crate::registry::ServerRegistry;
use crate::services::GdmService;
use crate::settings::Settings;

/// Inputs for [`bootstrap_services`].
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub identity: ClientIdentity,
    pub settings: Settings,
    pub gdm: GdmConfig,
}

/// Every service the application needs, wired together.
pub struct BootstrappedServices {
    /// All known servers.
    pub registry: Arc<ServerRegistry>,
    /// Multicast discovery and client registration.
    pub beacon: Arc<GdmBeacon>,
    /// Address arbitration and data requests.
    pub arbiter: Arc<ConnectionArbiter>,
    /// Background discovery/registration loops.
    pub gdm_service: Arc<GdmService>,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// Builds a resolver that asks `chooser` and probes `fs`.
    pub fn playback_resolver(
        &self,
        chooser: Arc<dyn Chooser>,
        fs: Arc<dyn FileSystem>,
    ) -> PlaybackResolver {
        PlaybackResolver::new(Arc::clone(&self.arbiter), chooser, fs)
    }

    /// Initiates graceful shutdown of all services.
    pub async fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");
        self.cancel_token.cancel();
        self.gdm_service.shutdown().await;
        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Bootstraps all services with the default reqwest transport.
///
/// Fails only when the settings do not validate.
pub fn bootstrap_services(config: BootstrapConfig) -> PmsResult<BootstrappedServices> {
    let transport = Arc::new(ReqwestTransport::new());
    bootstrap_with_transport(
        config,
        Arc::clone(&transport) as Arc<dyn Prober>,
        transport as Arc<dyn HttpTransport>,
    )
}

/// Bootstraps all services over the given prober and transport.
pub fn bootstrap_with_transport(
    config: BootstrapConfig,
    prober: Arc<dyn Prober>,
    transport: Arc<dyn HttpTransport>,
) -> PmsResult<BootstrappedServices> {
    config.settings.validate()?;

    let cancel_token = CancellationToken::new();
    let registry = Arc::new(ServerRegistry::new());
    let beacon = Arc::new(GdmBeacon::new(
        config.gdm,
        config.identity.registration(),
    ));
    let arbiter = Arc::new(ConnectionArbiter::new(
        config.identity,
        config.settings,
        prober,
        transport,
    ));
    let gdm_service = Arc::new(GdmService::new(
        Arc::clone(&beacon),
        Arc::clone(&registry),
        cancel_token.clone(),
    ));

    log::debug!(
        "[Bootstrap] Services ready for client {}",
        arbiter.identity().client_id
    );

    Ok(BootstrappedServices {
        registry,
        beacon,
        arbiter,
        gdm_service,
        cancel_token,
    })
}
