//! GDM (Good Day Mate) discovery beacon.
//!
//! Two independent activities share one [`GdmBeacon`]:
//!
//! - **Discovery**: a short-lived socket sends one search to the discovery
//!   group and collects server replies for a fixed window.
//! - **Registration**: a long-lived socket on the client update port
//!   announces this client and answers inbound searches until cancelled.
//!
//! Socket failures never escape: discovery degrades to an empty list and a
//! failed registration bind disables registration for the process.

mod codec;
mod discovery;
mod registration;
mod socket;
mod types;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::protocol_constants::{CLIENTS_PATH, HTTP_CONNECT_TIMEOUT_SECS};

pub use codec::{is_search_request, parse_datagram};
pub use registration::RegistrationLoop;
pub use types::{
    ClientRegistration, DiscoveredServer, DiscoveryMessage, GdmConfig, GdmError, GdmResult,
    MessageKind,
};

/// Discovery and registration state for this client.
pub struct GdmBeacon {
    config: GdmConfig,
    registration: ClientRegistration,
    /// Last discovery round, replaced wholesale.
    server_list: RwLock<Vec<DiscoveredServer>>,
    discovery_complete: AtomicBool,
    registered: Arc<AtomicBool>,
    registration_disabled: AtomicBool,
    http_client: Client,
}

impl GdmBeacon {
    /// Creates a beacon advertising `registration`.
    pub fn new(config: GdmConfig, registration: ClientRegistration) -> Self {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS * 2))
            .build()
            .unwrap_or_default();

        Self {
            config,
            registration,
            server_list: RwLock::new(Vec::new()),
            discovery_complete: AtomicBool::new(false),
            registered: Arc::new(AtomicBool::new(false)),
            registration_disabled: AtomicBool::new(false),
            http_client,
        }
    }

    pub fn config(&self) -> &GdmConfig {
        &self.config
    }

    pub fn registration(&self) -> &ClientRegistration {
        &self.registration
    }

    /// Runs one discovery round and replaces the server list.
    ///
    /// Socket errors are logged and yield an empty list.
    pub async fn discover(&self) -> Vec<DiscoveredServer> {
        let servers = match discovery::discover_servers(&self.config).await {
            Ok(servers) => servers,
            Err(e) => {
                log::warn!("[GDM] Discovery round failed: {}", e);
                Vec::new()
            }
        };

        *self.server_list.write() = servers.clone();
        self.discovery_complete.store(true, Ordering::SeqCst);
        servers
    }

    /// Snapshot of the last discovery round.
    pub fn server_list(&self) -> Vec<DiscoveredServer> {
        self.server_list.read().clone()
    }

    pub fn is_discovery_complete(&self) -> bool {
        self.discovery_complete.load(Ordering::SeqCst)
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    pub fn is_registration_disabled(&self) -> bool {
        self.registration_disabled.load(Ordering::SeqCst)
    }

    /// Binds the registration socket.
    ///
    /// A bind failure disables registration for the lifetime of the beacon.
    pub fn bind_registration(&self) -> GdmResult<RegistrationLoop> {
        if self.is_registration_disabled() {
            return Err(GdmError::RegistrationDisabled);
        }
        RegistrationLoop::bind(
            self.config.clone(),
            self.registration.clone(),
            Arc::clone(&self.registered),
        )
        .inspect_err(|e| {
            log::error!("[GDM] Unable to bind registration socket, disabling: {}", e);
            self.registration_disabled.store(true, Ordering::SeqCst);
        })
    }

    /// Binds and runs registration until `cancel` fires.
    ///
    /// Returns immediately if the socket cannot be bound.
    pub async fn run_registration_loop(&self, cancel: CancellationToken) {
        if let Ok(lp) = self.bind_registration() {
            lp.run(cancel).await;
        }
    }

    /// Asks the first discovered server whether it lists this client.
    ///
    /// Only meaningful once a search has been answered and a discovery round
    /// has completed; returns false otherwise. Transport errors count as not
    /// registered.
    pub async fn check_registration(&self) -> bool {
        if !self.is_registered() || !self.is_discovery_complete() {
            return false;
        }

        let Some(server) = self.server_list.read().first().cloned() else {
            return false;
        };

        let url = format!("http://{}{}", server.location(), CLIENTS_PATH);
        let body = match self.http_client.get(&url).send().await {
            Ok(resp) => match resp.text().await {
                Ok(body) => body,
                Err(e) => {
                    log::debug!("[GDM] Failed to read {}: {}", url, e);
                    return false;
                }
            },
            Err(e) => {
                log::debug!("[GDM] Registration check against {} failed: {}", url, e);
                return false;
            }
        };

        let found = body.contains(self.registration.identifier());
        log::debug!(
            "[GDM] Client {} listed by {}: {}",
            self.registration.identifier(),
            server.name,
            found
        );
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::UdpSocket;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn registration() -> ClientRegistration {
        ClientRegistration::new("client-42", "Den", 3005, "pmslink", "0.1.0")
    }

    /// Fake server answering one search, advertising `http_port`.
    async fn fake_gdm_server(http_port: u16) -> std::net::SocketAddr {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 256];
            let (_, src) = socket.recv_from(&mut buf).await.unwrap();
            let reply = format!(
                "HTTP/1.0 200 OK\r\nResource-Identifier: srv-1\r\nName: Attic\r\nPort: {}\r\n",
                http_port
            );
            socket.send_to(reply.as_bytes(), src).await.unwrap();
        });
        addr
    }

    fn config_for(target: std::net::SocketAddr) -> GdmConfig {
        GdmConfig {
            discovery_target: target,
            discovery_window: Duration::from_millis(250),
            client_update_bind: "127.0.0.1:0".parse().unwrap(),
            ..GdmConfig::default()
        }
    }

    #[tokio::test]
    async fn discover_replaces_server_list_and_sets_flag() {
        let target = fake_gdm_server(32400).await;
        let beacon = GdmBeacon::new(config_for(target), registration());
        assert!(!beacon.is_discovery_complete());

        let servers = beacon.discover().await;
        assert_eq!(servers.len(), 1);
        assert_eq!(beacon.server_list(), servers);
        assert!(beacon.is_discovery_complete());
    }

    #[tokio::test]
    async fn check_registration_requires_both_flags() {
        let beacon = GdmBeacon::new(GdmConfig::default(), registration());
        assert!(!beacon.check_registration().await);
        beacon.registered.store(true, Ordering::SeqCst);
        assert!(!beacon.check_registration().await);
    }

    #[tokio::test]
    async fn check_registration_queries_first_server() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clients"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<MediaContainer><Server machineIdentifier="client-42"/></MediaContainer>"#,
            ))
            .expect(1)
            .mount(&mock)
            .await;

        let target = fake_gdm_server(mock.address().port()).await;
        let beacon = GdmBeacon::new(config_for(target), registration());
        beacon.discover().await;
        beacon.registered.store(true, Ordering::SeqCst);

        assert!(beacon.check_registration().await);
    }

    #[tokio::test]
    async fn check_registration_false_when_not_listed() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clients"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<MediaContainer/>"))
            .mount(&mock)
            .await;

        let target = fake_gdm_server(mock.address().port()).await;
        let beacon = GdmBeacon::new(config_for(target), registration());
        beacon.discover().await;
        beacon.registered.store(true, Ordering::SeqCst);

        assert!(!beacon.check_registration().await);
    }

    #[tokio::test]
    async fn bind_failure_disables_registration() {
        let config = GdmConfig {
            // Not a local address, so bind always fails.
            client_update_bind: "203.0.113.7:0".parse().unwrap(),
            ..GdmConfig::default()
        };
        let beacon = GdmBeacon::new(config, registration());

        beacon.run_registration_loop(CancellationToken::new()).await;
        assert!(beacon.is_registration_disabled());
        assert!(matches!(
            beacon.bind_registration(),
            Err(GdmError::RegistrationDisabled)
        ));
    }
}
