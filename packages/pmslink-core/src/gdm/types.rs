//! Shared types for GDM discovery and registration.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::protocol_constants::{
    DEFAULT_SERVER_PORT, GDM_CLIENT_CONTENT_TYPE, GDM_CLIENT_HEADER, GDM_CLIENT_UPDATE_PORT,
    GDM_DISCOVERY_INTERVAL_SECS, GDM_DISCOVERY_PORT, GDM_DISCOVERY_WINDOW_MS, GDM_OK_STATUS,
    GDM_REGISTRATION_POLL_MS, GDM_REGISTRATION_PORT,
};

/// Errors that can occur on GDM sockets.
///
/// These never escape the beacon's public operations; they are logged and
/// turned into empty results.
#[derive(Debug, Error)]
pub enum GdmError {
    /// Failed to create or bind a UDP socket.
    #[error("failed to bind UDP socket: {0}")]
    SocketBind(#[source] std::io::Error),

    /// Failed to join the multicast group.
    #[error("failed to join multicast group: {0}")]
    MulticastJoin(#[source] std::io::Error),

    /// Failed to send a datagram.
    #[error("failed to send datagram: {0}")]
    Send(#[source] std::io::Error),

    /// Registration was disabled by an earlier bind failure.
    #[error("registration disabled for this process")]
    RegistrationDisabled,
}

/// Convenient Result alias for GDM socket operations.
pub type GdmResult<T> = Result<T, GdmError>;

/// Kind of a GDM datagram, derived from its first line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// `M-SEARCH * HTTP/1.x`
    Search,
    /// `HTTP/1.x 200 OK`
    Response,
    /// `HELLO * HTTP/1.0`
    Hello,
    /// `BYE * HTTP/1.0`
    Bye,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Search => write!(f, "M-SEARCH"),
            Self::Response => write!(f, "200 OK"),
            Self::Hello => write!(f, "HELLO"),
            Self::Bye => write!(f, "BYE"),
        }
    }
}

/// One GDM datagram: its kind, sender and `Key: value` headers.
///
/// Constructed per packet and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryMessage {
    pub kind: MessageKind,
    pub sender: SocketAddr,
    /// Headers in datagram order. Keys keep their original case.
    pub headers: Vec<(String, String)>,
}

impl DiscoveryMessage {
    /// Looks up a header value (ASCII case-insensitive key).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    pub fn resource_identifier(&self) -> Option<&str> {
        self.header("Resource-Identifier")
    }

    pub fn name(&self) -> Option<&str> {
        self.header("Name")
    }

    /// Advertised port, if present and numeric.
    pub fn port(&self) -> Option<u16> {
        self.header("Port").and_then(|p| p.parse().ok())
    }

    pub fn updated_at(&self) -> Option<&str> {
        self.header("Updated-At")
    }

    pub fn version(&self) -> Option<&str> {
        self.header("Version")
    }

    pub fn server_class(&self) -> Option<&str> {
        self.header("Server-Class")
    }

    pub fn host(&self) -> Option<&str> {
        self.header("Host")
    }

    pub fn product(&self) -> Option<&str> {
        self.header("Product")
    }
}

/// This client's own GDM advertisement.
///
/// Immutable after construction. Sent as HELLO when registration starts, as
/// a `200 OK` reply to every inbound search, and once as BYE on shutdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientRegistration {
    identifier: String,
    name: String,
    port: u16,
    product: String,
    version: String,
}

impl ClientRegistration {
    pub fn new(
        identifier: impl Into<String>,
        name: impl Into<String>,
        port: u16,
        product: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            port,
            product: product.into(),
            version: version.into(),
        }
    }

    /// Recovers a registration from a parsed HELLO/BYE/response datagram.
    ///
    /// Returns None if any of the identity fields is missing.
    pub fn from_message(message: &DiscoveryMessage) -> Option<Self> {
        Some(Self {
            identifier: message.resource_identifier()?.to_string(),
            name: message.name()?.to_string(),
            port: message.port()?,
            product: message.product()?.to_string(),
            version: message.version()?.to_string(),
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The newline-separated header block shared by all variants.
    pub fn client_data(&self) -> String {
        format!(
            "Content-Type: {}\nResource-Identifier: {}\nName: {}\nPort: {}\nProduct: {}\nVersion: {}",
            GDM_CLIENT_CONTENT_TYPE, self.identifier, self.name, self.port, self.product, self.version
        )
    }

    /// Datagram sent when registration starts.
    pub fn hello_datagram(&self) -> String {
        format!("HELLO {}\n{}", GDM_CLIENT_HEADER, self.client_data())
    }

    /// Datagram sent once when registration stops.
    pub fn bye_datagram(&self) -> String {
        format!("BYE {}\n{}", GDM_CLIENT_HEADER, self.client_data())
    }

    /// Reply to an inbound discovery search.
    pub fn response_datagram(&self) -> String {
        format!("{}\n{}", GDM_OK_STATUS, self.client_data())
    }
}

/// A server that answered a discovery search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredServer {
    /// Stable server UUID (`Resource-Identifier`).
    pub uuid: String,
    /// Display name (`Name`), falling back to the sender address.
    pub name: String,
    /// Address the reply came from.
    pub address: String,
    /// Advertised HTTP port.
    pub port: u16,
    pub content_type: Option<String>,
    pub updated_at: Option<String>,
    pub version: Option<String>,
    pub server_class: Option<String>,
    pub host: Option<String>,
}

impl DiscoveredServer {
    /// Builds a server entry from a positive discovery reply.
    ///
    /// Returns None for non-response messages and replies without an identifier.
    pub fn from_message(message: &DiscoveryMessage) -> Option<Self> {
        if message.kind != MessageKind::Response {
            return None;
        }
        let uuid = message.resource_identifier()?.to_string();
        let address = message.sender.ip().to_string();
        Some(Self {
            name: message
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| address.clone()),
            port: message.port().unwrap_or(DEFAULT_SERVER_PORT),
            content_type: message.content_type().map(str::to_string),
            updated_at: message.updated_at().map(str::to_string),
            version: message.version().map(str::to_string),
            server_class: message.server_class().map(str::to_string),
            host: message.host().map(str::to_string),
            uuid,
            address,
        })
    }

    /// `address:port` form used as a connection candidate.
    pub fn location(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Socket addresses and timings for the beacon.
#[derive(Debug, Clone)]
pub struct GdmConfig {
    /// Multicast group joined by the registration socket.
    pub multicast_group: Ipv4Addr,
    /// Where discovery searches are sent.
    pub discovery_target: SocketAddr,
    /// Where HELLO/BYE registrations are sent.
    pub registration_target: SocketAddr,
    /// Local address the registration socket binds to.
    pub client_update_bind: SocketAddr,
    /// Outgoing interface for discovery searches (system default when None).
    pub interface: Option<Ipv4Addr>,
    /// How long discovery replies are collected.
    pub discovery_window: Duration,
    /// Poll bound for one registration loop iteration.
    pub poll_interval: Duration,
    /// Interval between periodic discovery rounds.
    pub discovery_interval: Duration,
}

impl Default for GdmConfig {
    fn default() -> Self {
        let group = Ipv4Addr::new(239, 0, 0, 250);
        Self {
            multicast_group: group,
            discovery_target: SocketAddr::V4(SocketAddrV4::new(group, GDM_DISCOVERY_PORT)),
            registration_target: SocketAddr::V4(SocketAddrV4::new(group, GDM_REGISTRATION_PORT)),
            client_update_bind: SocketAddr::V4(SocketAddrV4::new(
                Ipv4Addr::UNSPECIFIED,
                GDM_CLIENT_UPDATE_PORT,
            )),
            interface: None,
            discovery_window: Duration::from_millis(GDM_DISCOVERY_WINDOW_MS),
            poll_interval: Duration::from_millis(GDM_REGISTRATION_POLL_MS),
            discovery_interval: Duration::from_secs(GDM_DISCOVERY_INTERVAL_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> ClientRegistration {
        ClientRegistration::new("abc-123", "Kitchen", 3005, "pmslink", "1.2.3")
    }

    #[test]
    fn hello_datagram_layout() {
        let hello = registration().hello_datagram();
        let mut lines = hello.lines();
        assert_eq!(lines.next(), Some("HELLO * HTTP/1.0"));
        assert_eq!(lines.next(), Some("Content-Type: plex/media-player"));
        assert_eq!(lines.next(), Some("Resource-Identifier: abc-123"));
        assert_eq!(lines.next(), Some("Name: Kitchen"));
        assert_eq!(lines.next(), Some("Port: 3005"));
        assert_eq!(lines.next(), Some("Product: pmslink"));
        assert_eq!(lines.next(), Some("Version: 1.2.3"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn bye_and_response_share_client_data() {
        let reg = registration();
        assert!(reg.bye_datagram().starts_with("BYE * HTTP/1.0\n"));
        assert!(reg.response_datagram().starts_with("HTTP/1.0 200 OK\n"));
        assert!(reg.bye_datagram().ends_with(&reg.client_data()));
        assert!(reg.response_datagram().ends_with(&reg.client_data()));
    }

    #[test]
    fn default_config_uses_protocol_addresses() {
        let config = GdmConfig::default();
        assert_eq!(config.discovery_target.to_string(), "239.0.0.250:32414");
        assert_eq!(config.registration_target.to_string(), "239.0.0.250:32413");
        assert_eq!(config.client_update_bind.port(), 32412);
        assert_eq!(config.discovery_window, Duration::from_millis(600));
    }
}
