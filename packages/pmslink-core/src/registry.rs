//! Known media servers keyed by UUID.
//!
//! The registry is read far more often than it is written. Readers take
//! cloned snapshots; a discovery round is applied under the write lock so
//! readers never observe a half-applied round and no write is lost to it.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;

use crate::gdm::DiscoveredServer;
use crate::protocol_constants::DEFAULT_SERVER_PORT;

/// How a server first became known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoveryOrigin {
    LocalMulticast,
    CloudDirectory,
    UserEntered,
}

/// Server role reported by the server itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerClass {
    #[default]
    Primary,
    Secondary,
}

impl ServerClass {
    /// Parses a `serverClass` attribute. Anything but `secondary` is primary.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("secondary") => Self::Secondary,
            _ => Self::Primary,
        }
    }
}

/// Transport scheme for requests to a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reachability of a server as seen from this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Offline,
    /// Reached through the cloud-reported external address.
    Remote,
    /// Reached through a local network address.
    Nearby,
    Unknown,
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Offline => "Offline",
            Self::Remote => "Remote",
            Self::Nearby => "Nearby",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// One media server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerRecord {
    pub uuid: String,
    pub name: String,
    pub origin: DiscoveryOrigin,
    /// `host:port` candidates in discovery order, no duplicates.
    pub local_addresses: Vec<String>,
    /// Cloud-reported external `host:port`.
    pub external_address: Option<String>,
    /// Cloud-reported external URI (full URL).
    pub external_uri: Option<String>,
    /// Address requests are currently sent to.
    pub access_address: String,
    pub scheme: Scheme,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub user: Option<String>,
    pub owned: bool,
    pub master: bool,
    pub class: ServerClass,
    pub offline: bool,
    /// Server has multiple home users.
    pub multiuser: bool,
    pub version: Option<String>,
    pub updated_at: Option<String>,
}

impl ServerRecord {
    /// Creates a record with a single known address.
    pub fn new(
        uuid: impl Into<String>,
        name: impl Into<String>,
        origin: DiscoveryOrigin,
        address: impl Into<String>,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            origin,
            local_addresses: Vec::new(),
            external_address: None,
            external_uri: None,
            access_address: with_default_port(&address.into()),
            scheme: Scheme::Https,
            token: None,
            user: None,
            owned: true,
            master: true,
            class: ServerClass::Primary,
            offline: false,
            multiuser: false,
            version: None,
            updated_at: None,
        }
    }

    /// Creates a record for a server found by multicast discovery.
    pub fn from_discovered(server: &DiscoveredServer) -> Self {
        let location = server.location();
        let mut record = Self::new(
            &server.uuid,
            &server.name,
            DiscoveryOrigin::LocalMulticast,
            &location,
        );
        record.local_addresses.push(location);
        record.class = ServerClass::parse(server.server_class.as_deref());
        record.version = server.version.clone();
        record.updated_at = server.updated_at.clone();
        record
    }

    /// Creates a record for a server reported by the cloud directory.
    pub fn from_cloud(
        uuid: impl Into<String>,
        name: impl Into<String>,
        external_address: impl Into<String>,
        external_uri: Option<String>,
    ) -> Self {
        let external = with_default_port(&external_address.into());
        let mut record = Self::new(uuid, name, DiscoveryOrigin::CloudDirectory, &external);
        record.external_address = Some(external);
        record.external_uri = external_uri;
        record
    }

    /// Adds a local candidate address if not already known.
    pub fn add_local_address(&mut self, address: &str) {
        let address = with_default_port(address);
        if !self.local_addresses.contains(&address) {
            self.local_addresses.push(address);
        }
    }

    pub fn is_secure(&self) -> bool {
        self.scheme == Scheme::Https
    }

    /// Host part of the access address.
    pub fn host(&self) -> &str {
        split_host_port(&self.access_address).0
    }

    /// Port part of the access address.
    pub fn port(&self) -> u16 {
        split_host_port(&self.access_address).1
    }

    /// `scheme://access_address`
    pub fn url_location(&self) -> String {
        format!("{}://{}", self.scheme, self.access_address)
    }

    /// Derives the reachability status from the current access address.
    pub fn status(&self) -> ServerStatus {
        if self.offline {
            return ServerStatus::Offline;
        }
        let remote = self.external_address.as_deref() == Some(self.access_address.as_str())
            || self
                .external_uri
                .as_deref()
                .is_some_and(|uri| uri.contains(&self.access_address));
        if remote {
            ServerStatus::Remote
        } else if self.local_addresses.contains(&self.access_address) {
            ServerStatus::Nearby
        } else {
            ServerStatus::Unknown
        }
    }

    /// Returns true if `host:port` is one of this server's addresses.
    pub fn matches_address(&self, host: &str, port: u16) -> bool {
        let wanted = format!("{}:{}", host, port);
        self.access_address == wanted
            || self.external_address.as_deref() == Some(wanted.as_str())
            || self.local_addresses.iter().any(|a| *a == wanted)
    }

    pub fn summary(&self) -> ServerSummary {
        ServerSummary {
            uuid: self.uuid.clone(),
            name: self.name.clone(),
            address: self.access_address.clone(),
            status: self.status(),
            secure: self.is_secure(),
        }
    }
}

/// Appends the default port when `address` has none.
pub fn with_default_port(address: &str) -> String {
    if address.contains(':') {
        address.to_string()
    } else {
        format!("{}:{}", address, DEFAULT_SERVER_PORT)
    }
}

fn split_host_port(address: &str) -> (&str, u16) {
    match address.rsplit_once(':') {
        Some((host, port)) => (host, port.parse().unwrap_or(DEFAULT_SERVER_PORT)),
        None => (address, DEFAULT_SERVER_PORT),
    }
}

/// Status line shown to users for one server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerSummary {
    pub uuid: String,
    pub name: String,
    pub address: String,
    pub status: ServerStatus,
    pub secure: bool,
}

/// Registry of known servers.
#[derive(Default)]
pub struct ServerRegistry {
    servers: RwLock<HashMap<String, ServerRecord>>,
    /// UUIDs in first-seen order, so listings are stable.
    order: RwLock<Vec<String>>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one discovery round.
    ///
    /// Cloud and user-entered records are kept and gain any local address
    /// discovered for them. Multicast records not seen in this round are
    /// dropped; those seen again keep their arbitration state while their
    /// access address is still one of the discovered addresses.
    pub fn replace_discovered(&self, discovered: &[DiscoveredServer]) {
        // Same lock order as `upsert`; held for the whole round so concurrent
        // writes land either before or after it.
        let mut servers = self.servers.write();
        let mut order = self.order.write();

        let previous = std::mem::take(&mut *servers);
        let mut next: HashMap<String, ServerRecord> = previous
            .iter()
            .filter(|(_, r)| r.origin != DiscoveryOrigin::LocalMulticast)
            .map(|(k, r)| (k.clone(), r.clone()))
            .collect();

        for server in discovered {
            if let Some(existing) = next.get_mut(&server.uuid) {
                existing.add_local_address(&server.location());
                continue;
            }

            let mut record = ServerRecord::from_discovered(server);
            if let Some(old) = previous.get(&server.uuid) {
                if record.local_addresses.contains(&old.access_address) {
                    record.access_address = old.access_address.clone();
                    record.scheme = old.scheme;
                    record.offline = old.offline;
                    record.token = old.token.clone();
                    record.user = old.user.clone();
                    record.multiuser = old.multiuser;
                }
            }
            next.insert(server.uuid.clone(), record);
        }

        order.retain(|uuid| next.contains_key(uuid));
        for server in discovered {
            if !order.contains(&server.uuid) {
                order.push(server.uuid.clone());
            }
        }

        log::debug!(
            "[Registry] Discovery round applied: {} discovered, {} known",
            discovered.len(),
            next.len()
        );
        *servers = next;
    }

    /// Adds or replaces a cloud-directory or user-entered record.
    pub fn upsert(&self, record: ServerRecord) {
        let mut servers = self.servers.write();
        let mut order = self.order.write();
        if !order.contains(&record.uuid) {
            order.push(record.uuid.clone());
        }
        log::debug!("[Registry] Upserted {} ({})", record.name, record.uuid);
        servers.insert(record.uuid.clone(), record);
    }

    /// Writes back a record after arbitration.
    ///
    /// Ignored if the server was removed in the meantime.
    pub fn store(&self, record: ServerRecord) {
        let mut servers = self.servers.write();
        if let Some(slot) = servers.get_mut(&record.uuid) {
            *slot = record;
        } else {
            log::debug!("[Registry] Dropping update for unknown server {}", record.uuid);
        }
    }

    pub fn get(&self, uuid: &str) -> Option<ServerRecord> {
        self.servers.read().get(uuid).cloned()
    }

    /// All records in first-seen order.
    pub fn list(&self) -> Vec<ServerRecord> {
        let servers = self.servers.read();
        self.order
            .read()
            .iter()
            .filter_map(|uuid| servers.get(uuid).cloned())
            .collect()
    }

    pub fn first(&self) -> Option<ServerRecord> {
        let servers = self.servers.read();
        self.order
            .read()
            .iter()
            .find_map(|uuid| servers.get(uuid).cloned())
    }

    pub fn len(&self) -> usize {
        self.servers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.read().is_empty()
    }

    /// Finds the server owning `host:port`.
    pub fn find_by_address(&self, host: &str, port: u16) -> Option<ServerRecord> {
        self.list()
            .into_iter()
            .find(|r| r.matches_address(host, port))
    }

    pub fn summaries(&self) -> Vec<ServerSummary> {
        self.list().iter().map(ServerRecord::summary).collect()
    }
}
