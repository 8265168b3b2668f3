//! One GDM discovery round.

use std::collections::HashSet;
use std::time::Instant;

use tokio::time::timeout;

use super::codec::parse_datagram;
use super::socket::discovery_socket;
use super::types::{DiscoveredServer, GdmConfig, GdmError, GdmResult};
use crate::protocol_constants::{GDM_MAX_DATAGRAM, GDM_SEARCH_MESSAGE};

/// Sends one search and collects replies until the discovery window closes.
///
/// Servers are returned in arrival order. A server answering twice in the
/// same round keeps its first reply.
pub(crate) async fn discover_servers(config: &GdmConfig) -> GdmResult<Vec<DiscoveredServer>> {
    let socket = discovery_socket(config)?;

    socket
        .send_to(GDM_SEARCH_MESSAGE.as_bytes(), config.discovery_target)
        .await
        .map_err(GdmError::Send)?;
    log::trace!("[GDM] Sent search to {}", config.discovery_target);

    let mut servers: Vec<DiscoveredServer> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut buf = [0u8; GDM_MAX_DATAGRAM];
    let start = Instant::now();

    while start.elapsed() < config.discovery_window {
        let remaining = config.discovery_window.saturating_sub(start.elapsed());
        match timeout(remaining, socket.recv_from(&mut buf)).await {
            Ok(Ok((amt, src))) => {
                let data = String::from_utf8_lossy(&buf[..amt]);
                let Some(server) =
                    parse_datagram(&data, src).and_then(|m| DiscoveredServer::from_message(&m))
                else {
                    log::trace!("[GDM] Ignoring datagram from {}", src);
                    continue;
                };

                if !seen.insert(server.uuid.clone()) {
                    continue;
                }
                log::debug!(
                    "[GDM] Found server: name={}, uuid={}, location={}",
                    server.name,
                    server.uuid,
                    server.location()
                );
                servers.push(server);
            }
            Ok(Err(e)) => {
                log::warn!("[GDM] Socket recv error during discovery: {}", e);
            }
            Err(_) => break,
        }
    }

    log::info!(
        "[GDM] Discovery round found {} server(s) in {}ms",
        servers.len(),
        start.elapsed().as_millis()
    );
    Ok(servers)
}
