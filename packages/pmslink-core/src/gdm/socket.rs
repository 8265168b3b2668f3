//! UDP socket construction for GDM.
//!
//! Sockets are built with socket2 so multicast options can be applied before
//! binding, then handed to tokio.

use std::net::{Ipv4Addr, SocketAddr};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

use super::types::{GdmConfig, GdmError, GdmResult};

/// Multicast TTL for discovery searches (link-local only).
const DISCOVERY_TTL: u32 = 1;

/// Multicast TTL for registration announcements.
const REGISTRATION_TTL: u32 = 255;

fn into_tokio(socket: Socket) -> GdmResult<UdpSocket> {
    socket.set_nonblocking(true).map_err(GdmError::SocketBind)?;
    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket).map_err(GdmError::SocketBind)
}

/// Creates the ephemeral socket used for one discovery round.
///
/// Replies arrive unicast on the same socket, so one socket does both send
/// and receive.
pub(crate) fn discovery_socket(config: &GdmConfig) -> GdmResult<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(GdmError::SocketBind)?;

    if let Err(e) = socket.set_multicast_ttl_v4(DISCOVERY_TTL) {
        log::warn!("[GDM] Failed to set multicast TTL: {}", e);
    }

    if let Some(iface) = config.interface {
        if let Err(e) = socket.set_multicast_if_v4(&iface) {
            log::warn!("[GDM] Failed to select multicast interface {}: {}", iface, e);
        }
    }

    let bind_addr = SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 0);
    socket
        .bind(&bind_addr.into())
        .map_err(GdmError::SocketBind)?;

    into_tokio(socket)
}

/// Creates the long-lived registration socket on the client update port.
///
/// Address reuse lets several clients on one host share the port. Failing to
/// join the group is not fatal: unicast searches still reach the socket.
pub(crate) fn registration_socket(config: &GdmConfig) -> GdmResult<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(GdmError::SocketBind)?;

    if let Err(e) = socket.set_reuse_address(true) {
        log::warn!("[GDM] Failed to set SO_REUSEADDR: {}", e);
    }

    #[cfg(unix)]
    if let Err(e) = socket.set_reuse_port(true) {
        log::warn!("[GDM] Failed to set SO_REUSEPORT: {}", e);
    }

    socket
        .bind(&config.client_update_bind.into())
        .map_err(GdmError::SocketBind)?;

    if let Err(e) = socket.set_multicast_ttl_v4(REGISTRATION_TTL) {
        log::warn!("[GDM] Failed to set multicast TTL: {}", e);
    }

    let iface = config.interface.unwrap_or(Ipv4Addr::UNSPECIFIED);
    if let Err(e) = socket.join_multicast_v4(&config.multicast_group, &iface) {
        log::warn!("[GDM] {}", GdmError::MulticastJoin(e));
    }

    into_tokio(socket)
}
