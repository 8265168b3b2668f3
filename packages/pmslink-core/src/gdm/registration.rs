//! Client registration loop.
//!
//! Announces this client with HELLO, answers every inbound search with the
//! client data, and says BYE when cancelled.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use super::codec::is_search_request;
use super::socket::registration_socket;
use super::types::{ClientRegistration, GdmConfig, GdmError, GdmResult};
use crate::protocol_constants::GDM_MAX_DATAGRAM;

/// A bound registration socket ready to run.
pub struct RegistrationLoop {
    socket: UdpSocket,
    config: GdmConfig,
    registration: ClientRegistration,
    registered: Arc<AtomicBool>,
}

impl RegistrationLoop {
    /// Binds the registration socket.
    ///
    /// `registered` is set once a search has been answered and cleared when
    /// the loop exits.
    pub fn bind(
        config: GdmConfig,
        registration: ClientRegistration,
        registered: Arc<AtomicBool>,
    ) -> GdmResult<Self> {
        let socket = registration_socket(&config)?;
        Ok(Self {
            socket,
            config,
            registration,
            registered,
        })
    }

    /// Local address of the registration socket.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr().ok()
    }

    async fn send(&self, datagram: &str, target: SocketAddr) -> GdmResult<()> {
        self.socket
            .send_to(datagram.as_bytes(), target)
            .await
            .map(|_| ())
            .map_err(GdmError::Send)
    }

    /// Runs until `cancel` fires, then sends BYE once.
    ///
    /// Cancellation is observed within one poll interval.
    pub async fn run(self, cancel: CancellationToken) {
        let target = self.config.registration_target;
        if let Err(e) = self.send(&self.registration.hello_datagram(), target).await {
            log::warn!("[GDM] HELLO failed: {}", e);
        } else {
            log::info!(
                "[GDM] Registration started for {} ({})",
                self.registration.name(),
                self.registration.identifier()
            );
        }

        let response = self.registration.response_datagram();
        let mut buf = [0u8; GDM_MAX_DATAGRAM];

        loop {
            let recv = tokio::select! {
                _ = cancel.cancelled() => break,
                r = timeout(self.config.poll_interval, self.socket.recv_from(&mut buf)) => r,
            };

            match recv {
                Ok(Ok((amt, src))) => {
                    let data = String::from_utf8_lossy(&buf[..amt]);
                    if !is_search_request(&data) {
                        continue;
                    }
                    log::debug!("[GDM] Search from {}, replying", src);
                    match self.send(&response, src).await {
                        Ok(()) => {
                            if !self.registered.swap(true, Ordering::SeqCst) {
                                log::info!("[GDM] Client registered (first reply to {})", src);
                            }
                        }
                        Err(e) => log::warn!("[GDM] Reply to {} failed: {}", src, e),
                    }
                }
                Ok(Err(e)) => log::warn!("[GDM] Registration recv error: {}", e),
                Err(_) => {}
            }
        }

        if let Err(e) = self.send(&self.registration.bye_datagram(), target).await {
            log::warn!("[GDM] BYE failed: {}", e);
        }
        self.registered.store(false, Ordering::SeqCst);
        log::info!("[GDM] Registration stopped");
    }
}
