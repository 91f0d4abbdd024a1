//! Transport client: delivers the capture log to the fixed collector.
//!
//! Owns the single outbound connection handle. Each TRANSMIT phase joins
//! the uplink network, opens one connection-oriented socket to the
//! collector, sends the framed log and tears everything down again.
//! Delivery is best effort: there is no retry and no acknowledgement.

use core::net::SocketAddrV4;

use embedded_hal::delay::DelayNs;

use crate::config::TransportConfig;
use crate::radio::Radio;

/// Connection-oriented byte stream primitive provided by the platform.
pub trait NetStack {
    type Socket;
    type Error: core::fmt::Debug;

    /// Create an unconnected socket.
    fn open(&mut self) -> Result<Self::Socket, Self::Error>;

    /// Perform the connection handshake with `remote`.
    fn connect(&mut self, socket: &mut Self::Socket, remote: SocketAddrV4) -> Result<(), Self::Error>;

    /// Write `data` once. Returns the number of bytes accepted.
    fn send(&mut self, socket: &mut Self::Socket, data: &[u8]) -> Result<usize, Self::Error>;

    fn close(&mut self, socket: Self::Socket);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("not connected")]
    NotConnected,
    #[error("station association failed")]
    Association,
    #[error("station association timed out after {0} ms")]
    AssociationTimeout(u32),
    #[error("socket open failed")]
    Open,
    #[error("connect to collector failed")]
    Connect,
    #[error("send failed")]
    Send,
}

/// Outbound connection to the collector.
pub struct TransportClient<S: NetStack> {
    stack: S,
    config: TransportConfig,
    socket: Option<S::Socket>,
    station: bool,
}

impl<S: NetStack> TransportClient<S> {
    pub fn new(stack: S, config: TransportConfig) -> Self {
        Self {
            stack,
            config,
            socket: None,
            station: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    pub fn remote(&self) -> SocketAddrV4 {
        self.config.remote
    }

    /// Join the uplink network and open a connection to the collector.
    ///
    /// On failure no socket is left open. An existing connection is closed
    /// first.
    pub fn connect<R: Radio, D: DelayNs>(
        &mut self,
        radio: &mut R,
        delay: &mut D,
    ) -> Result<(), TransportError> {
        self.close_socket();

        let ssid = self.config.credentials.ssid;
        if let Err(e) = radio.connect_station(&self.config.credentials) {
            log::warn!("Joining '{}' failed: {:?}", ssid, e);
            return Err(TransportError::Association);
        }
        self.station = true;
        self.wait_associated(radio, delay)?;

        let mut socket = self.stack.open().map_err(|e| {
            log::error!("Unable to create socket: {:?}", e);
            TransportError::Open
        })?;

        log::info!("Connecting to {}", self.config.remote);
        if let Err(e) = self.stack.connect(&mut socket, self.config.remote) {
            log::error!("Connect to {} failed: {:?}", self.config.remote, e);
            self.stack.close(socket);
            return Err(TransportError::Connect);
        }

        self.socket = Some(socket);
        log::info!("Connected to {}", self.config.remote);
        Ok(())
    }

    /// Send `data` over the open connection. No retry, no chunking.
    pub fn send(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let Some(socket) = self.socket.as_mut() else {
            return Err(TransportError::NotConnected);
        };
        match self.stack.send(socket, data) {
            Ok(sent) => {
                log::info!("Sent {} bytes", sent);
                Ok(sent)
            }
            Err(e) => {
                log::error!("Send failed: {:?}", e);
                Err(TransportError::Send)
            }
        }
    }

    /// Close the connection and leave the uplink network. Safe to call when
    /// already disconnected.
    pub fn disconnect<R: Radio>(&mut self, radio: &mut R) {
        self.close_socket();
        if self.station {
            self.station = false;
            if let Err(e) = radio.disconnect_station() {
                log::warn!("Leaving '{}' failed: {:?}", self.config.credentials.ssid, e);
            }
        }
    }

    /// Check the collector is reachable without keeping the link up.
    pub fn probe<R: Radio, D: DelayNs>(&mut self, radio: &mut R, delay: &mut D) -> bool {
        let reachable = self.connect(radio, delay).is_ok();
        self.disconnect(radio);
        if reachable {
            log::info!("Collector {} reachable", self.config.remote);
        } else {
            log::warn!("Collector {} unreachable", self.config.remote);
        }
        reachable
    }

    fn wait_associated<R: Radio, D: DelayNs>(
        &self,
        radio: &mut R,
        delay: &mut D,
    ) -> Result<(), TransportError> {
        let timeout = self.config.association_timeout_ms;
        let poll = self.config.association_poll_ms.max(1);
        let mut waited = 0;
        loop {
            if radio.is_associated() {
                log::info!("Associated with '{}' after {} ms", self.config.credentials.ssid, waited);
                return Ok(());
            }
            if waited >= timeout {
                log::warn!("No association with '{}' after {} ms", self.config.credentials.ssid, timeout);
                return Err(TransportError::AssociationTimeout(timeout));
            }
            delay.delay_ms(poll);
            waited += poll;
        }
    }

    fn close_socket(&mut self) {
        if let Some(socket) = self.socket.take() {
            self.stack.close(socket);
        }
    }
}
