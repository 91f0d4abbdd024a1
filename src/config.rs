//! Runtime configuration for the duty cycle and the transport client.
//!
//! Both structs start from the build-time values in [`crate::defaults`];
//! firmware can adjust fields before handing them to the engine.

use core::net::SocketAddrV4;

use crate::defaults;
use crate::protocol::Framing;
use crate::radio::Credentials;

/// Phase timing and delivery policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyCycleConfig {
    /// SNIFF phase length in milliseconds
    pub sniff_ms: u32,
    /// TRANSMIT phase length in milliseconds, delivery included
    pub transmit_ms: u32,
    /// Payload framing sent to the collector
    pub framing: Framing,
    /// Connect and immediately drop once before each SNIFF phase to log
    /// collector reachability
    pub probe_on_sniff: bool,
}

impl DutyCycleConfig {
    pub const fn new() -> Self {
        Self {
            sniff_ms: defaults::SNIFF_MS,
            transmit_ms: defaults::TRANSMIT_MS,
            framing: Framing::Binary,
            probe_on_sniff: false,
        }
    }

    /// Length of one full SNIFF + TRANSMIT cycle.
    pub const fn period_ms(&self) -> u32 {
        self.sniff_ms + self.transmit_ms
    }
}

impl Default for DutyCycleConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Collector endpoint and uplink association parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    pub remote: SocketAddrV4,
    pub credentials: Credentials,
    /// Upper bound on waiting for the station link
    pub association_timeout_ms: u32,
    /// Association status poll interval
    pub association_poll_ms: u32,
}

impl TransportConfig {
    pub const fn new() -> Self {
        Self {
            remote: defaults::COLLECTOR,
            credentials: defaults::CREDENTIALS,
            association_timeout_ms: defaults::ASSOCIATION_TIMEOUT_MS,
            association_poll_ms: defaults::ASSOCIATION_POLL_MS,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new()
    }
}
