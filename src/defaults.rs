//! Build-time deployment constants.
//!
//! Timing, capacity and collector parameters are fixed at build time; there
//! is no runtime negotiation. The uplink credential can be overridden with
//! the `SNIFFNET_SSID` / `SNIFFNET_PASSWORD` environment variables when the
//! firmware is compiled.
use core::net::{Ipv4Addr, SocketAddrV4};

use crate::radio::Credentials;
use crate::sweep;

/// Capture log capacity (records)
pub const LOG_CAPACITY: usize = 500;

/// Length of each SNIFF phase
pub const SNIFF_MS: u32 = 30_000;

/// Length of each TRANSMIT phase, delivery included
pub const TRANSMIT_MS: u32 = 10_000;

/// Dwell per channel during SNIFF
pub const DWELL_MS: u32 = sweep::DEFAULT_DWELL_MS;

/// Upper bound on waiting for the station link after joining
pub const ASSOCIATION_TIMEOUT_MS: u32 = 5_000;

/// Association status poll interval
pub const ASSOCIATION_POLL_MS: u32 = 100;

/// Fixed collector endpoint
pub const COLLECTOR: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(192, 168, 100, 12), 58585);

/// Uplink network name
pub const HOST_SSID: &str = match option_env!("SNIFFNET_SSID") {
    Some(ssid) => ssid,
    None => "sniffnet",
};

/// Uplink network password
pub const HOST_PASSWORD: &str = match option_env!("SNIFFNET_PASSWORD") {
    Some(password) => password,
    None => "sniff1234",
};

pub const CREDENTIALS: Credentials = Credentials {
    ssid: HOST_SSID,
    password: HOST_PASSWORD,
};
