//! Capability traits for the platform collaborators.
//!
//! The engine never touches the WiFi driver directly. Firmware binaries
//! implement these traits on top of the vendor driver; host tests implement
//! them with recording fakes.

/// Operating mode of the WiFi radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioMode {
    /// No interface up; only promiscuous reception.
    ListenOnly,
    /// Station interface, used to join the uplink network.
    Station,
}

impl RadioMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RadioMode::ListenOnly => "listen-only",
            RadioMode::Station => "station",
        }
    }
}

/// Pre-shared credential for the uplink network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credentials {
    pub ssid: &'static str,
    pub password: &'static str,
}

/// WiFi driver operations used by the duty cycle and the transport client.
///
/// Every call reports success or failure; callers log failures and carry on.
pub trait Radio {
    type Error: core::fmt::Debug;

    fn set_mode(&mut self, mode: RadioMode) -> Result<(), Self::Error>;

    fn set_power_save(&mut self, enabled: bool) -> Result<(), Self::Error>;

    /// Enable or disable promiscuous delivery.
    ///
    /// Enabling installs the sniffer receive callback with an accept-all
    /// frame filter. Disabling must not return until the driver has
    /// detached the callback.
    fn set_promiscuous(&mut self, enabled: bool) -> Result<(), Self::Error>;

    /// Start joining the uplink network. Association completes
    /// asynchronously; poll [`Radio::is_associated`].
    fn connect_station(&mut self, credentials: &Credentials) -> Result<(), Self::Error>;

    /// Whether the station link is up and usable for sockets.
    fn is_associated(&mut self) -> bool;

    fn disconnect_station(&mut self) -> Result<(), Self::Error>;
}

/// Receive channel control, owned by the channel sweep task.
pub trait ChannelTuner {
    type Error: core::fmt::Debug;

    fn set_channel(&mut self, channel: u8) -> Result<(), Self::Error>;
}

/// Monotonic millisecond clock. Must be callable from the sniffer callback.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

impl<C: Clock> Clock for &C {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}
