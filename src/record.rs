//! A single captured frame observation.
//!
//! One record is produced per frame accepted by the sniffer callback.
//! Records are `Copy` and fixed-size so the capture log can live in a
//! static array with no allocator.

/// Metadata extracted from one received 802.11 frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// Device uptime in milliseconds at capture (wraps after ~49 days)
    pub timestamp: u32,
    /// Transmitter address (Address 2) copied verbatim from the header
    pub sender: [u8; 6],
    /// Driver-reported RSSI in dBm
    pub rssi: i8,
    /// Channel the radio was tuned to at capture time
    pub channel: u8,
    /// Raw frame control word, kept for offline filtering
    pub frame_control: u16,
}

impl Observation {
    /// All-zero record used to fill and wipe log storage.
    pub const EMPTY: Self = Self {
        timestamp: 0,
        sender: [0; 6],
        rssi: 0,
        channel: 0,
        frame_control: 0,
    };
}

impl Default for Observation {
    fn default() -> Self {
        Self::EMPTY
    }
}
