//! Frame capture pipeline.
//!
//! [`FrameCapture::on_frame`] is the body of the WiFi driver's promiscuous
//! receive callback. It reads just enough of the 802.11 MAC header to get
//! the transmitter address and frame control word, stamps the record with
//! the clock and the sweep's current channel, and appends it to the
//! capture log.
//!
//! Safe to call from the driver's callback context: no allocation, no
//! blocking, no per-frame logging. Diagnostics are kept in counters that
//! the duty cycle reports once per phase.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embedded_hal::delay::DelayNs;

use crate::buffer::SharedLog;
use crate::radio::Clock;
use crate::record::Observation;
use crate::sweep::CurrentChannel;

/// Minimum header length we parse:
/// 2 (frame ctrl) + 2 (duration) + 6 (addr1) + 6 (addr2)
pub const MIN_HEADER_LEN: usize = 16;

/// Offset of Address 2 (transmitter) in the MAC header
const SENDER_OFFSET: usize = 10;

/// Poll interval while waiting for in-flight callbacks to drain
const DRAIN_POLL_US: u32 = 100;

/// Fields extracted from the fixed part of an 802.11 MAC header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub frame_control: u16,
    pub sender: [u8; 6],
}

/// Parse the frame control word and Address 2 from a raw frame.
///
/// Returns `None` for frames shorter than [`MIN_HEADER_LEN`].
pub fn parse_header(frame: &[u8]) -> Option<FrameHeader> {
    if frame.len() < MIN_HEADER_LEN {
        return None;
    }
    let frame_control = u16::from_le_bytes([frame[0], frame[1]]);
    let sender: [u8; 6] = frame[SENDER_OFFSET..SENDER_OFFSET + 6].try_into().ok()?;
    Some(FrameHeader {
        frame_control,
        sender,
    })
}

/// Per-phase capture counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Records currently in the log
    pub captured: usize,
    /// Frames dropped because the log was full
    pub dropped: u32,
    /// Null or truncated buffers discarded
    pub malformed: u32,
}

/// Sniffer callback state: the log it writes to, the channel it stamps,
/// and the arm/disarm gate that fences it off from the duty cycle.
pub struct FrameCapture<'a, C: Clock, const N: usize> {
    log: &'a SharedLog<N>,
    channel: &'a CurrentChannel,
    clock: C,
    armed: AtomicBool,
    in_flight: AtomicU32,
    dropped: AtomicU32,
    malformed: AtomicU32,
}

impl<'a, C: Clock, const N: usize> FrameCapture<'a, C, N> {
    pub const fn new(log: &'a SharedLog<N>, channel: &'a CurrentChannel, clock: C) -> Self {
        Self {
            log,
            channel,
            clock,
            armed: AtomicBool::new(false),
            in_flight: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
            malformed: AtomicU32::new(0),
        }
    }

    /// Handle one received frame. `frame` is `None` when the driver handed
    /// over a null buffer.
    ///
    /// Returns `true` if a record was appended.
    pub fn on_frame(&self, frame: Option<&[u8]>, rssi: i8) -> bool {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let stored = self.capture(frame, rssi);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        stored
    }

    fn capture(&self, frame: Option<&[u8]>, rssi: i8) -> bool {
        if !self.armed.load(Ordering::SeqCst) {
            return false;
        }
        if self.log.is_full() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        let Some(header) = frame.and_then(parse_header) else {
            self.malformed.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        let record = Observation {
            timestamp: self.clock.now_ms(),
            sender: header.sender,
            rssi,
            channel: self.channel.get(),
            frame_control: header.frame_control,
        };
        if self.log.append(record) {
            true
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Reset the counters and start accepting frames.
    pub fn arm(&self) {
        self.dropped.store(0, Ordering::Relaxed);
        self.malformed.store(0, Ordering::Relaxed);
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Stop accepting frames and wait until no callback is mid-append.
    ///
    /// After this returns the log can be read and cleared without racing
    /// the producer.
    pub fn disarm<D: DelayNs>(&self, delay: &mut D) {
        self.armed.store(false, Ordering::SeqCst);
        while self.in_flight.load(Ordering::SeqCst) != 0 {
            delay.delay_us(DRAIN_POLL_US);
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> CaptureStats {
        CaptureStats {
            captured: self.log.len(),
            dropped: self.dropped.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
        }
    }

    pub fn log(&self) -> &'a SharedLog<N> {
        self.log
    }

    pub fn now_ms(&self) -> u32 {
        self.clock.now_ms()
    }
}
