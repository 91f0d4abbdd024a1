//! Channel sweep scheduler.
//!
//! Cycles the receive channel through the 2.4 GHz plan while a SNIFF phase
//! is active, publishing the tuned channel for the capture pipeline to
//! stamp records with. The worker is a long-lived task gated by a
//! [`SweepControl`]; the duty cycle starts and cancels sessions on it.

use core::sync::atomic::{AtomicU8, Ordering};

use embedded_hal::delay::DelayNs;

use crate::radio::ChannelTuner;

/// WiFi channels to sweep (2.4 GHz band)
pub const WIFI_CHANNELS: &[u8] = &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13];

/// Default dwell time per channel in milliseconds.
/// Full cycle: 13 channels × 500ms = 6.5s.
pub const DEFAULT_DWELL_MS: u32 = 500;

/// Granularity at which a dwell notices cancellation.
const CANCEL_POLL_MS: u32 = 10;

/// Idle worker poll interval while no session is requested.
const IDLE_POLL_MS: u32 = 50;

/// The channel the radio is currently tuned to.
///
/// Written by the sweep, read by the sniffer callback. Best-effort: a stale
/// read only mis-tags one record.
pub struct CurrentChannel(AtomicU8);

impl CurrentChannel {
    pub const fn new() -> Self {
        Self(AtomicU8::new(WIFI_CHANNELS[0]))
    }

    pub fn get(&self) -> u8 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, channel: u8) {
        self.0.store(channel, Ordering::Relaxed);
    }
}

impl Default for CurrentChannel {
    fn default() -> Self {
        Self::new()
    }
}

const IDLE: u8 = 0;
const START_REQUESTED: u8 = 1;
const RUNNING: u8 = 2;
const CANCELLING: u8 = 3;

/// Start/cancel handshake between the duty cycle and the sweep worker.
pub struct SweepControl {
    state: AtomicU8,
}

impl SweepControl {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(IDLE),
        }
    }

    /// Request a new sweep session starting from the first channel.
    ///
    /// Ignored unless the sweep is idle.
    pub fn start(&self) {
        if self
            .state
            .compare_exchange(IDLE, START_REQUESTED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::warn!("Channel sweep start requested while not idle");
        }
    }

    /// Ask the sweep to stop without waiting.
    ///
    /// Returns `true` if the sweep is already stopped (including a start
    /// request the worker had not picked up yet).
    pub fn request_cancel(&self) -> bool {
        loop {
            match self.state.load(Ordering::Acquire) {
                IDLE => return true,
                CANCELLING => return false,
                START_REQUESTED => {
                    if self
                        .state
                        .compare_exchange(START_REQUESTED, IDLE, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return true;
                    }
                }
                _ => {
                    if self
                        .state
                        .compare_exchange(RUNNING, CANCELLING, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return false;
                    }
                }
            }
        }
    }

    /// Stop the sweep and block until the worker confirms it has stopped.
    ///
    /// The worker only observes cancellation between hops, so on return the
    /// radio is settled on the last channel it was tuned to.
    pub fn cancel<D: DelayNs>(&self, delay: &mut D) {
        if self.request_cancel() {
            return;
        }
        while self.state.load(Ordering::Acquire) != IDLE {
            delay.delay_ms(CANCEL_POLL_MS);
        }
    }

    /// Whether a session is requested or running.
    pub fn is_active(&self) -> bool {
        matches!(self.state.load(Ordering::Acquire), START_REQUESTED | RUNNING)
    }

    fn begin(&self) -> bool {
        self.state
            .compare_exchange(START_REQUESTED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) == RUNNING
    }

    fn finish(&self) {
        self.state.store(IDLE, Ordering::Release);
    }
}

impl Default for SweepControl {
    fn default() -> Self {
        Self::new()
    }
}

/// The sweep worker: hops channels while its control says so.
pub struct ChannelSweep<'a, T: ChannelTuner> {
    tuner: T,
    current: &'a CurrentChannel,
    control: &'a SweepControl,
    dwell_ms: u32,
    next: usize,
}

impl<'a, T: ChannelTuner> ChannelSweep<'a, T> {
    pub fn new(
        tuner: T,
        current: &'a CurrentChannel,
        control: &'a SweepControl,
        dwell_ms: u32,
    ) -> Self {
        Self {
            tuner,
            current,
            control,
            dwell_ms,
            next: 0,
        }
    }

    /// Tune to the next channel in the plan.
    ///
    /// The channel is published only once the radio accepted it. A failed
    /// hop still advances the plan so the sweep never stalls on one channel.
    pub fn hop(&mut self) -> Option<u8> {
        let ch = WIFI_CHANNELS[self.next];
        self.next = (self.next + 1) % WIFI_CHANNELS.len();

        match self.tuner.set_channel(ch) {
            Ok(()) => {
                self.current.set(ch);
                log::debug!("Set channel {}", ch);
                Some(ch)
            }
            Err(e) => {
                log::warn!("Channel {} set failed: {:?}", ch, e);
                None
            }
        }
    }

    /// Run one session if a start was requested.
    ///
    /// Begins at the first channel, hops every dwell until cancelled and
    /// returns the number of hops attempted, or `None` when no session was
    /// pending.
    pub fn run_session<D: DelayNs>(&mut self, delay: &mut D) -> Option<u32> {
        if !self.control.begin() {
            return None;
        }
        self.next = 0;

        let mut hops = 0;
        while self.control.is_running() {
            self.hop();
            hops += 1;
            self.dwell(delay);
        }

        self.control.finish();
        Some(hops)
    }

    /// Worker loop. Never returns.
    pub fn run<D: DelayNs>(&mut self, delay: &mut D) -> ! {
        loop {
            match self.run_session(delay) {
                Some(hops) => log::debug!("Channel sweep stopped after {} hops", hops),
                None => delay.delay_ms(IDLE_POLL_MS),
            }
        }
    }

    fn dwell<D: DelayNs>(&self, delay: &mut D) {
        let mut remaining = self.dwell_ms;
        while remaining > 0 && self.control.is_running() {
            let slice = remaining.min(CANCEL_POLL_MS);
            delay.delay_ms(slice);
            remaining -= slice;
        }
    }
}
