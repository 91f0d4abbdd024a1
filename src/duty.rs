//! Duty-cycle state machine.
//!
//! Alternates the radio between a SNIFF phase (promiscuous capture with
//! channel sweeping) and a TRANSMIT phase (join the uplink, deliver the
//! capture log, clear it). Transitions are driven purely by time: a phase
//! always ends on its timer, whatever happened inside it.
//!
//! ```text
//! Init ─► Sniff ─► SniffDraining ─► Transmit ─► TransmitDraining ─┐
//!           ▲                                                     │
//!           └─────────────────────────────────────────────────────┘
//! ```
//!
//! The state machine owns the radio and the transport client, and borrows
//! the capture pipeline and sweep control it shares with the callback and
//! sweep tasks.

use embedded_hal::delay::DelayNs;

use crate::comm::{NetStack, TransportClient, TransportError};
use crate::config::DutyCycleConfig;
use crate::protocol::{self, EncodeError, Framing, COUNT_LEN};
use crate::radio::{Clock, Radio, RadioMode};
use crate::scanner::{CaptureStats, FrameCapture};
use crate::sweep::SweepControl;

/// Duty-cycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Sniff,
    SniffDraining,
    Transmit,
    TransmitDraining,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Init => "INIT",
            Phase::Sniff => "SNIFF",
            Phase::SniffDraining => "SNIFF_DRAINING",
            Phase::Transmit => "TRANSMIT",
            Phase::TransmitDraining => "TRANSMIT_DRAINING",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("short write ({sent} of {expected} bytes)")]
    ShortWrite { sent: usize, expected: usize },
}

/// Outcome of one SNIFF + TRANSMIT cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// 1-based cycle number
    pub cycle: u32,
    /// Capture counters at the end of the SNIFF phase
    pub capture: CaptureStats,
    /// Bytes delivered, or why delivery failed
    pub delivery: Result<usize, DeliveryError>,
}

/// The capture/transmit orchestrator.
pub struct DutyCycle<'a, R, S, D, C, const N: usize>
where
    R: Radio,
    S: NetStack,
    D: DelayNs,
    C: Clock,
{
    config: DutyCycleConfig,
    radio: R,
    client: TransportClient<S>,
    delay: D,
    capture: &'a FrameCapture<'a, C, N>,
    sweep: &'a SweepControl,
    payload: &'a mut [u8],
    phase: Phase,
    cycle: u32,
    transmit_started: u32,
    stats: CaptureStats,
    last_report: Option<CycleReport>,
}

impl<'a, R, S, D, C, const N: usize> DutyCycle<'a, R, S, D, C, N>
where
    R: Radio,
    S: NetStack,
    D: DelayNs,
    C: Clock,
{
    /// `payload` is the scratch buffer the log is encoded into; size it with
    /// [`protocol::payload_capacity`] for the configured framing and `N`.
    pub fn new(
        config: DutyCycleConfig,
        radio: R,
        client: TransportClient<S>,
        delay: D,
        capture: &'a FrameCapture<'a, C, N>,
        sweep: &'a SweepControl,
        payload: &'a mut [u8],
    ) -> Self {
        let needed = protocol::payload_capacity(config.framing, N);
        if payload.len() < needed {
            log::warn!(
                "Payload buffer holds {} bytes, a full log needs {}",
                payload.len(),
                needed
            );
        }
        Self {
            config,
            radio,
            client,
            delay,
            capture,
            sweep,
            payload,
            phase: Phase::Init,
            cycle: 0,
            transmit_started: 0,
            stats: CaptureStats::default(),
            last_report: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    pub fn last_report(&self) -> Option<&CycleReport> {
        self.last_report.as_ref()
    }

    pub fn client(&self) -> &TransportClient<S> {
        &self.client
    }

    /// Perform the next transition, blocking for the phase timer where one
    /// applies. Returns the phase entered.
    pub fn step(&mut self) -> Phase {
        let next = match self.phase {
            Phase::Init | Phase::TransmitDraining => {
                self.start_sniff();
                Phase::Sniff
            }
            Phase::Sniff => {
                self.delay.delay_ms(self.config.sniff_ms);
                self.stop_sniff();
                Phase::SniffDraining
            }
            Phase::SniffDraining => {
                self.start_transmit();
                Phase::Transmit
            }
            Phase::Transmit => {
                self.wait_transmit_window();
                self.finish_transmit();
                Phase::TransmitDraining
            }
        };
        log::debug!("{} -> {}", self.phase.as_str(), next.as_str());
        self.phase = next;
        next
    }

    /// Run the cycle forever.
    pub fn run(&mut self) -> ! {
        loop {
            self.step();
        }
    }

    fn start_sniff(&mut self) {
        self.cycle = self.cycle.wrapping_add(1);

        if self.config.probe_on_sniff {
            check("station mode", self.radio.set_mode(RadioMode::Station));
            self.client.probe(&mut self.radio, &mut self.delay);
        }

        log::info!("SNIFF phase {} for {} ms", self.cycle, self.config.sniff_ms);
        check("listen-only mode", self.radio.set_mode(RadioMode::ListenOnly));
        check("power save off", self.radio.set_power_save(false));
        self.capture.arm();
        check("promiscuous on", self.radio.set_promiscuous(true));
        self.sweep.start();
    }

    /// The single hard synchronization point: once this returns no
    /// callback can touch the log until the next `start_sniff`.
    fn stop_sniff(&mut self) {
        check("promiscuous off", self.radio.set_promiscuous(false));
        self.capture.disarm(&mut self.delay);
        self.sweep.cancel(&mut self.delay);

        self.stats = self.capture.stats();
        log::info!(
            "SNIFF phase {} done: {} records, {} dropped, {} malformed",
            self.cycle,
            self.stats.captured,
            self.stats.dropped,
            self.stats.malformed
        );
    }

    fn start_transmit(&mut self) {
        self.transmit_started = self.capture.now_ms();
        log::info!("TRANSMIT phase {} for {} ms", self.cycle, self.config.transmit_ms);
        check("station mode", self.radio.set_mode(RadioMode::Station));

        let delivery = match self.client.connect(&mut self.radio, &mut self.delay) {
            Ok(()) => self.deliver(),
            Err(e) => Err(e.into()),
        };

        match delivery {
            Ok(bytes) => log::info!(
                "Delivered {} records ({} bytes, {}) to {}",
                self.stats.captured,
                bytes,
                self.config.framing.as_str(),
                self.client.remote()
            ),
            Err(e) => log::warn!(
                "Delivery failed: {}; {} records will be discarded",
                e,
                self.stats.captured
            ),
        }

        self.last_report = Some(CycleReport {
            cycle: self.cycle,
            capture: self.stats,
            delivery,
        });
    }

    fn deliver(&mut self) -> Result<usize, DeliveryError> {
        let log = self.capture.log();
        match self.config.framing {
            Framing::Binary => {
                let len = protocol::encode_records(log.snapshot(), &mut self.payload[..])?;
                let count = protocol::encode_count(len / protocol::RECORD_LEN);
                send_exact(&mut self.client, &count)?;
                if len > 0 {
                    send_exact(&mut self.client, &self.payload[..len])?;
                }
                Ok(COUNT_LEN + len)
            }
            Framing::Json => {
                let len = protocol::encode_json(log.snapshot(), &mut self.payload[..])?;
                send_exact(&mut self.client, &self.payload[..len])?;
                Ok(len)
            }
        }
    }

    fn wait_transmit_window(&mut self) {
        let elapsed = self.capture.now_ms().wrapping_sub(self.transmit_started);
        let remaining = self.config.transmit_ms.saturating_sub(elapsed);
        if remaining > 0 {
            self.delay.delay_ms(remaining);
        }
    }

    fn finish_transmit(&mut self) {
        self.client.disconnect(&mut self.radio);
        // Cleared whether or not delivery succeeded.
        self.capture.log().clear();
        log::info!("TRANSMIT phase {} done, log cleared", self.cycle);
    }
}

fn send_exact<S: NetStack>(
    client: &mut TransportClient<S>,
    data: &[u8],
) -> Result<(), DeliveryError> {
    let sent = client.send(data)?;
    if sent != data.len() {
        return Err(DeliveryError::ShortWrite {
            sent,
            expected: data.len(),
        });
    }
    Ok(())
}

fn check<E: core::fmt::Debug>(what: &str, result: Result<(), E>) {
    if let Err(e) = result {
        log::warn!("Radio {} failed: {:?}", what, e);
    }
}
