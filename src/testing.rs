//! Host-side fakes for the platform collaborators.
//!
//! Each fake is shared by reference: the trait is implemented for `&Fake`
//! with interior mutability so a test can hand the fake to the engine and
//! still inspect what happened.

use core::cell::{Cell, RefCell};
use core::net::SocketAddrV4;
use core::sync::atomic::{AtomicU64, Ordering};

use embedded_hal::delay::DelayNs;

use crate::comm::NetStack;
use crate::radio::{ChannelTuner, Clock, Credentials, Radio, RadioMode};

// ── Time ────────────────────────────────────────────────────────────

/// Simulated monotonic time, advanced only by [`SimDelay`].
pub struct SimTime {
    ns: AtomicU64,
}

impl SimTime {
    pub fn new() -> Self {
        Self {
            ns: AtomicU64::new(0),
        }
    }

    pub fn advance_ns(&self, ns: u64) {
        self.ns.fetch_add(ns, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance_ns(ms * 1_000_000);
    }

    pub fn now_ms_u64(&self) -> u64 {
        self.ns.load(Ordering::SeqCst) / 1_000_000
    }

    pub fn delay(&self) -> SimDelay<'_> {
        SimDelay { time: self }
    }
}

impl Clock for SimTime {
    fn now_ms(&self) -> u32 {
        self.now_ms_u64() as u32
    }
}

pub struct SimDelay<'a> {
    time: &'a SimTime,
}

impl DelayNs for SimDelay<'_> {
    fn delay_ns(&mut self, ns: u32) {
        self.time.advance_ns(ns as u64);
    }

    fn delay_us(&mut self, us: u32) {
        self.time.advance_ns(us as u64 * 1_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.time.advance_ms(ms as u64);
    }
}

/// Wall-clock delay for tests that run real threads.
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(ns as u64));
    }
}

// ── Frames ──────────────────────────────────────────────────────────

/// A 24-byte management header with the given transmitter and frame control.
pub fn frame(sender: [u8; 6], frame_control: u16) -> [u8; 24] {
    let mut raw = [0u8; 24];
    raw[0..2].copy_from_slice(&frame_control.to_le_bytes());
    raw[4..10].copy_from_slice(&[0xFF; 6]);
    raw[10..16].copy_from_slice(&sender);
    raw[16..22].copy_from_slice(&sender);
    raw
}

// ── Channel tuner ───────────────────────────────────────────────────

pub struct FakeTuner {
    tuned: RefCell<Vec<u8>>,
    fail_on: Option<u8>,
}

impl FakeTuner {
    pub fn new() -> Self {
        Self {
            tuned: RefCell::new(Vec::new()),
            fail_on: None,
        }
    }

    pub fn failing_on(channel: u8) -> Self {
        Self {
            fail_on: Some(channel),
            ..Self::new()
        }
    }

    /// Channels successfully tuned, in order.
    pub fn tuned(&self) -> Vec<u8> {
        self.tuned.borrow().clone()
    }
}

impl ChannelTuner for &FakeTuner {
    type Error = &'static str;

    fn set_channel(&mut self, channel: u8) -> Result<(), Self::Error> {
        if self.fail_on == Some(channel) {
            return Err("channel rejected");
        }
        self.tuned.borrow_mut().push(channel);
        Ok(())
    }
}

// ── Radio ───────────────────────────────────────────────────────────

/// Records every capability call as a short event string.
pub struct FakeRadio {
    events: RefCell<Vec<String>>,
    associated: Cell<bool>,
    fail_station: Cell<bool>,
    never_associate: Cell<bool>,
    pending_polls: Cell<u32>,
}

impl FakeRadio {
    pub fn new() -> Self {
        Self {
            events: RefCell::new(Vec::new()),
            associated: Cell::new(false),
            fail_station: Cell::new(false),
            never_associate: Cell::new(false),
            pending_polls: Cell::new(0),
        }
    }

    pub fn fail_station(&self, fail: bool) {
        self.fail_station.set(fail);
    }

    pub fn never_associate(&self, never: bool) {
        self.never_associate.set(never);
    }

    /// Report the link as down for the first `polls` status checks after
    /// joining, as while DHCP is still pending.
    pub fn associate_after(&self, polls: u32) {
        self.pending_polls.set(polls);
    }

    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    pub fn clear_events(&self) {
        self.events.borrow_mut().clear();
    }

    fn record(&self, event: String) {
        self.events.borrow_mut().push(event);
    }
}

impl Radio for &FakeRadio {
    type Error = &'static str;

    fn set_mode(&mut self, mode: RadioMode) -> Result<(), Self::Error> {
        self.record(format!("mode:{}", mode.as_str()));
        Ok(())
    }

    fn set_power_save(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.record(format!("power_save:{enabled}"));
        Ok(())
    }

    fn set_promiscuous(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.record(format!("promiscuous:{enabled}"));
        Ok(())
    }

    fn connect_station(&mut self, credentials: &Credentials) -> Result<(), Self::Error> {
        self.record(format!("connect_station:{}", credentials.ssid));
        if self.fail_station.get() {
            return Err("association refused");
        }
        if !self.never_associate.get() {
            self.associated.set(true);
        }
        Ok(())
    }

    fn is_associated(&mut self) -> bool {
        if !self.associated.get() {
            return false;
        }
        let pending = self.pending_polls.get();
        if pending > 0 {
            self.pending_polls.set(pending - 1);
            return false;
        }
        true
    }

    fn disconnect_station(&mut self) -> Result<(), Self::Error> {
        self.record("disconnect_station".to_string());
        self.associated.set(false);
        Ok(())
    }
}

// ── Network stack ───────────────────────────────────────────────────

pub struct FakeNet {
    next_id: Cell<u32>,
    open: RefCell<Vec<u32>>,
    connected_to: RefCell<Vec<SocketAddrV4>>,
    sent: RefCell<Vec<Vec<u8>>>,
    touches: Cell<u32>,
    fail_open: Cell<bool>,
    fail_connect: Cell<bool>,
    fail_send: Cell<bool>,
    send_limit: Cell<Option<usize>>,
}

impl FakeNet {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            open: RefCell::new(Vec::new()),
            connected_to: RefCell::new(Vec::new()),
            sent: RefCell::new(Vec::new()),
            touches: Cell::new(0),
            fail_open: Cell::new(false),
            fail_connect: Cell::new(false),
            fail_send: Cell::new(false),
            send_limit: Cell::new(None),
        }
    }

    pub fn fail_open(&self, fail: bool) {
        self.fail_open.set(fail);
    }

    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.set(fail);
    }

    pub fn fail_send(&self, fail: bool) {
        self.fail_send.set(fail);
    }

    /// Accept at most `limit` bytes per send.
    pub fn limit_send(&self, limit: usize) {
        self.send_limit.set(Some(limit));
    }

    /// Number of calls made into the stack.
    pub fn touches(&self) -> u32 {
        self.touches.get()
    }

    /// Sockets opened and not yet closed.
    pub fn open_sockets(&self) -> usize {
        self.open.borrow().len()
    }

    pub fn connected_to(&self) -> Vec<SocketAddrV4> {
        self.connected_to.borrow().clone()
    }

    /// Every successful send, in order.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.borrow().clone()
    }

    fn touch(&self) {
        self.touches.set(self.touches.get() + 1);
    }
}

impl NetStack for &FakeNet {
    type Socket = u32;
    type Error = &'static str;

    fn open(&mut self) -> Result<u32, Self::Error> {
        self.touch();
        if self.fail_open.get() {
            return Err("no free sockets");
        }
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.open.borrow_mut().push(id);
        Ok(id)
    }

    fn connect(&mut self, _socket: &mut u32, remote: SocketAddrV4) -> Result<(), Self::Error> {
        self.touch();
        if self.fail_connect.get() {
            return Err("connection refused");
        }
        self.connected_to.borrow_mut().push(remote);
        Ok(())
    }

    fn send(&mut self, _socket: &mut u32, data: &[u8]) -> Result<usize, Self::Error> {
        self.touch();
        if self.fail_send.get() {
            return Err("connection reset");
        }
        let accepted = match self.send_limit.get() {
            Some(limit) => data.len().min(limit),
            None => data.len(),
        };
        self.sent.borrow_mut().push(data[..accepted].to_vec());
        Ok(accepted)
    }

    fn close(&mut self, socket: u32) {
        self.touch();
        self.open.borrow_mut().retain(|&id| id != socket);
    }
}
