//! SniffNet: ESP-IDF std firmware
//!
//! Thin platform layer over the `sniffnet` engine. The promiscuous callback
//! and the channel sweep thread share state with the duty cycle through
//! statics, since the WiFi driver callback carries no user context. The
//! duty cycle itself runs on the main thread.

use std::ffi::c_void;
use std::io::Write;
use std::net::{Shutdown, SocketAddr, SocketAddrV4, TcpStream};
use std::thread;
use std::time::Duration;

use sniffnet::buffer::SharedLog;
use sniffnet::comm::{NetStack, TransportClient};
use sniffnet::config::{DutyCycleConfig, TransportConfig};
use sniffnet::defaults::{self, LOG_CAPACITY};
use sniffnet::protocol::{self, Framing, VERSION};
use sniffnet::radio::{ChannelTuner, Clock, Credentials, Radio, RadioMode};
use sniffnet::scanner::FrameCapture;
use sniffnet::sweep::{ChannelSweep, CurrentChannel, SweepControl};
use sniffnet::DutyCycle;

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sys::{
    esp, esp_timer_get_time, esp_wifi_set_channel, esp_wifi_set_mode, esp_wifi_set_promiscuous,
    esp_wifi_set_promiscuous_filter, esp_wifi_set_promiscuous_rx_cb, esp_wifi_set_ps,
    wifi_mode_t_WIFI_MODE_NULL, wifi_mode_t_WIFI_MODE_STA, wifi_promiscuous_filter_t,
    wifi_promiscuous_pkt_t, wifi_promiscuous_pkt_type_t, wifi_ps_type_t_WIFI_PS_MIN_MODEM,
    wifi_ps_type_t_WIFI_PS_NONE, wifi_second_chan_t_WIFI_SECOND_CHAN_NONE, EspError,
    WIFI_PROMIS_FILTER_MASK_ALL,
};
use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const MIN_WRITE_TIMEOUT: Duration = Duration::from_millis(100);

// ── Shared state ─────────────────────────────────────────────────────

static CURRENT_CHANNEL: CurrentChannel = CurrentChannel::new();
static CAPTURE_LOG: SharedLog<LOG_CAPACITY> = SharedLog::new();
static CAPTURE: FrameCapture<'static, UptimeClock, LOG_CAPACITY> =
    FrameCapture::new(&CAPTURE_LOG, &CURRENT_CHANNEL, UptimeClock);
static SWEEP: SweepControl = SweepControl::new();

/// Milliseconds since boot from the high-resolution ESP timer.
struct UptimeClock;

impl Clock for UptimeClock {
    fn now_ms(&self) -> u32 {
        let us = unsafe { esp_timer_get_time() };
        ((us / 1000) & 0xFFFF_FFFF) as u32
    }
}

// ── WiFi promiscuous callback ────────────────────────────────────────

/// Runs in the WiFi driver task. Never blocks: the log append is a short
/// critical section and a full log just drops the frame.
unsafe extern "C" fn promisc_rx_cb(buf: *mut c_void, _pkt_type: wifi_promiscuous_pkt_type_t) {
    if buf.is_null() {
        CAPTURE.on_frame(None, 0);
        return;
    }

    let pkt = unsafe { &*(buf as *const wifi_promiscuous_pkt_t) };
    let rssi = pkt.rx_ctrl.rssi() as i8;
    let sig_len = pkt.rx_ctrl.sig_len() as usize;

    let frame = if sig_len == 0 {
        None
    } else {
        // Safety: the driver guarantees `sig_len` bytes at pkt.payload
        Some(unsafe { std::slice::from_raw_parts(pkt.payload.as_ptr(), sig_len) })
    };
    CAPTURE.on_frame(frame, rssi);
}

// ── Platform capabilities ────────────────────────────────────────────

struct IdfRadio {
    wifi: EspWifi<'static>,
}

impl Radio for IdfRadio {
    type Error = anyhow::Error;

    fn set_mode(&mut self, mode: RadioMode) -> Result<(), Self::Error> {
        let raw = match mode {
            RadioMode::ListenOnly => wifi_mode_t_WIFI_MODE_NULL,
            RadioMode::Station => wifi_mode_t_WIFI_MODE_STA,
        };
        esp!(unsafe { esp_wifi_set_mode(raw) })?;
        Ok(())
    }

    fn set_power_save(&mut self, enabled: bool) -> Result<(), Self::Error> {
        let ps = if enabled {
            wifi_ps_type_t_WIFI_PS_MIN_MODEM
        } else {
            wifi_ps_type_t_WIFI_PS_NONE
        };
        esp!(unsafe { esp_wifi_set_ps(ps) })?;
        Ok(())
    }

    fn set_promiscuous(&mut self, enabled: bool) -> Result<(), Self::Error> {
        unsafe {
            if enabled {
                let filter = wifi_promiscuous_filter_t {
                    filter_mask: WIFI_PROMIS_FILTER_MASK_ALL,
                };
                esp!(esp_wifi_set_promiscuous_filter(&filter))?;
                esp!(esp_wifi_set_promiscuous_rx_cb(Some(promisc_rx_cb)))?;
            }
            esp!(esp_wifi_set_promiscuous(enabled))?;
        }
        Ok(())
    }

    fn connect_station(&mut self, credentials: &Credentials) -> Result<(), Self::Error> {
        let client = ClientConfiguration {
            ssid: credentials
                .ssid
                .try_into()
                .map_err(|_| anyhow::anyhow!("SSID too long"))?,
            password: credentials
                .password
                .try_into()
                .map_err(|_| anyhow::anyhow!("password too long"))?,
            auth_method: AuthMethod::WPA2Personal,
            ..Default::default()
        };
        self.wifi.set_configuration(&Configuration::Client(client))?;
        self.wifi.connect()?;
        Ok(())
    }

    fn is_associated(&mut self) -> bool {
        // Associated and the station netif has its DHCP lease
        self.wifi.is_up().unwrap_or(false)
    }

    fn disconnect_station(&mut self) -> Result<(), Self::Error> {
        self.wifi.disconnect()?;
        Ok(())
    }
}

struct IdfTuner;

impl ChannelTuner for IdfTuner {
    type Error = EspError;

    fn set_channel(&mut self, channel: u8) -> Result<(), Self::Error> {
        esp!(unsafe { esp_wifi_set_channel(channel, wifi_second_chan_t_WIFI_SECOND_CHAN_NONE) })
    }
}

/// lwIP sockets through `std::net`. The stream is created by the connect
/// handshake, so an opened socket starts out empty.
struct StdNet {
    /// Bound on a single blocking send to a collector that stopped reading
    write_timeout: Duration,
}

impl StdNet {
    /// Fit the worst case (association timeout, connect timeout, then the
    /// count and body sends) inside one TRANSMIT window.
    fn for_window(transmit_ms: u32, association_timeout_ms: u32) -> Self {
        let budget = Duration::from_millis(transmit_ms.saturating_sub(association_timeout_ms) as u64)
            .saturating_sub(CONNECT_TIMEOUT);
        Self {
            write_timeout: (budget / 2).max(MIN_WRITE_TIMEOUT),
        }
    }
}

impl NetStack for StdNet {
    type Socket = Option<TcpStream>;
    type Error = std::io::Error;

    fn open(&mut self) -> Result<Self::Socket, Self::Error> {
        Ok(None)
    }

    fn connect(&mut self, socket: &mut Self::Socket, remote: SocketAddrV4) -> Result<(), Self::Error> {
        let stream = TcpStream::connect_timeout(&SocketAddr::V4(remote), CONNECT_TIMEOUT)?;
        stream.set_nodelay(true)?;
        stream.set_write_timeout(Some(self.write_timeout))?;
        *socket = Some(stream);
        Ok(())
    }

    fn send(&mut self, socket: &mut Self::Socket, data: &[u8]) -> Result<usize, Self::Error> {
        let stream = socket
            .as_mut()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotConnected))?;
        stream.write(data)
    }

    fn close(&mut self, socket: Self::Socket) {
        if let Some(stream) = socket {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

// ── Entry point ──────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    // Bind the ESP-IDF logger to the `log` facade
    esp_idf_svc::log::EspLogger::initialize_default();

    let framing = if cfg!(feature = "json") {
        Framing::Json
    } else {
        Framing::Binary
    };
    let duty_config = DutyCycleConfig {
        framing,
        ..DutyCycleConfig::new()
    };
    let transport_config = TransportConfig::new();

    log::info!("SniffNet v{} starting (std)", VERSION);
    log::info!(
        "Cycle: sniff {} ms, transmit {} ms, {} framing, log capacity {}",
        duty_config.sniff_ms,
        duty_config.transmit_ms,
        framing.as_str(),
        LOG_CAPACITY
    );
    log::info!(
        "Collector {} via '{}'",
        transport_config.remote,
        transport_config.credentials.ssid
    );

    // ── Peripherals ──────────────────────────────────────────────────

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let mut wifi = EspWifi::new(peripherals.modem, sys_loop, Some(nvs))?;
    wifi.set_configuration(&Configuration::Client(Default::default()))?;
    wifi.start()?;
    log::info!("WiFi driver started");

    // ── Channel sweep thread ─────────────────────────────────────────

    thread::Builder::new()
        .name("chanhop".into())
        .stack_size(3072)
        .spawn(move || {
            let mut sweep = ChannelSweep::new(IdfTuner, &CURRENT_CHANNEL, &SWEEP, defaults::DWELL_MS);
            sweep.run(&mut FreeRtos);
        })?;
    log::info!("Channel sweep thread spawned");

    // ── Duty cycle (main thread) ─────────────────────────────────────

    let payload: &'static mut [u8] =
        Box::leak(vec![0u8; protocol::payload_capacity(framing, LOG_CAPACITY)].into_boxed_slice());
    let net = StdNet::for_window(duty_config.transmit_ms, transport_config.association_timeout_ms);
    log::info!("Collector send timeout {} ms", net.write_timeout.as_millis());
    let client = TransportClient::new(net, transport_config);
    let mut duty = DutyCycle::new(
        duty_config,
        IdfRadio { wifi },
        client,
        FreeRtos,
        &CAPTURE,
        &SWEEP,
        payload,
    );
    duty.run()
}
