//! Multimeter firmware entry point.
//!
//! Hexagonal architecture with a single semaphore-gated event loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter          GattProfile    LinkTransport         │
//! │  (Adc+FrontEnd+Timer)     (Profile)      (Transport)           │
//! │  LogEventSink (EventSink)                                      │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppCore (pure logic)                      │    │
//! │  │  Acquisition · ModeController · ResponseRetryBuffer    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Mailbox (semaphore · event mask · stack/app queues)           │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::info;

use multimeter::adapters::advertising;
use multimeter::adapters::hardware::HardwareAdapter;
use multimeter::adapters::log_sink::LogEventSink;
use multimeter::adapters::profile::GattProfile;
use multimeter::adapters::transport::{LinkState, LinkTransport};
use multimeter::app::event_loop::EventLoop;
use multimeter::config::MeterConfig;
use multimeter::drivers::adc::AdcDriver;
use multimeter::drivers::front_end::FrontEndSwitch;
use multimeter::drivers::hw_timer::SampleTimer;
use multimeter::events::Mailbox;

// ── Shared state reached from stack / timer context ───────────

static MAILBOX: Mailbox = Mailbox::new();
static LINK: LinkState = LinkState::new();
static PROFILE: GattProfile<'static> = GattProfile::new(&MAILBOX);

// ── Main ──────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn main() -> Result<()> {
    use esp_idf_hal::gpio::PinDriver;
    use esp_idf_hal::peripherals::Peripherals;
    use log::error;
    use multimeter::error::HardwareError;

    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    banner();

    // ── 2. Configuration (compiled-in defaults) ───────────────
    let config = MeterConfig::default();
    config.validate()?;
    log_advertising(&config)?;

    // ── 3. Peripherals ────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let line_a = PinDriver::output(peripherals.pins.gpio21)
        .map_err(|_| HardwareError::GpioInitFailed)?;
    let line_b = PinDriver::output(peripherals.pins.gpio38)
        .map_err(|_| HardwareError::GpioInitFailed)?;
    let timer = match SampleTimer::new(&MAILBOX) {
        Ok(t) => t,
        Err(e) => {
            error!("sample timer init failed: {}, halting", e);
            #[allow(clippy::empty_loop)]
            loop {}
        }
    };
    let hw = HardwareAdapter::new(AdcDriver::new(), FrontEndSwitch::new(line_a, line_b), timer);

    // ── 4. Event loop ─────────────────────────────────────────
    let mut event_loop: EventLoop<_, _, _, _> = EventLoop::new(
        &MAILBOX,
        &config,
        hw,
        &PROFILE,
        LinkTransport::new(&LINK),
        LogEventSink::new(),
    );
    event_loop.start();
    info!("System ready. Entering event loop.");

    match event_loop.run() {
        Ok(never) => match never {},
        Err(e) => {
            error!("fatal: {}, halting", e);
            #[allow(clippy::empty_loop)]
            loop {}
        }
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() -> Result<()> {
    use anyhow::Context;
    use multimeter::drivers::front_end::SimPin;

    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_millis()
        .init();
    banner();

    // ── Configuration: defaults or a JSON override file ───────
    let config = match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read(&path).with_context(|| format!("reading {path}"))?;
            let cfg = MeterConfig::from_json(&raw).with_context(|| format!("parsing {path}"))?;
            info!("Config loaded from {}", path);
            cfg
        }
        None => MeterConfig::default(),
    };
    log_advertising(&config)?;

    let timer = SampleTimer::new(&MAILBOX)?;
    let hw = HardwareAdapter::new(
        AdcDriver::new(),
        FrontEndSwitch::new(SimPin::default(), SimPin::default()),
        timer,
    );
    let mut event_loop: EventLoop<_, _, _, _> = EventLoop::new(
        &MAILBOX,
        &config,
        hw,
        &PROFILE,
        LinkTransport::new(&LINK),
        LogEventSink::new(),
    );
    event_loop.start();

    let _central = std::thread::Builder::new()
        .name("sim-central".into())
        .spawn(sim::central_session)?;

    info!("Simulator ready. Entering event loop.");
    match event_loop.run() {
        Ok(never) => match never {},
        Err(e) => Err(e.into()),
    }
}

fn banner() {
    info!("╔══════════════════════════════════════╗");
    info!("║  Multimeter v{}                   ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");
}

fn log_advertising(config: &MeterConfig) -> Result<()> {
    let adv = advertising::advertising_data()?;
    let scan_rsp = advertising::scan_response_data(&config.advertising)?;
    info!(
        "Advertising as '{}' ({} + {} bytes, interval {} x 0.625 ms)",
        config.advertising.device_name,
        adv.len(),
        scan_rsp.len(),
        config.advertising.advertising_interval
    );
    Ok(())
}

// ── Host simulation: a scripted central ───────────────────────
//
// Plays the part of the BLE stack and a connected phone: reports role
// state changes, writes the mode characteristic, and forces one ATT
// response through the retry path.

#[cfg(not(target_os = "espidf"))]
mod sim {
    use std::thread::sleep;
    use std::time::Duration;

    use log::warn;

    use multimeter::app::messages::{
        AppMessage, AttResponse, BdAddr, GapRoleState, GattEvent, ParamId, StackMessage,
        ATT_MAX_PAYLOAD,
    };
    use multimeter::drivers::adc::sim_set_microvolts;
    use multimeter::events::EventFlag;

    use super::{LINK, MAILBOX, PROFILE};

    const OWN_ADDRESS: BdAddr = BdAddr([0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
    const PEER_ADDRESS: BdAddr = BdAddr([0xA1, 0xB2, 0xC3, 0xD4, 0xE5, 0xF6]);
    const CONN: u16 = 0;

    fn role(state: GapRoleState) {
        if MAILBOX.post_app(AppMessage::StateChange(state)).is_err() {
            warn!("sim: app queue full, dropped {:?}", state);
        }
    }

    fn stack(msg: StackMessage) {
        if let Err(msg) = MAILBOX.post_stack(msg) {
            warn!("sim: stack queue full, dropped {:?}", msg);
        }
    }

    fn write_mode(raw: u8) {
        if let Err(e) = PROFILE.on_peer_write(ParamId::Mode, &[raw]) {
            warn!("sim: mode write refused: {}", e);
        }
    }

    pub fn central_session() {
        role(GapRoleState::Started {
            address: OWN_ADDRESS,
        });
        role(GapRoleState::Advertising);
        sleep(Duration::from_millis(500));

        LINK.connect(CONN, 0);
        role(GapRoleState::Connected { peer: PEER_ADDRESS });
        stack(StackMessage::Gatt(GattEvent::MtuUpdated { mtu: 23 }));

        sim_set_microvolts(1_250_000);
        write_mode(1);
        sleep(Duration::from_millis(3_500));

        sim_set_microvolts(300_000);
        write_mode(2);
        sleep(Duration::from_millis(2_500));

        // A read response the controller had no buffer for.
        let mut payload: heapless::Vec<u8, ATT_MAX_PAYLOAD> = heapless::Vec::new();
        let _ = payload.extend_from_slice(&PROFILE.measurement());
        stack(StackMessage::Gatt(GattEvent::ResponsePending(AttResponse {
            conn: CONN,
            opcode: 0x0B,
            payload,
        })));
        for _ in 0..3 {
            sleep(Duration::from_millis(100));
            MAILBOX.raise(EventFlag::ConnectionEventEnd);
        }
        LINK.release_credits(4);
        sleep(Duration::from_millis(100));
        MAILBOX.raise(EventFlag::ConnectionEventEnd);

        sim_set_microvolts(3_200_000);
        write_mode(3);
        sleep(Duration::from_millis(2_500));

        LINK.disconnect();
        role(GapRoleState::Waiting);
        role(GapRoleState::Advertising);
    }
}
