//! LeafMon firmware entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │   TwaiAdapter (CanPort)   SystemClock   TaskDelay            │
//! │   LogDisplay / LogRowSink / LogUplink (consumer ports)       │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ──────────────────      │
//! │                                                              │
//! │  core 0: can-rx ─▶ ingress ─▶ router ─▶ commands ─▶ dispatch │
//! │                                  │                           │
//! │  core 1:          display ◀──────┼──────▶ logger, uplink     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use log::{error, info};

use leafmon::adapters::log_sink::{LogDisplay, LogRowSink, LogUplink};
use leafmon::adapters::time::{SystemClock, TaskDelay};
use leafmon::adapters::twai::TwaiAdapter;
use leafmon::app::display::DisplayModel;
use leafmon::app::logger::LoggerModel;
use leafmon::app::uplink::UplinkModel;
use leafmon::bus::EventBus;
use leafmon::bus::router::Router;
use leafmon::bus::subscriptions::SubscriptionTable;
use leafmon::can::command::CommandDispatcher;
use leafmon::can::decoder::FrameDecoder;
use leafmon::config::SystemConfig;
use leafmon::drivers::task_pin::{Core, TaskSpec, spawn_on_core};
use leafmon::error::{DriverError, Error};
use leafmon::events::NetworkStatus;
use leafmon::tasks;

static BUS: EventBus = EventBus::new();

// ── Task table ────────────────────────────────────────────────

const CAN_RX: TaskSpec = TaskSpec { name: "can-rx\0", core: Core::Pro, priority: 10, stack_kb: 8 };
const ROUTER: TaskSpec = TaskSpec { name: "router\0", core: Core::Pro, priority: 9, stack_kb: 6 };
const DISPATCH: TaskSpec = TaskSpec { name: "can-tx\0", core: Core::Pro, priority: 8, stack_kb: 6 };
const DISPLAY: TaskSpec = TaskSpec { name: "display\0", core: Core::App, priority: 5, stack_kb: 8 };
const LOGGER: TaskSpec = TaskSpec { name: "logger\0", core: Core::App, priority: 4, stack_kb: 8 };
const UPLINK: TaskSpec = TaskSpec { name: "uplink\0", core: Core::App, priority: 3, stack_kb: 10 };

const DISPLAY_POLL: Duration = Duration::from_millis(10);
const LOGGER_POLL: Duration = Duration::from_millis(100);
const UPLINK_POLL: Duration = Duration::from_millis(100);

/// Log the failure and reboot once the console has drained.
fn restart(reason: &Error) -> ! {
    error!("{reason}; restarting in 1 s");
    FreeRtos::delay_ms(1000);
    esp_idf_hal::reset::restart()
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  LeafMon v{}                         ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = SystemConfig::default();
    config.validate().map_err(Error::from)?;
    let table = SubscriptionTable::standard();
    table.validate().map_err(Error::from)?;
    info!(
        "config: {:?} decode table, {} command repeats every {} ms",
        config.table_revision, config.command_repeat.count, config.command_repeat.interval_ms
    );

    // ── 3. CAN controller (fatal on failure) ──────────────────
    let peripherals = esp_idf_hal::peripherals::Peripherals::take()?;
    let can = match TwaiAdapter::start(peripherals.can, &config) {
        Ok(c) => Arc::new(c),
        Err(e) => restart(&e.into()),
    };

    // ── 4. Bus-side tasks (core 0) ────────────────────────────
    let rx = {
        let can = Arc::clone(&can);
        let decoder = FrameDecoder::new(&config);
        spawn_on_core(CAN_RX, move || {
            tasks::run_reception(&*can, decoder, &BUS, &SystemClock::new(), TaskDelay)
        })?
    };

    spawn_on_core(ROUTER, move || tasks::run_router(Router::new(&BUS, table)))?;

    {
        let dispatcher =
            CommandDispatcher::new(Arc::clone(&can), TaskDelay, config.command_repeat, BUS.trace_signal());
        spawn_on_core(DISPATCH, move || tasks::run_dispatcher(dispatcher, &BUS))?;
    }

    // ── 5. Consumers (core 1) ─────────────────────────────────
    {
        let display = DisplayModel::new(LogDisplay::new(25), &config);
        spawn_on_core(DISPLAY, move || {
            tasks::run_consumer(display, &BUS, &SystemClock::new(), DISPLAY_POLL)
        })?;
    }
    {
        let logger = LoggerModel::new(LogRowSink::new(), &config);
        spawn_on_core(LOGGER, move || {
            tasks::run_consumer(logger, &BUS, &SystemClock::new(), LOGGER_POLL)
        })?;
    }
    {
        let mut uplink = UplinkModel::new(LogUplink::new(), &config);
        // The console transport has no session to establish.
        uplink.set_link(NetworkStatus::ConnectedUplink, &BUS);
        spawn_on_core(UPLINK, move || {
            tasks::run_consumer(uplink, &BUS, &SystemClock::new(), UPLINK_POLL)
        })?;
    }

    info!("all tasks running");

    // Reception never returns; if it unwinds the device restarts.
    if rx.join().is_err() {
        restart(&Error::Driver(DriverError::ReceiveFailed));
    }
    Ok(())
}
