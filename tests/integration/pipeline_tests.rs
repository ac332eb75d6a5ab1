//! Reception → router → consumers, end to end on the simulated bus.

use leafmon::adapters::twai::TwaiAdapter;
use leafmon::app::display::DisplayModel;
use leafmon::app::logger::{CSV_HEADER, LoggerModel};
use leafmon::app::uplink::UplinkModel;
use leafmon::app::ports::ClockPort;
use leafmon::app::{self, Consumer};
use leafmon::bus::router::Router;
use leafmon::bus::subscriptions::SubscriptionTable;
use leafmon::bus::{CONSUMER_DEPTH, ConsumerId, EventBus};
use leafmon::can::decoder::FrameDecoder;
use leafmon::config::SystemConfig;
use leafmon::diagnostics::FrameTrace;
use leafmon::events::{CarStatus, NetworkStatus, TelemetryEvent};
use leafmon::tasks::reception_step;

use crate::mock_hw::{
    ManualClock, MemoryCard, RecordingBroker, RecordingScreen, TallyDelay, frame,
};

// ── Fixtures ──────────────────────────────────────────────────

/// Default configuration with smoothing disabled so values pass straight
/// through.
fn unsmoothed() -> SystemConfig {
    let mut c = SystemConfig::default();
    c.smoothing.display = 0.0;
    c.smoothing.logger = 0.0;
    c.smoothing.uplink = 0.0;
    c
}

/// 160.5 A at 200 V.
fn power_frame() -> leafmon::can::RawFrame {
    frame(0x1DB, &[0x28, 0x20, 0x64, 0x00])
}

/// Motor speed of `rpm` in the 15-bit field at byte 4.
fn speed_frame(rpm: i16) -> leafmon::can::RawFrame {
    let raw = ((rpm as u16) & 0x7FFF) << 1;
    let [hi, lo] = raw.to_be_bytes();
    frame(0x1DA, &[0, 0, 0, 0, hi, lo, 0, 0])
}

struct Rig {
    can: TwaiAdapter,
    decoder: FrameDecoder,
    clock: ManualClock,
    delay: TallyDelay,
    trace: FrameTrace,
    trace_out: Vec<u8>,
}

impl Rig {
    fn new(config: &SystemConfig) -> Self {
        Self {
            can: TwaiAdapter::start(config).unwrap(),
            decoder: FrameDecoder::new(config),
            clock: ManualClock::default(),
            delay: TallyDelay::default(),
            trace: FrameTrace::new(),
            trace_out: Vec::new(),
        }
    }

    fn receive(&mut self, bus: &EventBus) -> usize {
        reception_step(
            &self.can,
            &mut self.decoder,
            bus,
            &self.clock,
            &mut self.delay,
            &mut self.trace,
            &mut self.trace_out,
        )
    }
}

// ── Fan-out ───────────────────────────────────────────────────

#[test]
fn power_frame_reaches_every_consumer() {
    let config = unsmoothed();
    let bus = EventBus::new();
    let mut rig = Rig::new(&config);
    let mut router = Router::new(&bus, SubscriptionTable::standard());

    let mut display = DisplayModel::new(RecordingScreen::default(), &config);
    let mut logger = LoggerModel::new(MemoryCard::default(), &config);
    let mut uplink = UplinkModel::new(RecordingBroker::default(), &config);

    rig.can.inject(power_frame());
    // Power plus the first car state evaluation.
    assert_eq!(rig.receive(&bus), 2);
    assert_eq!(router.route_pending(), 2);

    rig.clock.set(1000);
    assert_eq!(app::service(&mut display, &bus, rig.clock.now_ms()), 1);
    assert_eq!(app::service(&mut logger, &bus, rig.clock.now_ms()), 2);
    assert_eq!(app::service(&mut uplink, &bus, rig.clock.now_ms()), 2);

    let shown = display.port().last().copied().unwrap();
    assert!((shown.power_kw - 32.1).abs() < 1e-3);
    assert!(shown.charging);

    let card = logger.storage();
    assert_eq!(card.header.as_deref(), Some(CSV_HEADER));
    assert_eq!(card.rows.len(), 1);
    assert_eq!(card.rows[0].split(',').nth(8), Some("32.10"));

    // Not connected yet: nothing published.
    assert!(uplink.transport().published.is_empty());
}

#[test]
fn logger_status_round_trips_to_display() {
    let config = unsmoothed();
    let bus = EventBus::new();
    let mut router = Router::new(&bus, SubscriptionTable::standard());
    let mut display = DisplayModel::new(RecordingScreen::default(), &config);
    let mut logger = LoggerModel::new(MemoryCard::default(), &config);

    logger.on_tick(1000, &bus);
    // WriteStarted then WriteEnded, both to the display only.
    assert_eq!(router.route_pending(), 2);
    assert_eq!(bus.try_next(ConsumerId::Logger), None);

    display.on_event(&bus.try_next(ConsumerId::Display).unwrap());
    assert!(display.frame().logging);
    display.on_event(&bus.try_next(ConsumerId::Display).unwrap());
    assert!(!display.frame().logging);
}

#[test]
fn uplink_publishes_snapshot_on_poll() {
    let config = unsmoothed();
    let bus = EventBus::new();
    let mut rig = Rig::new(&config);
    let mut router = Router::new(&bus, SubscriptionTable::standard());
    let mut display = DisplayModel::new(RecordingScreen::default(), &config);
    let mut uplink = UplinkModel::new(RecordingBroker::default(), &config);

    uplink.set_link(NetworkStatus::ConnectedUplink, &bus);
    rig.can.inject(power_frame());
    rig.can.inject(frame(0x5BC, &[0x3E, 0x80]));
    rig.receive(&bus);
    rig.receive(&bus);
    router.route_pending();

    app::service(&mut display, &bus, 0);
    assert_eq!(display.frame().network, NetworkStatus::ConnectedUplink);

    uplink.handle_control(b"poll\n", &bus);
    app::service(&mut uplink, &bus, 5);

    let broker = uplink.transport();
    assert_eq!(broker.value_of("leafmon/online"), Some("online"));
    assert_eq!(broker.value_of("leafmon/batteryKW"), Some("32.1"));
    // 250 gids.
    assert_eq!(broker.value_of("leafmon/batteryKWH"), Some("20.0"));
    assert_eq!(broker.value_of("leafmon/carStatus"), Some("off"));
    assert_eq!(broker.value_of("leafmon/acStatus"), Some("unknown"));
}

// ── Backpressure ──────────────────────────────────────────────

#[test]
fn stalled_display_does_not_starve_logger() {
    let config = unsmoothed();
    let bus = EventBus::new();
    let mut rig = Rig::new(&config);
    let mut router = Router::new(&bus, SubscriptionTable::standard());
    let mut logger = LoggerModel::new(MemoryCard::default(), &config);

    let extra = 5;
    for i in 0..(CONSUMER_DEPTH + extra) {
        rig.can.inject(speed_frame(100 * (i as i16 + 1)));
        rig.receive(&bus);
        router.route_pending();
        app::service(&mut logger, &bus, 0);
    }

    let stats = router.stats();
    assert_eq!(stats.dropped[ConsumerId::Display.index()], extra as u32);
    assert_eq!(stats.dropped[ConsumerId::Logger.index()], 0);
    assert_eq!(bus.queue(ConsumerId::Display).len(), CONSUMER_DEPTH);

    // Logger saw the newest sample.
    let last_kmh = 100.0 * (CONSUMER_DEPTH + extra) as f32 * 0.01212;
    let row = logger.row(0).unwrap();
    let logged: f32 = row.split(',').nth(1).unwrap().parse().unwrap();
    assert!((logged - last_kmh).abs() < 0.05);
}

#[test]
fn implausible_energy_never_reaches_consumers() {
    let config = unsmoothed();
    let bus = EventBus::new();
    let mut rig = Rig::new(&config);
    let mut router = Router::new(&bus, SubscriptionTable::standard());

    rig.can.inject(frame(0x5BC, &[0xFF, 0xC0]));
    // Only the car state evaluation.
    assert_eq!(rig.receive(&bus), 1);
    router.route_pending();
    assert_eq!(bus.try_next(ConsumerId::Display), None);
    assert_eq!(
        bus.try_next(ConsumerId::Logger),
        Some(TelemetryEvent::CarStatus(CarStatus::Off))
    );
}

// ── Car state ─────────────────────────────────────────────────

#[test]
fn car_turns_off_when_speed_frames_stop() {
    let config = unsmoothed();
    let bus = EventBus::new();
    let mut rig = Rig::new(&config);

    rig.can.inject(speed_frame(0));
    rig.receive(&bus);
    let first: Vec<_> = core::iter::from_fn(|| bus.ingress().try_receive().ok()).collect();
    assert_eq!(
        first,
        [
            TelemetryEvent::SpeedKmh(0.0),
            TelemetryEvent::CarStatus(CarStatus::On)
        ]
    );

    // Nothing due before the evaluation interval elapses.
    rig.clock.set(u64::from(config.car_state_interval_ms) - 1);
    assert_eq!(rig.receive(&bus), 0);

    rig.clock.set(u64::from(config.car_state_interval_ms));
    assert_eq!(rig.receive(&bus), 1);
    assert_eq!(
        bus.ingress().try_receive().ok(),
        Some(TelemetryEvent::CarStatus(CarStatus::Off))
    );
}

#[test]
fn uplink_interval_follows_car_state() {
    let config = unsmoothed();
    let bus = EventBus::new();
    let mut rig = Rig::new(&config);
    let mut router = Router::new(&bus, SubscriptionTable::standard());
    let mut uplink = UplinkModel::new(RecordingBroker::default(), &config);

    assert_eq!(
        uplink.publish_interval_ms(),
        u64::from(config.uplink_intervals.idle_ms)
    );

    rig.can.inject(speed_frame(1500));
    rig.receive(&bus);
    router.route_pending();
    app::service(&mut uplink, &bus, 0);

    assert_eq!(
        uplink.publish_interval_ms(),
        u64::from(config.uplink_intervals.car_on_ms)
    );
}
