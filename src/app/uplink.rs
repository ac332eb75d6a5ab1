//! Cellular uplink model.
//!
//! Publishes a snapshot of the vehicle over the [`UplinkTransport`] on a
//! cadence chosen by what the car is doing, turns remote control messages
//! into command events, and converts modem positioning output into
//! telemetry events for the rest of the system.
//!
//! | State          | Publish every |
//! |----------------|---------------|
//! | quick charging | 10 s          |
//! | charging       | 10 min        |
//! | car on         | 60 s          |
//! | otherwise      | 1 h           |

use core::fmt::Write as _;

use log::{debug, info, warn};

use super::Consumer;
use super::ports::UplinkTransport;
use crate::bus::{ConsumerId, EventBus};
use crate::config::{SystemConfig, UplinkIntervals};
use crate::control::smoothing::Smoothed;
use crate::events::{AcStatus, CarStatus, ChargerStatus, NetworkStatus, TelemetryEvent};

pub const KMH_PER_KNOT: f32 = 1.852;

/// Topic suffix announcing the session.
pub const ONLINE_TOPIC: &str = "online";

type Topic = heapless::String<64>;
/// Fits `{:.6}` of any finite `f32`.
type Value = heapless::String<48>;

// ── Remote control ────────────────────────────────────────────

/// A message received on the control topic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RemoteControl {
    /// Publish a snapshot now.
    Poll,
    /// Forward to the command dispatcher.
    Command(TelemetryEvent),
}

/// Parse a control payload.  Matching is by prefix; trailing bytes such as
/// a newline are ignored.
pub fn parse_control(payload: &[u8]) -> Option<RemoteControl> {
    if payload.starts_with(b"poll") {
        Some(RemoteControl::Poll)
    } else if payload.starts_with(b"start_ac") {
        Some(RemoteControl::Command(TelemetryEvent::AcRequest(
            AcStatus::StartRequested,
        )))
    } else if payload.starts_with(b"stop_ac") {
        Some(RemoteControl::Command(TelemetryEvent::AcRequest(
            AcStatus::StopRequested,
        )))
    } else if payload.starts_with(b"start_charge") {
        Some(RemoteControl::Command(TelemetryEvent::ChargeRequest(
            ChargerStatus::StartRequested,
        )))
    } else {
        None
    }
}

// ── Positioning ───────────────────────────────────────────────

/// One GNSS reading from the modem.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GnssFix {
    pub latitude: f32,
    pub longitude: f32,
    pub altitude_m: f32,
    pub speed_knots: f32,
}

impl GnssFix {
    pub fn events(&self) -> [TelemetryEvent; 4] {
        [
            TelemetryEvent::GnssLatitude(self.latitude),
            TelemetryEvent::GnssLongitude(self.longitude),
            TelemetryEvent::GnssSpeed(self.speed_knots * KMH_PER_KNOT),
            TelemetryEvent::GnssAltitude(self.altitude_m),
        ]
    }
}

/// Parse the modem network clock, `yy/MM/dd,hh:mm:ss±zz`.
///
/// Returns year, month, day, hours, minutes and seconds events in that
/// order.  The quarter-hour zone suffix is accepted and ignored.
pub fn parse_network_time(s: &str) -> Option<[TelemetryEvent; 6]> {
    let (date, time) = s.trim().split_once(',')?;
    let time = time.split(['+', '-']).next()?;

    let mut d = date.split('/').map(|p| p.parse::<i32>().ok());
    let mut t = time.split(':').map(|p| p.parse::<i32>().ok());

    let (year, month, day) = (d.next()??, d.next()??, d.next()??);
    let (hours, minutes, seconds) = (t.next()??, t.next()??, t.next()??);
    if d.next().is_some() || t.next().is_some() {
        return None;
    }
    if !(1..=12).contains(&month)
        || !(1..=31).contains(&day)
        || !(0..24).contains(&hours)
        || !(0..60).contains(&minutes)
        || !(0..61).contains(&seconds)
    {
        return None;
    }

    Some([
        TelemetryEvent::GsmYear(year),
        TelemetryEvent::GsmMonth(month),
        TelemetryEvent::GsmDay(day),
        TelemetryEvent::GsmHours(hours),
        TelemetryEvent::GsmMinutes(minutes),
        TelemetryEvent::GsmSeconds(seconds),
    ])
}

// ── Model ─────────────────────────────────────────────────────

pub struct UplinkModel<T: UplinkTransport> {
    transport: T,
    prefix: heapless::String<32>,
    intervals: UplinkIntervals,
    power: Smoothed,
    energy_kwh: f32,
    charger_max_amps: f32,
    latitude: f32,
    longitude: f32,
    gnss_speed: f32,
    ac: Option<AcStatus>,
    charger: Option<ChargerStatus>,
    car: Option<CarStatus>,
    link: NetworkStatus,
    poll_requested: bool,
    last_publish_ms: u64,
}

impl<T: UplinkTransport> UplinkModel<T> {
    pub fn new(transport: T, config: &SystemConfig) -> Self {
        Self {
            transport,
            prefix: config.uplink_topic_prefix.clone(),
            intervals: config.uplink_intervals,
            power: Smoothed::new(config.smoothing.uplink),
            energy_kwh: 0.0,
            charger_max_amps: 0.0,
            latitude: 0.0,
            longitude: 0.0,
            gnss_speed: 0.0,
            ac: None,
            charger: None,
            car: None,
            link: NetworkStatus::Disconnected,
            poll_requested: false,
            last_publish_ms: 0,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn link(&self) -> NetworkStatus {
        self.link
    }

    /// Current publish interval for the vehicle state.
    pub fn publish_interval_ms(&self) -> u64 {
        let i = &self.intervals;
        let ms = match (self.charger, self.car) {
            (Some(ChargerStatus::QuickCharging), _) => i.quick_charging_ms,
            (Some(ChargerStatus::Charging), _) => i.charging_ms,
            (_, Some(CarStatus::On)) => i.car_on_ms,
            _ => i.idle_ms,
        };
        u64::from(ms)
    }

    /// Record a link state change and announce it on the bus.
    pub fn set_link(&mut self, status: NetworkStatus, bus: &EventBus) {
        if status == self.link {
            return;
        }
        info!("uplink link {:?} -> {:?}", self.link, status);
        self.link = status;
        bus.publish(TelemetryEvent::NetworkStatus(status));

        if status == NetworkStatus::ConnectedUplink {
            self.send(ONLINE_TOPIC, "online");
        }
    }

    /// Handle a message on the control topic.
    pub fn handle_control(&mut self, payload: &[u8], bus: &EventBus) {
        match parse_control(payload) {
            Some(RemoteControl::Poll) => self.poll_requested = true,
            Some(RemoteControl::Command(event)) => {
                info!("remote request {event:?}");
                bus.publish(event);
            }
            None => debug!("unrecognised control payload ({} bytes)", payload.len()),
        }
    }

    /// Take in a GNSS reading and publish it as positioning events.
    pub fn handle_fix(&mut self, fix: &GnssFix, bus: &EventBus) {
        for event in fix.events() {
            self.absorb(&event);
            bus.publish(event);
        }
    }

    /// Publish the network clock, if the modem string parses.
    pub fn handle_network_time(&mut self, raw: &str, bus: &EventBus) {
        match parse_network_time(raw) {
            Some(events) => {
                for event in events {
                    bus.publish(event);
                }
            }
            None => debug!("unparseable network time {raw:?}"),
        }
    }

    fn absorb(&mut self, event: &TelemetryEvent) {
        match *event {
            TelemetryEvent::BatteryPowerKw(v) => {
                self.power.update(v);
            }
            TelemetryEvent::BatteryEnergyKwh(v) => self.energy_kwh = v,
            TelemetryEvent::ChargerMaxAmps(v) => self.charger_max_amps = v,
            TelemetryEvent::AcStatus(s) => self.ac = Some(s),
            TelemetryEvent::ChargerStatus(s) => self.charger = Some(s),
            TelemetryEvent::CarStatus(s) => self.car = Some(s),
            TelemetryEvent::GnssLatitude(v) => self.latitude = v,
            TelemetryEvent::GnssLongitude(v) => self.longitude = v,
            TelemetryEvent::GnssSpeed(v) => self.gnss_speed = v,
            _ => {}
        }
    }

    fn publish_snapshot(&mut self) {
        let floats = [
            ("lat", self.latitude, 6),
            ("lon", self.longitude, 6),
            ("speed", self.gnss_speed, 1),
            ("batteryKWH", self.energy_kwh, 1),
            ("batteryKW", self.power.value(), 1),
            ("chargerMaxAmps", self.charger_max_amps, 1),
        ];
        for (suffix, value, precision) in floats {
            let mut v = Value::new();
            if write!(v, "{value:.precision$}").is_err() {
                warn!("{suffix} value {value} does not fit, not published");
                continue;
            }
            self.send(suffix, &v);
        }

        let statuses = [
            ("acStatus", self.ac.map_or("unknown", AcStatus::as_str)),
            (
                "chargerStatus",
                self.charger.map_or("unknown", ChargerStatus::as_str),
            ),
            ("carStatus", self.car.map_or("unknown", CarStatus::as_str)),
        ];
        for (suffix, value) in statuses {
            self.send(suffix, value);
        }
    }

    fn send(&mut self, suffix: &str, payload: &str) {
        let mut topic = Topic::new();
        if topic.push_str(&self.prefix).is_err() || topic.push_str(suffix).is_err() {
            warn!("topic too long for {suffix}");
            return;
        }
        if let Err(e) = self.transport.publish(&topic, payload) {
            warn!("publish {topic}: {e}");
        }
    }
}

impl<T: UplinkTransport> Consumer for UplinkModel<T> {
    const ID: ConsumerId = ConsumerId::Uplink;

    fn on_event(&mut self, event: &TelemetryEvent) {
        self.absorb(event);
    }

    fn on_tick(&mut self, now_ms: u64, _bus: &EventBus) {
        if self.link != NetworkStatus::ConnectedUplink {
            return;
        }
        let due = now_ms.saturating_sub(self.last_publish_ms) >= self.publish_interval_ms();
        if due || self.poll_requested {
            self.last_publish_ms = now_ms;
            self.poll_requested = false;
            self.publish_snapshot();
        }
    }
}
