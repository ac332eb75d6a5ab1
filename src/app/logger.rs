//! Trip logger model.
//!
//! Once per interval a CSV row with smoothed speed and power, the latest
//! energy and both position sources is appended to [`RowStorage`].  Each
//! write is bracketed by `LoggerStatus` events so the display can show
//! card activity.

use core::fmt::Write as _;

use log::warn;

use super::Consumer;
use super::ports::RowStorage;
use crate::bus::{ConsumerId, EventBus};
use crate::config::SystemConfig;
use crate::control::smoothing::Smoothed;
use crate::events::{LoggerStatus, TelemetryEvent};

pub const CSV_HEADER: &str = "time_ms,speed,gnss_speed,lat,lon,alt,net_lat,net_lon,power,energy";

/// Longest row: a 20-digit timestamp, nine separators and nine floats at
/// `f32` extremes (up to 47 characters each at six decimals).
pub const ROW_CAP: usize = 448;

pub type Row = heapless::String<ROW_CAP>;

pub struct LoggerModel<S: RowStorage> {
    storage: S,
    speed: Smoothed,
    power: Smoothed,
    energy_kwh: f32,
    gnss_speed: f32,
    latitude: f32,
    longitude: f32,
    altitude: f32,
    network_latitude: f32,
    network_longitude: f32,
    interval_ms: u64,
    last_row_ms: u64,
    rows_written: u32,
}

impl<S: RowStorage> LoggerModel<S> {
    pub fn new(storage: S, config: &SystemConfig) -> Self {
        let alpha = config.smoothing.logger;
        Self {
            storage,
            speed: Smoothed::new(alpha),
            power: Smoothed::new(alpha),
            energy_kwh: 0.0,
            gnss_speed: 0.0,
            latitude: 0.0,
            longitude: 0.0,
            altitude: 0.0,
            network_latitude: 0.0,
            network_longitude: 0.0,
            interval_ms: u64::from(config.logger_interval_ms),
            last_row_ms: 0,
            rows_written: 0,
        }
    }

    /// The row that would be written at `now_ms`, or `None` if it does not
    /// fit [`ROW_CAP`].
    pub fn row(&self, now_ms: u64) -> Option<Row> {
        let mut row = Row::new();
        write!(
            row,
            "{},{:.1},{:.1},{:.6},{:.6},{:.1},{:.6},{:.6},{:.2},{:.2}",
            now_ms,
            self.speed.value(),
            self.gnss_speed,
            self.latitude,
            self.longitude,
            self.altitude,
            self.network_latitude,
            self.network_longitude,
            self.power.value(),
            self.energy_kwh,
        )
        .ok()?;
        Some(row)
    }

    pub fn rows_written(&self) -> u32 {
        self.rows_written
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

impl<S: RowStorage> Consumer for LoggerModel<S> {
    const ID: ConsumerId = ConsumerId::Logger;

    fn on_event(&mut self, event: &TelemetryEvent) {
        match *event {
            TelemetryEvent::SpeedKmh(v) => {
                self.speed.update(v);
            }
            TelemetryEvent::BatteryPowerKw(v) => {
                self.power.update(v);
            }
            TelemetryEvent::BatteryEnergyKwh(v) => self.energy_kwh = v,
            TelemetryEvent::GnssSpeed(v) => self.gnss_speed = v,
            TelemetryEvent::GnssLatitude(v) => self.latitude = v,
            TelemetryEvent::GnssLongitude(v) => self.longitude = v,
            TelemetryEvent::GnssAltitude(v) => self.altitude = v,
            TelemetryEvent::NetworkLatitude(v) => self.network_latitude = v,
            TelemetryEvent::NetworkLongitude(v) => self.network_longitude = v,
            _ => {}
        }
    }

    fn on_tick(&mut self, now_ms: u64, bus: &EventBus) {
        if now_ms.saturating_sub(self.last_row_ms) < self.interval_ms {
            return;
        }
        self.last_row_ms = now_ms;

        let Some(row) = self.row(now_ms) else {
            warn!("trip log row at {now_ms} ms exceeds {ROW_CAP} bytes, skipped");
            return;
        };
        if let Err(e) = self.storage.begin() {
            warn!("trip log unavailable: {e}");
            return;
        }

        bus.publish(TelemetryEvent::LoggerStatus(LoggerStatus::WriteStarted));
        match self.storage.append_row(CSV_HEADER, &row) {
            Ok(()) => self.rows_written = self.rows_written.wrapping_add(1),
            Err(e) => warn!("trip log row not written: {e}"),
        }
        bus.publish(TelemetryEvent::LoggerStatus(LoggerStatus::WriteEnded));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::StorageError;

    #[derive(Default)]
    struct Card {
        header: Option<String>,
        rows: Vec<String>,
        absent: bool,
        fail_append: bool,
    }

    impl RowStorage for Card {
        fn begin(&mut self) -> Result<(), StorageError> {
            if self.absent {
                return Err(StorageError::Unavailable);
            }
            Ok(())
        }

        fn append_row(&mut self, header: &str, row: &str) -> Result<(), StorageError> {
            if self.fail_append {
                return Err(StorageError::Unavailable);
            }
            self.header.get_or_insert_with(|| header.to_owned());
            self.rows.push(row.to_owned());
            Ok(())
        }
    }

    fn raw_config() -> SystemConfig {
        let mut c = SystemConfig::default();
        c.smoothing.logger = 0.0;
        c
    }

    #[test]
    fn row_format_and_precision() {
        let mut m = LoggerModel::new(Card::default(), &raw_config());
        for e in [
            TelemetryEvent::SpeedKmh(48.26),
            TelemetryEvent::GnssSpeed(47.9),
            TelemetryEvent::GnssLatitude(52.520_008),
            TelemetryEvent::GnssLongitude(13.404_954),
            TelemetryEvent::GnssAltitude(34.0),
            TelemetryEvent::BatteryPowerKw(-7.125),
            TelemetryEvent::BatteryEnergyKwh(18.4),
        ] {
            m.on_event(&e);
        }
        let row = m.row(1234).unwrap();
        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(fields.len(), CSV_HEADER.split(',').count());
        assert_eq!(fields[0], "1234");
        assert_eq!(fields[1], "48.3");
        assert_eq!(fields[2], "47.9");
        assert!(fields[3].starts_with("52.5200"));
        assert_eq!(fields[3].split('.').nth(1).map(str::len), Some(6));
        assert_eq!(fields[5], "34.0");
        assert_eq!(fields[6], "0.000000");
        assert_eq!(fields[9], "18.40");
    }

    #[test]
    fn writes_once_per_interval_with_status_events() {
        let bus = EventBus::new();
        let mut m = LoggerModel::new(Card::default(), &raw_config());

        m.on_tick(500, &bus);
        assert_eq!(m.rows_written(), 0);
        m.on_tick(1000, &bus);
        m.on_tick(1500, &bus);
        m.on_tick(2000, &bus);
        assert_eq!(m.rows_written(), 2);
        assert_eq!(m.storage().header.as_deref(), Some(CSV_HEADER));

        let statuses: Vec<_> = core::iter::from_fn(|| bus.ingress().try_receive().ok()).collect();
        assert_eq!(
            statuses,
            [
                TelemetryEvent::LoggerStatus(LoggerStatus::WriteStarted),
                TelemetryEvent::LoggerStatus(LoggerStatus::WriteEnded),
                TelemetryEvent::LoggerStatus(LoggerStatus::WriteStarted),
                TelemetryEvent::LoggerStatus(LoggerStatus::WriteEnded),
            ]
        );
    }

    #[test]
    fn failed_append_still_ends_write() {
        let bus = EventBus::new();
        let card = Card {
            fail_append: true,
            ..Card::default()
        };
        let mut m = LoggerModel::new(card, &raw_config());
        m.on_tick(1000, &bus);
        assert_eq!(m.rows_written(), 0);
        assert_eq!(bus.ingress().len(), 2);
    }

    #[test]
    fn missing_card_publishes_no_status() {
        let bus = EventBus::new();
        let card = Card {
            absent: true,
            ..Card::default()
        };
        let mut m = LoggerModel::new(card, &raw_config());
        m.on_tick(1000, &bus);
        assert_eq!(m.rows_written(), 0);
        assert_eq!(bus.ingress().len(), 0);
        assert!(m.storage().rows.is_empty());
    }

    #[test]
    fn extreme_values_fit_row() {
        let bus = EventBus::new();
        let mut m = LoggerModel::new(Card::default(), &raw_config());
        for e in [
            TelemetryEvent::SpeedKmh(f32::MIN),
            TelemetryEvent::GnssSpeed(f32::MIN),
            TelemetryEvent::GnssLatitude(f32::MIN),
            TelemetryEvent::GnssLongitude(f32::MIN),
            TelemetryEvent::GnssAltitude(f32::MIN),
            TelemetryEvent::NetworkLatitude(f32::MIN),
            TelemetryEvent::NetworkLongitude(f32::MIN),
            TelemetryEvent::BatteryPowerKw(f32::MIN),
            TelemetryEvent::BatteryEnergyKwh(f32::MIN),
        ] {
            m.on_event(&e);
        }
        let row = m.row(u64::MAX).unwrap();
        assert_eq!(row.split(',').count(), 10);
        assert!(row.ends_with(".00"));

        m.on_tick(u64::MAX, &bus);
        assert_eq!(m.rows_written(), 1);
        assert_eq!(m.storage().rows[0].split(',').count(), 10);

        for e in [
            TelemetryEvent::GnssLatitude(f32::MAX),
            TelemetryEvent::NetworkLongitude(f32::MAX),
        ] {
            m.on_event(&e);
        }
        assert_eq!(m.row(0).unwrap().split(',').count(), 10);
    }
}
