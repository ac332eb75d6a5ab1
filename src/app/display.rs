//! Dashboard model.
//!
//! Keeps smoothed speed and power plus the latest energy, link and logger
//! state, and hands a [`DisplayFrame`] to the [`DisplayPort`] at the
//! refresh cadence.

use super::Consumer;
use super::ports::DisplayPort;
use crate::bus::{ConsumerId, EventBus};
use crate::config::SystemConfig;
use crate::control::smoothing::Smoothed;
use crate::events::{LoggerStatus, NetworkStatus, TelemetryEvent};

/// Below this speed (km/h) consumption per distance is meaningless.
const ECONOMY_MIN_SPEED_KMH: f32 = 1.0;

/// Everything drawn on one screen refresh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayFrame {
    pub speed_kmh: f32,
    pub power_kw: f32,
    pub energy_kwh: f32,
    /// kWh per 100 km, while moving.
    pub economy_kwh_per_100km: Option<f32>,
    /// Power flows into the pack.
    pub charging: bool,
    pub network: NetworkStatus,
    /// The trip logger is writing right now.
    pub logging: bool,
}

pub struct DisplayModel<P: DisplayPort> {
    port: P,
    speed: Smoothed,
    power: Smoothed,
    energy_kwh: f32,
    network: NetworkStatus,
    logging: bool,
    refresh_ms: u64,
    last_render_ms: Option<u64>,
}

impl<P: DisplayPort> DisplayModel<P> {
    pub fn new(port: P, config: &SystemConfig) -> Self {
        let alpha = config.smoothing.display;
        Self {
            port,
            speed: Smoothed::new(alpha),
            power: Smoothed::new(alpha),
            energy_kwh: 0.0,
            network: NetworkStatus::Disconnected,
            logging: false,
            refresh_ms: u64::from(config.display_refresh_ms),
            last_render_ms: None,
        }
    }

    pub fn frame(&self) -> DisplayFrame {
        let speed = self.speed.value();
        let power = self.power.value();
        DisplayFrame {
            speed_kmh: speed,
            power_kw: power,
            energy_kwh: self.energy_kwh,
            economy_kwh_per_100km: (speed > ECONOMY_MIN_SPEED_KMH)
                .then(|| (power / speed * 100.0).abs()),
            charging: power > 0.0,
            network: self.network,
            logging: self.logging,
        }
    }

    pub fn port(&self) -> &P {
        &self.port
    }
}

impl<P: DisplayPort> Consumer for DisplayModel<P> {
    const ID: ConsumerId = ConsumerId::Display;

    fn on_event(&mut self, event: &TelemetryEvent) {
        match *event {
            TelemetryEvent::SpeedKmh(v) => {
                self.speed.update(v);
            }
            TelemetryEvent::BatteryPowerKw(v) => {
                self.power.update(v);
            }
            TelemetryEvent::BatteryEnergyKwh(v) => self.energy_kwh = v,
            TelemetryEvent::NetworkStatus(s) => self.network = s,
            TelemetryEvent::LoggerStatus(s) => self.logging = s == LoggerStatus::WriteStarted,
            _ => {}
        }
    }

    fn on_tick(&mut self, now_ms: u64, _bus: &EventBus) {
        let due = self
            .last_render_ms
            .is_none_or(|t| now_ms.saturating_sub(t) >= self.refresh_ms);
        if due {
            self.last_render_ms = Some(now_ms);
            let frame = self.frame();
            self.port.render(&frame);
        }
    }
}
