//! Log-backed consumer ports.
//!
//! Implement [`DisplayPort`], [`RowStorage`] and [`UplinkTransport`] by
//! writing to the ESP-IDF logger (UART / USB-CDC in production).  They
//! stand in until the screen, SD card and modem drivers are attached, and
//! keep the whole pipeline observable on a bench with only a CAN cable.

use log::{debug, info};

use crate::app::display::DisplayFrame;
use crate::app::ports::{DisplayPort, RowStorage, StorageError, UplinkError, UplinkTransport};

/// Logs every Nth display frame.
pub struct LogDisplay {
    every: u32,
    count: u32,
}

impl LogDisplay {
    /// `every = 25` at the 40 ms refresh logs once per second.
    pub fn new(every: u32) -> Self {
        Self {
            every: every.max(1),
            count: 0,
        }
    }
}

impl DisplayPort for LogDisplay {
    fn render(&mut self, f: &DisplayFrame) {
        self.count = self.count.wrapping_add(1);
        if self.count % self.every != 0 {
            return;
        }
        let economy = f.economy_kwh_per_100km.unwrap_or(0.0);
        debug!(
            "DISP | {:.0} km/h | {:+.1} kW{} | {:.1} kWh | {:.1} kWh/100km | net={:?}{}",
            f.speed_kmh,
            f.power_kw,
            if f.charging { " (chg)" } else { "" },
            f.energy_kwh,
            economy,
            f.network,
            if f.logging { " | log" } else { "" },
        );
    }
}

/// Prints trip-log rows to the console, header first.
#[derive(Default)]
pub struct LogRowSink {
    header_written: bool,
}

impl LogRowSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RowStorage for LogRowSink {
    fn begin(&mut self) -> Result<(), StorageError> {
        Ok(())
    }

    fn append_row(&mut self, header: &str, row: &str) -> Result<(), StorageError> {
        if !self.header_written {
            info!("CSV  | {header}");
            self.header_written = true;
        }
        info!("CSV  | {row}");
        Ok(())
    }
}

/// Prints uplink publishes to the console.
#[derive(Default)]
pub struct LogUplink;

impl LogUplink {
    pub fn new() -> Self {
        Self
    }
}

impl UplinkTransport for LogUplink {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), UplinkError> {
        info!("PUB  | {topic} = {payload}");
        Ok(())
    }
}
