//! TWAI (CAN) controller adapter.
//!
//! Implements [`CanPort`] for the ESP32 TWAI peripheral at 500 kbit/s.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: wraps `esp_idf_hal::can::CanDriver` on the pins from
//! [`crate::pins`].  The reception task and the command dispatcher call the
//! driver concurrently; the TWAI driver serialises access itself, so the
//! adapter holds no lock of its own and a blocking receive never delays a
//! transmit.  On host/test: an in-memory bus where frames are injected for
//! reception and transmitted frames are recorded.

use log::info;

use crate::app::ports::CanPort;
use crate::can::RawFrame;
use crate::config::SystemConfig;
use crate::error::DriverError;

#[cfg(target_os = "espidf")]
use esp_idf_hal::can::{self, CanDriver};
#[cfg(target_os = "espidf")]
use esp_idf_hal::delay::TickType;
#[cfg(target_os = "espidf")]
use esp_idf_hal::gpio::{AnyInputPin, AnyOutputPin};
#[cfg(target_os = "espidf")]
use log::error;

#[cfg(not(target_os = "espidf"))]
use std::collections::VecDeque;
#[cfg(not(target_os = "espidf"))]
use std::sync::Mutex;

// ── ESP-IDF ───────────────────────────────────────────────────

/// Driver handle shared between the reception and dispatcher tasks.
#[cfg(target_os = "espidf")]
struct SharedDriver(CanDriver<'static>);

// SAFETY: `twai_transmit` and `twai_receive` are safe to call from
// different tasks at once; the ESP-IDF TWAI driver guards its state with
// its own spinlock and FreeRTOS queues.  `start` is the only `&mut` use
// and happens before the handle is shared.
#[cfg(target_os = "espidf")]
unsafe impl Send for SharedDriver {}
#[cfg(target_os = "espidf")]
unsafe impl Sync for SharedDriver {}

#[cfg(target_os = "espidf")]
pub struct TwaiAdapter {
    driver: SharedDriver,
    rx_ticks: u32,
    tx_ticks: u32,
}

#[cfg(target_os = "espidf")]
impl TwaiAdapter {
    /// Install and start the driver.  Both steps are fatal on failure.
    pub fn start(
        peripheral: esp_idf_hal::can::CAN,
        config: &SystemConfig,
    ) -> Result<Self, DriverError> {
        // SAFETY: the CAN pins are claimed by nothing else; see `pins`.
        let (tx, rx) = unsafe {
            (
                AnyOutputPin::new(crate::pins::CAN_TX_GPIO),
                AnyInputPin::new(crate::pins::CAN_RX_GPIO),
            )
        };
        let timing = can::config::Config::new().timing(can::config::Timing::B500K);

        let mut driver = CanDriver::new(peripheral, tx, rx, &timing).map_err(|e| {
            error!("TWAI install: {e}");
            DriverError::InstallFailed
        })?;
        driver.start().map_err(|e| {
            error!("TWAI start: {e}");
            DriverError::StartFailed
        })?;
        info!(
            "TWAI started (tx=GPIO{}, rx=GPIO{}, 500 kbit/s)",
            crate::pins::CAN_TX_GPIO,
            crate::pins::CAN_RX_GPIO
        );

        Ok(Self {
            driver: SharedDriver(driver),
            rx_ticks: TickType::new_millis(u64::from(config.can_receive_timeout_ms)).ticks(),
            tx_ticks: TickType::new_millis(u64::from(config.can_transmit_timeout_ms)).ticks(),
        })
    }
}

#[cfg(target_os = "espidf")]
impl CanPort for TwaiAdapter {
    fn transmit(&self, frame: &RawFrame) -> Result<(), DriverError> {
        use embedded_can::Frame;

        let Some(hw) = <can::Frame as Frame>::new(Frame::id(frame), frame.payload()) else {
            return Err(DriverError::TransmitFailed);
        };
        self.driver
            .0
            .transmit(&hw, self.tx_ticks)
            .map_err(|_| DriverError::TransmitFailed)
    }

    fn receive(&self) -> Result<Option<RawFrame>, DriverError> {
        use embedded_can::{Frame, Id};

        match self.driver.0.receive(self.rx_ticks) {
            Ok(hw) => match Frame::id(&hw) {
                Id::Standard(id) => Ok(RawFrame::standard(id.as_raw(), Frame::data(&hw))),
                Id::Extended(_) => Ok(None),
            },
            Err(e) if e.code() == esp_idf_sys::ESP_ERR_TIMEOUT as i32 => Ok(None),
            Err(_) => Err(DriverError::ReceiveFailed),
        }
    }
}

// ── Host simulation ───────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
pub struct TwaiAdapter {
    rx: Mutex<VecDeque<RawFrame>>,
    tx: Mutex<Vec<RawFrame>>,
    fail_tx: std::sync::atomic::AtomicBool,
}

#[cfg(not(target_os = "espidf"))]
impl TwaiAdapter {
    pub fn start(_config: &SystemConfig) -> Result<Self, DriverError> {
        info!("TWAI(sim): in-memory bus");
        Ok(Self::default())
    }

    /// Queue a frame as if it arrived from the vehicle.
    pub fn inject(&self, frame: RawFrame) {
        if let Ok(mut rx) = self.rx.lock() {
            rx.push_back(frame);
        }
    }

    /// Every frame transmitted so far.
    pub fn transmitted(&self) -> Vec<RawFrame> {
        self.tx.lock().map(|tx| tx.clone()).unwrap_or_default()
    }

    /// Make every following transmit fail.
    pub fn set_transmit_failing(&self, failing: bool) {
        self.fail_tx
            .store(failing, std::sync::atomic::Ordering::Relaxed);
    }
}

#[cfg(not(target_os = "espidf"))]
impl CanPort for TwaiAdapter {
    fn transmit(&self, frame: &RawFrame) -> Result<(), DriverError> {
        let mut tx = self.tx.lock().map_err(|_| DriverError::TransmitFailed)?;
        tx.push(frame.clone());
        if self.fail_tx.load(std::sync::atomic::Ordering::Relaxed) {
            return Err(DriverError::TransmitFailed);
        }
        Ok(())
    }

    fn receive(&self) -> Result<Option<RawFrame>, DriverError> {
        let mut rx = self.rx.lock().map_err(|_| DriverError::ReceiveFailed)?;
        Ok(rx.pop_front())
    }
}
