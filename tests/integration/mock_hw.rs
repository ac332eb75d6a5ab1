//! In-memory ports for integration tests.
//!
//! Each fake records what the pipeline handed it so tests can assert on
//! the full history.

use std::sync::atomic::{AtomicU64, Ordering};

use leafmon::app::display::DisplayFrame;
use leafmon::app::ports::{
    ClockPort, DisplayPort, RowStorage, StorageError, UplinkError, UplinkTransport,
};
use leafmon::can::RawFrame;

// ── Clock ─────────────────────────────────────────────────────

/// Clock that only moves when told to.
#[derive(Default)]
pub struct ManualClock(AtomicU64);

#[allow(dead_code)]
impl ManualClock {
    pub fn at(ms: u64) -> Self {
        Self(AtomicU64::new(ms))
    }

    pub fn set(&self, ms: u64) {
        self.0.store(ms, Ordering::Relaxed);
    }

    pub fn advance(&self, ms: u64) {
        self.0.fetch_add(ms, Ordering::Relaxed);
    }
}

impl ClockPort for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

// ── Display ───────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingScreen {
    pub frames: Vec<DisplayFrame>,
}

#[allow(dead_code)]
impl RecordingScreen {
    pub fn last(&self) -> Option<&DisplayFrame> {
        self.frames.last()
    }
}

impl DisplayPort for RecordingScreen {
    fn render(&mut self, frame: &DisplayFrame) {
        self.frames.push(*frame);
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryCard {
    pub header: Option<String>,
    pub rows: Vec<String>,
}

impl RowStorage for MemoryCard {
    fn begin(&mut self) -> Result<(), StorageError> {
        Ok(())
    }

    fn append_row(&mut self, header: &str, row: &str) -> Result<(), StorageError> {
        self.header.get_or_insert_with(|| header.to_owned());
        self.rows.push(row.to_owned());
        Ok(())
    }
}

// ── Uplink ────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingBroker {
    pub published: Vec<(String, String)>,
}

#[allow(dead_code)]
impl RecordingBroker {
    pub fn value_of(&self, topic: &str) -> Option<&str> {
        self.published
            .iter()
            .rev()
            .find(|(t, _)| t == topic)
            .map(|(_, p)| p.as_str())
    }
}

impl UplinkTransport for RecordingBroker {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), UplinkError> {
        self.published.push((topic.to_owned(), payload.to_owned()));
        Ok(())
    }
}

// ── Frames ────────────────────────────────────────────────────

pub fn frame(id: u16, data: &[u8]) -> RawFrame {
    RawFrame::standard(id, data).expect("valid test frame")
}

// ── Delay ─────────────────────────────────────────────────────

/// Delay that returns at once and counts the milliseconds asked for.
#[derive(Default)]
pub struct TallyDelay {
    pub total_ns: u64,
}

impl embedded_hal::delay::DelayNs for TallyDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}
