//! Runtime diagnostics: raw frame trace and delivery statistics.
//!
//! The frame trace prints every received frame to the serial console in
//! the SLCAN/LAWICEL text form (`t<id:3><dlc:1><data>\r`, lowercase hex),
//! so a capture can be replayed by standard CAN tooling.  It is off at
//! boot and toggled by a `ToggleTrace` control event.

use core::fmt::Write as _;
use std::io;

use log::info;

use crate::bus::ConsumerId;
use crate::bus::router::RouterStats;
use crate::can::RawFrame;

/// `t` + 3 id digits + 1 dlc digit + 16 data digits + `\r`.
pub const TRACE_LINE_CAP: usize = 22;

/// Format one frame as a trace line, carriage return included.
pub fn trace_line(frame: &RawFrame) -> heapless::String<TRACE_LINE_CAP> {
    let mut line = heapless::String::new();
    // Capacity covers the longest possible frame.
    let _ = write!(line, "t{:03x}{}", frame.identifier(), frame.payload().len());
    for b in frame.payload() {
        let _ = write!(line, "{b:02x}");
    }
    let _ = line.push('\r');
    line
}

/// Reception-side trace switch.
#[derive(Debug, Default)]
pub struct FrameTrace {
    enabled: bool,
}

impl FrameTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled != self.enabled {
            info!("frame trace {}", if enabled { "enabled" } else { "disabled" });
        }
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Write `frame` to `out` if tracing is on.
    pub fn emit<W: io::Write>(&self, frame: &RawFrame, out: &mut W) -> io::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        out.write_all(trace_line(frame).as_bytes())
    }
}

/// Fits the summary with every counter at `u32::MAX`.
pub const STATS_LINE_CAP: usize = 128;

/// One-line summary of router delivery counters.
pub fn router_stats_line(stats: &RouterStats) -> heapless::String<STATS_LINE_CAP> {
    let mut line = heapless::String::new();
    // Capacity covers every counter at u32::MAX.
    let _ = write!(
        line,
        "routed={} unsubscribed={} dropped:",
        stats.routed, stats.unsubscribed
    );
    for c in ConsumerId::ALL {
        let _ = write!(line, " {}={}", c.name(), stats.dropped[c.index()]);
    }
    line
}

pub fn log_router_stats(stats: &RouterStats) {
    info!("router: {}", router_stats_line(stats));
}
