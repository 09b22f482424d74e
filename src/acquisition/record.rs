// src/acquisition/record.rs
//! Per-pulse statistics records

use serde::Serialize;

/// Calibrated waveform and statistics of one channel for one pulse
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelData {
    /// Calibrated samples, S*T long
    pub waveform: Vec<f32>,
    /// Largest calibrated sample, `-inf` if no sample compared greater
    pub peak: f32,
    /// Seconds from the trigger to the first occurrence of the peak
    pub peak_time: Option<f64>,
    /// Sum of calibrated samples divided by the effective sample rate
    pub integral: f64,
}

/// Statistics of every channel for one completed pulse
///
/// Built by the processing worker, immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PulseRecord {
    /// Position in the arrival order, assigned by the history store
    pub sequence: u64,
    /// Nanoseconds since the Unix epoch
    pub timestamp: u64,
    pub channels: Vec<ChannelData>,
}

impl PulseRecord {
    pub fn channel(&self, channel: usize) -> Option<&ChannelData> {
        self.channels.get(channel)
    }
}

/// A query result with the timestamp of the pulse it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stamped<T> {
    pub value: T,
    pub timestamp: u64,
}

/// Broadcast to data-ready subscribers after each stored pulse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PulseNotice {
    pub sequence: u64,
    pub timestamp: u64,
}
