// src/acquisition/processing.rs
//! Per-pulse statistics: calibration, peak search and integration

use crate::acquisition::record::{ChannelData, PulseRecord};

/// Peak and integral of one calibrated channel sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelStats {
    pub peak: f32,
    pub peak_time: Option<f64>,
    pub integral: f64,
}

/// Single pass over `samples`
///
/// The first occurrence of the maximum wins; later equal values do not
/// move the peak time.
pub fn channel_stats(samples: &[f32], effective_rate_hz: f64) -> ChannelStats {
    let mut peak = f32::NEG_INFINITY;
    let mut peak_index = None;
    let mut sum = 0.0f64;

    for (i, &value) in samples.iter().enumerate() {
        if value > peak {
            peak = value;
            peak_index = Some(i);
        }
        sum += f64::from(value);
    }

    ChannelStats {
        peak,
        peak_time: peak_index.map(|i| i as f64 / effective_rate_hz),
        integral: sum / effective_rate_hz,
    }
}

/// Turns raw frames into pulse records for a fixed acquisition geometry
#[derive(Debug, Clone)]
pub struct PulseProcessor {
    channels: usize,
    samples_per_channel: usize,
    effective_rate_hz: f64,
}

impl PulseProcessor {
    /// `effective_rate_hz` is the actual sample clock divided by decimation
    pub fn new(channels: usize, samples_per_channel: usize, effective_rate_hz: f64) -> Self {
        Self {
            channels,
            samples_per_channel,
            effective_rate_hz,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn samples_per_channel(&self) -> usize {
        self.samples_per_channel
    }

    pub fn frame_len(&self) -> usize {
        self.channels * self.samples_per_channel
    }

    pub fn effective_rate_hz(&self) -> f64 {
        self.effective_rate_hz
    }

    /// Process one sample-major, channel-interleaved frame
    ///
    /// `scales` must hold one factor per channel; it is the snapshot taken
    /// for this pulse. The sequence number is left at zero for the history
    /// store to assign.
    pub fn process(&self, raw: &[i16], scales: &[f32], timestamp: u64) -> PulseRecord {
        let mut waveforms: Vec<Vec<f32>> = (0..self.channels)
            .map(|_| Vec::with_capacity(self.samples_per_channel))
            .collect();

        for row in raw.chunks_exact(self.channels).take(self.samples_per_channel) {
            for ((waveform, &sample), &scale) in waveforms.iter_mut().zip(row).zip(scales) {
                waveform.push(f32::from(sample) * scale);
            }
        }

        let channels = waveforms
            .into_iter()
            .map(|waveform| {
                let stats = channel_stats(&waveform, self.effective_rate_hz);
                ChannelData {
                    waveform,
                    peak: stats.peak,
                    peak_time: stats.peak_time,
                    integral: stats.integral,
                }
            })
            .collect();

        PulseRecord {
            sequence: 0,
            timestamp,
            channels,
        }
    }
}
