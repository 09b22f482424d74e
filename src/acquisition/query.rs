// src/acquisition/query.rs
//! Read-only access to recorded pulses
//!
//! Channel indices are checked before history state, so a bad index is
//! reported as [`DigitizerError::ChannelOutOfRange`] even on an empty device.

use crate::acquisition::history::HistoryStore;
use crate::acquisition::record::{ChannelData, PulseRecord, Stamped};
use crate::error::{DigitizerError, DigitizerResult};
use std::sync::Arc;

/// Query front end over a device's history
#[derive(Debug, Clone)]
pub struct PulseQuery {
    history: Arc<HistoryStore>,
    channels: usize,
}

impl PulseQuery {
    pub fn new(history: Arc<HistoryStore>, channels: usize) -> Self {
        Self { history, channels }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    fn check_channel(&self, channel: usize) -> DigitizerResult<()> {
        if channel < self.channels {
            Ok(())
        } else {
            Err(DigitizerError::ChannelOutOfRange {
                channel,
                channels: self.channels,
            })
        }
    }

    /// Newest pulse record
    pub fn most_recent(&self) -> DigitizerResult<Arc<PulseRecord>> {
        self.history.most_recent().ok_or(DigitizerError::NoDataAvailable)
    }

    /// Up to `k` newest records, oldest first; empty if nothing is recorded
    pub fn last_k(&self, k: usize) -> Vec<Arc<PulseRecord>> {
        self.history.last_k(k)
    }

    fn latest<T>(
        &self,
        channel: usize,
        pick: impl FnOnce(&ChannelData) -> T,
    ) -> DigitizerResult<Stamped<T>> {
        self.check_channel(channel)?;
        let record = self.most_recent()?;
        let data = record
            .channel(channel)
            .ok_or(DigitizerError::ChannelOutOfRange {
                channel,
                channels: record.channels.len(),
            })?;
        Ok(Stamped {
            value: pick(data),
            timestamp: record.timestamp,
        })
    }

    /// Peak of the newest pulse
    pub fn peak(&self, channel: usize) -> DigitizerResult<Stamped<f32>> {
        self.latest(channel, |data| data.peak)
    }

    /// Peak time of the newest pulse, seconds; `None` if no peak was found
    pub fn peak_time(&self, channel: usize) -> DigitizerResult<Stamped<Option<f64>>> {
        self.latest(channel, |data| data.peak_time)
    }

    pub fn integral(&self, channel: usize) -> DigitizerResult<Stamped<f64>> {
        self.latest(channel, |data| data.integral)
    }

    /// Up to `max_points` leading samples of the newest waveform
    pub fn waveform(&self, channel: usize, max_points: usize) -> DigitizerResult<Stamped<Vec<f32>>> {
        self.latest(channel, |data| {
            let len = max_points.min(data.waveform.len());
            data.waveform[..len].to_vec()
        })
    }

    /// Integrals of the `k` newest pulses, oldest first
    ///
    /// Stamped with the newest pulse in the window.
    pub fn integral_history(&self, channel: usize, k: usize) -> DigitizerResult<Stamped<Vec<f64>>> {
        self.check_channel(channel)?;
        let records = self.history.last_k(k);
        let timestamp = records
            .last()
            .map(|record| record.timestamp)
            .ok_or(DigitizerError::NoDataAvailable)?;

        let value = records
            .iter()
            .filter_map(|record| record.channel(channel))
            .map(|data| data.integral)
            .collect();
        Ok(Stamped { value, timestamp })
    }

    /// Sum of the integrals of the `k` newest pulses
    pub fn integral_sum(&self, channel: usize, k: usize) -> DigitizerResult<Stamped<f64>> {
        let history = self.integral_history(channel, k)?;
        Ok(Stamped {
            value: history.value.iter().sum(),
            timestamp: history.timestamp,
        })
    }
}
