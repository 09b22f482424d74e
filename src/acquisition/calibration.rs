// src/acquisition/calibration.rs
//! Per-channel raw-to-physical scale factors

use crate::error::{DigitizerError, DigitizerResult};
use parking_lot::RwLock;

/// Default scale for an uncalibrated channel
pub const UNIT_SCALE: f32 = 1.0;

/// Shared calibration table
///
/// Writers replace single entries; the processing worker copies the whole
/// table once per pulse so a pulse never mixes old and new factors.
#[derive(Debug)]
pub struct CalibrationTable {
    scales: RwLock<Vec<f32>>,
}

impl CalibrationTable {
    /// Table of `channels` unit scales
    pub fn new(channels: usize) -> Self {
        Self {
            scales: RwLock::new(vec![UNIT_SCALE; channels]),
        }
    }

    /// Table seeded from `initial`, remaining channels at unit scale
    pub fn with_scales(channels: usize, initial: &[f32]) -> Self {
        let mut scales = vec![UNIT_SCALE; channels];
        for (slot, scale) in scales.iter_mut().zip(initial) {
            *slot = *scale;
        }
        Self {
            scales: RwLock::new(scales),
        }
    }

    pub fn channels(&self) -> usize {
        self.scales.read().len()
    }

    pub fn get(&self, channel: usize) -> DigitizerResult<f32> {
        let scales = self.scales.read();
        scales
            .get(channel)
            .copied()
            .ok_or(DigitizerError::ChannelOutOfRange {
                channel,
                channels: scales.len(),
            })
    }

    pub fn set(&self, channel: usize, scale: f32) -> DigitizerResult<()> {
        let mut scales = self.scales.write();
        let channels = scales.len();
        match scales.get_mut(channel) {
            Some(slot) => {
                *slot = scale;
                Ok(())
            }
            None => Err(DigitizerError::ChannelOutOfRange { channel, channels }),
        }
    }

    /// Copy all factors into `dest` under one read lock
    pub fn snapshot_into(&self, dest: &mut [f32]) {
        let scales = self.scales.read();
        let len = dest.len().min(scales.len());
        dest[..len].copy_from_slice(&scales[..len]);
    }

    pub fn snapshot(&self) -> Vec<f32> {
        self.scales.read().clone()
    }
}
