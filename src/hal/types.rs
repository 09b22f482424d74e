// src/hal/types.rs
//! Core types for digitizer hardware abstraction

use crate::config::constants::adc;
use crate::hal::registers::control;
use serde::{Deserialize, Serialize};

/// ADC oversampling mode
///
/// The mode fixes the synthesizer-to-sample-rate ratio and therefore the
/// highest legal sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OversampleMode {
    #[serde(alias = "bandpass32x")]
    BandPass32x,
    #[serde(alias = "lowpass32x")]
    LowPass32x,
    #[serde(alias = "lowpass16x")]
    LowPass16x,
}

impl OversampleMode {
    /// Default mode for a requested sample rate
    pub fn for_rate(sample_rate_hz: u32) -> Self {
        if sample_rate_hz > adc::MID_SAMPLE_RATE_HZ {
            OversampleMode::LowPass16x
        } else {
            OversampleMode::LowPass32x
        }
    }

    /// Synthesizer clocks per output sample
    pub fn ratio(self) -> u32 {
        match self {
            OversampleMode::BandPass32x | OversampleMode::LowPass32x => 32,
            OversampleMode::LowPass16x => 16,
        }
    }

    /// Highest sample rate reachable in this mode
    pub fn max_rate_hz(self) -> u32 {
        match self {
            OversampleMode::BandPass32x | OversampleMode::LowPass32x => adc::MID_SAMPLE_RATE_HZ,
            OversampleMode::LowPass16x => adc::MAX_SAMPLE_RATE_HZ,
        }
    }

    /// Mode bits of the control register
    pub fn control_bits(self) -> u32 {
        match self {
            OversampleMode::BandPass32x => control::ADC_MODE_32_BANDPASS,
            OversampleMode::LowPass32x => control::ADC_MODE_32_LOWPASS,
            OversampleMode::LowPass16x => control::ADC_MODE_16_LOWPASS,
        }
    }

    /// Input filter of this mode
    pub fn filter(self) -> Filter {
        match self {
            OversampleMode::BandPass32x => Filter::BandPass,
            OversampleMode::LowPass32x | OversampleMode::LowPass16x => Filter::LowPass,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OversampleMode::BandPass32x => "32x oversampling, band pass filter",
            OversampleMode::LowPass32x => "32x oversampling, low pass filter",
            OversampleMode::LowPass16x => "16x oversampling, low pass filter",
        }
    }
}

/// Input filter selectable at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    BandPass,
    LowPass,
}

impl Filter {
    pub fn name(self) -> &'static str {
        match self {
            Filter::BandPass => "band-pass",
            Filter::LowPass => "low-pass",
        }
    }
}

/// Acquisition trigger source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSource {
    /// Software trigger issued by the driver after each pulse
    Internal,
    External,
}

/// Sample clock source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockSource {
    Internal,
    External,
}

/// How raw samples leave the card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// Sequential register reads of the on-board FIFO
    Fifo,
    /// Block copy into alternating host buffers
    BlockCopy,
}
