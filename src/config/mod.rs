// src/config/mod.rs
//! Digitizer configuration
//!
//! Everything here is fixed once the device is created; only the
//! calibration table can change afterwards, through the device handle.

pub mod constants;
pub mod loader;

pub use constants::*;
pub use loader::{ConfigError, ConfigLoader};

use crate::error::{DigitizerError, DigitizerResult};
use crate::hal::{ClockSource, OversampleMode, Transport, TriggerSource};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete driver configuration for one card
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct DigitizerConfig {
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
}

/// Acquisition parameters programmed into the card
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AcquisitionConfig {
    /// Card name, used for the worker thread and log fields
    #[serde(default = "defaults::name")]
    pub name: String,

    /// Enabled channels, even, 2..=32
    #[serde(default = "defaults::channels")]
    pub channels: usize,

    /// Samples per channel per trigger
    #[serde(default = "defaults::samples")]
    pub samples: usize,

    /// Triggers batched into one interrupt
    #[serde(default = "defaults::steps")]
    pub steps: usize,

    #[serde(default = "defaults::decimation")]
    pub decimation: u32,

    /// Requested sample clock in Hz
    #[serde(default = "defaults::clock_hz")]
    pub clock_hz: u32,

    /// Derived from `clock_hz` when absent
    #[serde(default)]
    pub oversample_mode: Option<OversampleMode>,

    #[serde(default = "defaults::trigger_source")]
    pub trigger_source: TriggerSource,

    #[serde(default = "defaults::clock_source")]
    pub clock_source: ClockSource,

    #[serde(default = "defaults::transport")]
    pub transport: Transport,
}

/// History ring sizing
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HistoryConfig {
    #[serde(default = "defaults::history_capacity")]
    pub capacity: usize,

    /// Multi-pulse queries never reach further back than this; leaving a
    /// gap below `capacity` keeps slow readers away from the write slot.
    #[serde(default)]
    pub usable_depth: Option<usize>,
}

/// Delays used while programming and re-arming the card
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TimingConfig {
    /// Pause before the next software trigger
    #[serde(default = "defaults::settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Pause after every synthesizer serial bit
    #[serde(default = "defaults::clock_bit_delay_ms")]
    pub clock_bit_delay_ms: u64,

    /// Pause for the synthesizer PLL to lock
    #[serde(default = "defaults::pll_settle_ms")]
    pub pll_settle_ms: u64,
}

/// Initial per-channel scale factors; missing channels default to 1.0
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct CalibrationConfig {
    #[serde(default)]
    pub scales: Vec<f32>,
}

mod defaults {
    use crate::config::constants::*;
    use crate::hal::{ClockSource, Transport, TriggerSource};

    pub fn name() -> String { "digitizer0".to_string() }
    pub fn channels() -> usize { adc::DEFAULT_CHANNELS }
    pub fn samples() -> usize { adc::DEFAULT_SAMPLES }
    pub fn steps() -> usize { adc::DEFAULT_STEPS }
    pub fn decimation() -> u32 { adc::DEFAULT_DECIMATION }
    pub fn clock_hz() -> u32 { adc::DEFAULT_SAMPLE_RATE_HZ }
    pub fn trigger_source() -> TriggerSource { TriggerSource::Internal }
    pub fn clock_source() -> ClockSource { ClockSource::Internal }
    pub fn transport() -> Transport { Transport::Fifo }

    pub fn history_capacity() -> usize { history::DEFAULT_CAPACITY }

    pub fn settle_delay_ms() -> u64 { timing::DEFAULT_SETTLE_DELAY_MS }
    pub fn clock_bit_delay_ms() -> u64 { timing::DEFAULT_CLOCK_BIT_DELAY_MS }
    pub fn pll_settle_ms() -> u64 { timing::DEFAULT_PLL_SETTLE_MS }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            name: defaults::name(),
            channels: defaults::channels(),
            samples: defaults::samples(),
            steps: defaults::steps(),
            decimation: defaults::decimation(),
            clock_hz: defaults::clock_hz(),
            oversample_mode: None,
            trigger_source: defaults::trigger_source(),
            clock_source: defaults::clock_source(),
            transport: defaults::transport(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: defaults::history_capacity(),
            usable_depth: None,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: defaults::settle_delay_ms(),
            clock_bit_delay_ms: defaults::clock_bit_delay_ms(),
            pll_settle_ms: defaults::pll_settle_ms(),
        }
    }
}

impl TimingConfig {
    /// No delays at all, for simulated cards
    pub fn immediate() -> Self {
        Self {
            settle_delay_ms: 0,
            clock_bit_delay_ms: 0,
            pll_settle_ms: 0,
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn clock_bit_delay(&self) -> Duration {
        Duration::from_millis(self.clock_bit_delay_ms)
    }

    pub fn pll_settle(&self) -> Duration {
        Duration::from_millis(self.pll_settle_ms)
    }

    pub fn validate(&self) -> DigitizerResult<()> {
        for (field, value) in [
            ("settle_delay_ms", self.settle_delay_ms),
            ("clock_bit_delay_ms", self.clock_bit_delay_ms),
            ("pll_settle_ms", self.pll_settle_ms),
        ] {
            if value > timing::MAX_DELAY_MS {
                return Err(DigitizerError::config(
                    field,
                    format!("{} ms exceeds {} ms", value, timing::MAX_DELAY_MS),
                ));
            }
        }
        Ok(())
    }
}

impl AcquisitionConfig {
    /// Oversample mode in effect, explicit or derived from the clock rate
    pub fn mode(&self) -> OversampleMode {
        self.oversample_mode
            .unwrap_or_else(|| OversampleMode::for_rate(self.clock_hz))
    }

    /// Samples per channel per interrupt, S*T
    pub fn samples_per_channel(&self) -> usize {
        self.samples * self.steps
    }

    /// Raw samples per interrupt, C*S*T
    pub fn frame_len(&self) -> usize {
        self.channels * self.samples_per_channel()
    }

    /// Check every hardware constraint
    pub fn validate(&self) -> DigitizerResult<()> {
        if self.channels < adc::MIN_CHANNELS
            || self.channels > adc::MAX_CHANNELS
            || self.channels % 2 != 0
        {
            return Err(DigitizerError::config(
                "channels",
                format!(
                    "{} is not an even count in {}..={}",
                    self.channels,
                    adc::MIN_CHANNELS,
                    adc::MAX_CHANNELS
                ),
            ));
        }

        if self.samples == 0 {
            return Err(DigitizerError::config("samples", "must be at least 1"));
        }

        if self.steps == 0 {
            return Err(DigitizerError::config("steps", "must be at least 1"));
        }

        if self.trigger_source == TriggerSource::Internal && self.steps != 1 {
            return Err(DigitizerError::config(
                "steps",
                format!("must be 1 with internal trigger, got {}", self.steps),
            ));
        }

        let total = self
            .channels
            .checked_mul(self.samples)
            .and_then(|n| n.checked_mul(self.steps));
        match total {
            Some(n) if n <= adc::MAX_BUFFER_SAMPLES => {}
            _ => {
                return Err(DigitizerError::config(
                    "samples",
                    format!(
                        "{} channels x {} samples x {} steps exceeds {} buffered samples",
                        self.channels,
                        self.samples,
                        self.steps,
                        adc::MAX_BUFFER_SAMPLES
                    ),
                ));
            }
        }

        if self.decimation < adc::MIN_DECIMATION || self.decimation > adc::MAX_DECIMATION {
            return Err(DigitizerError::config(
                "decimation",
                format!(
                    "{} outside {}..={}",
                    self.decimation,
                    adc::MIN_DECIMATION,
                    adc::MAX_DECIMATION
                ),
            ));
        }

        let mode = self.mode();
        if self.clock_hz < adc::MIN_SAMPLE_RATE_HZ || self.clock_hz > mode.max_rate_hz() {
            return Err(DigitizerError::config(
                "clock_hz",
                format!(
                    "{} Hz outside {}..={} Hz for {}",
                    self.clock_hz,
                    adc::MIN_SAMPLE_RATE_HZ,
                    mode.max_rate_hz(),
                    mode.name()
                ),
            ));
        }

        Ok(())
    }
}

impl HistoryConfig {
    /// Depth available to multi-pulse queries
    pub fn usable_depth(&self) -> usize {
        self.usable_depth.unwrap_or(self.capacity)
    }

    pub fn validate(&self) -> DigitizerResult<()> {
        if self.capacity < history::MIN_CAPACITY {
            return Err(DigitizerError::config(
                "history.capacity",
                format!("must be at least {}", history::MIN_CAPACITY),
            ));
        }
        if let Some(depth) = self.usable_depth {
            if depth == 0 || depth > self.capacity {
                return Err(DigitizerError::config(
                    "history.usable_depth",
                    format!("{} outside 1..={}", depth, self.capacity),
                ));
            }
        }
        Ok(())
    }
}

impl CalibrationConfig {
    pub fn validate(&self, channels: usize) -> DigitizerResult<()> {
        if self.scales.len() > channels {
            return Err(DigitizerError::config(
                "calibration.scales",
                format!("{} entries for {} channels", self.scales.len(), channels),
            ));
        }
        if let Some(bad) = self.scales.iter().find(|s| !s.is_finite()) {
            return Err(DigitizerError::config(
                "calibration.scales",
                format!("scale {} is not finite", bad),
            ));
        }
        Ok(())
    }
}

impl DigitizerConfig {
    /// Configuration with the given acquisition section and defaults elsewhere
    pub fn with_acquisition(acquisition: AcquisitionConfig) -> Self {
        Self {
            acquisition,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> DigitizerResult<()> {
        self.acquisition.validate()?;
        self.history.validate()?;
        self.timing.validate()?;
        self.calibration.validate(self.acquisition.channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acquisition() -> AcquisitionConfig {
        AcquisitionConfig::default()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = DigitizerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.acquisition.mode(), OversampleMode::LowPass32x);
        assert_eq!(config.history.usable_depth(), history::DEFAULT_CAPACITY);
    }

    #[test]
    fn test_channel_count_rules() {
        for channels in [0, 1, 3, 33, 34] {
            let config = AcquisitionConfig { channels, ..acquisition() };
            let err = config.validate().expect_err("channel count should be rejected");
            assert!(matches!(err, DigitizerError::Configuration { field: "channels", .. }));
        }
        for channels in [2, 4, 32] {
            let config = AcquisitionConfig { channels, ..acquisition() };
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn test_internal_trigger_requires_single_step() {
        let config = AcquisitionConfig { steps: 2, ..acquisition() };
        assert!(config.validate().is_err());

        let config = AcquisitionConfig {
            steps: 2,
            trigger_source: TriggerSource::External,
            ..acquisition()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_buffer_limit() {
        let config = AcquisitionConfig {
            channels: 32,
            samples: adc::MAX_BUFFER_SAMPLES / 32,
            ..acquisition()
        };
        assert!(config.validate().is_ok());

        let config = AcquisitionConfig {
            channels: 32,
            samples: adc::MAX_BUFFER_SAMPLES / 32 + 1,
            ..acquisition()
        };
        assert!(config.validate().is_err());

        let config = AcquisitionConfig { samples: usize::MAX, ..acquisition() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_decimation_range() {
        assert!(AcquisitionConfig { decimation: 0, ..acquisition() }.validate().is_err());
        assert!(AcquisitionConfig { decimation: 256, ..acquisition() }.validate().is_ok());
        assert!(AcquisitionConfig { decimation: 257, ..acquisition() }.validate().is_err());
    }

    #[test]
    fn test_frequency_range_depends_on_mode() {
        let config = AcquisitionConfig {
            clock_hz: 800_000,
            oversample_mode: Some(OversampleMode::LowPass32x),
            ..acquisition()
        };
        assert!(config.validate().is_err());

        let config = AcquisitionConfig {
            clock_hz: 800_000,
            oversample_mode: Some(OversampleMode::LowPass16x),
            ..acquisition()
        };
        assert!(config.validate().is_ok());

        let config = AcquisitionConfig { clock_hz: 800_000, ..acquisition() };
        assert_eq!(config.mode(), OversampleMode::LowPass16x);
        assert!(config.validate().is_ok());

        assert!(AcquisitionConfig { clock_hz: 31_999, ..acquisition() }.validate().is_err());
    }

    #[test]
    fn test_history_validation() {
        let history = HistoryConfig { capacity: 10, usable_depth: Some(11) };
        assert!(history.validate().is_err());
        let history = HistoryConfig { capacity: 10, usable_depth: Some(7) };
        assert!(history.validate().is_ok());
        assert_eq!(history.usable_depth(), 7);
    }

    #[test]
    fn test_calibration_validation() {
        let calibration = CalibrationConfig { scales: vec![1.0; 5] };
        assert!(calibration.validate(4).is_err());
        let calibration = CalibrationConfig { scales: vec![f32::NAN] };
        assert!(calibration.validate(4).is_err());
        let calibration = CalibrationConfig { scales: vec![0.5, 2.0] };
        assert!(calibration.validate(4).is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = DigitizerConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: DigitizerConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config, deserialized);
    }
}
