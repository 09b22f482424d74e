// src/error.rs
//! Unified error handling for the digitizer driver
//!
//! Configuration-time errors abort device creation and are never seen on a
//! running device. Runtime errors are returned to the caller and never
//! retried internally. Interrupt-context anomalies are not errors at all;
//! they are logged and counted by the interrupt handler.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used across the crate
pub type DigitizerResult<T> = Result<T, DigitizerError>;

/// Unified error type for the digitizer driver
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DigitizerError {
    /// Bad channel count, buffer size, decimation or frequency range
    #[error("[CONFIG] invalid {field}: {reason}")]
    Configuration {
        field: &'static str,
        reason: String,
    },

    /// The register block did not answer the probe
    #[error("[HARDWARE] no digitizer found: {reason}")]
    HardwareNotPresent { reason: String },

    /// The synthesizer solver found no legal control word
    #[error("[CLOCK] no synthesizer word for {target_mhz} MHz")]
    ClockProgramming { target_mhz: f64 },

    /// Channel index outside the configured channel count
    #[error("[QUERY] channel {channel} out of range (device has {channels} channels)")]
    ChannelOutOfRange { channel: usize, channels: usize },

    /// Query before the first pulse was recorded
    #[error("[QUERY] no pulse data available")]
    NoDataAvailable,

    /// Requested filter is not available in the configured oversample mode
    #[error("[CONFIG] filter {requested} not available in {mode} mode")]
    InvalidFilter {
        requested: &'static str,
        mode: &'static str,
    },

    /// The processing worker thread could not be started
    #[error("[SYSTEM] failed to spawn processing worker: {reason}")]
    WorkerSpawn { reason: String },
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Low,      // Caller may simply retry later
    Medium,   // Caller misuse, request rejected
    Critical, // Device was not created
}

impl DigitizerError {
    /// Shorthand for a configuration error
    pub fn config(field: &'static str, reason: impl Into<String>) -> Self {
        DigitizerError::Configuration {
            field,
            reason: reason.into(),
        }
    }

    /// Whether the error aborts device creation
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DigitizerError::Configuration { .. }
                | DigitizerError::HardwareNotPresent { .. }
                | DigitizerError::ClockProgramming { .. }
                | DigitizerError::WorkerSpawn { .. }
        )
    }

    /// Severity classification for logging
    pub fn severity(&self) -> Severity {
        match self {
            DigitizerError::NoDataAvailable => Severity::Low,
            DigitizerError::ChannelOutOfRange { .. } | DigitizerError::InvalidFilter { .. } => {
                Severity::Medium
            }
            _ => Severity::Critical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(DigitizerError::config("channels", "odd").is_fatal());
        assert!(DigitizerError::ClockProgramming { target_mhz: 400.0 }.is_fatal());
        assert!(DigitizerError::HardwareNotPresent { reason: "probe".into() }.is_fatal());
        assert!(!DigitizerError::NoDataAvailable.is_fatal());
        assert!(!DigitizerError::ChannelOutOfRange { channel: 9, channels: 4 }.is_fatal());
    }

    #[test]
    fn test_severity() {
        assert_eq!(DigitizerError::NoDataAvailable.severity(), Severity::Low);
        assert_eq!(
            DigitizerError::ChannelOutOfRange { channel: 4, channels: 4 }.severity(),
            Severity::Medium
        );
        assert_eq!(DigitizerError::config("decimation", "0").severity(), Severity::Critical);
    }

    #[test]
    fn test_display_messages() {
        let err = DigitizerError::ChannelOutOfRange { channel: 7, channels: 4 };
        let text = err.to_string();
        assert!(text.contains("channel 7"));
        assert!(text.contains("4 channels"));

        let err = DigitizerError::config("channels", "must be even");
        assert_eq!(err.to_string(), "[CONFIG] invalid channels: must be even");
    }
}
