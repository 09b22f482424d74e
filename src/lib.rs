//! Digitizer-Core: interrupt-driven driver for a multi-channel VME ADC card
//!
//! This library programs the card, services its interrupts and turns every
//! completed acquisition into per-channel pulse statistics. It features:
//!
//! - Hardware abstraction over the card's register block
//! - Sample clock synthesizer solver and bit-serial programmer
//! - Non-blocking interrupt handler with a dedicated processing worker
//! - Bounded pulse history with lock-light concurrent queries
//! - TOML configuration with validation
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use digitizer_core::config::{DigitizerConfig, TimingConfig};
//! use digitizer_core::hal::simulator::SimulatedBoard;
//! use digitizer_core::DigitizerDevice;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = DigitizerConfig::default();
//!     config.timing = TimingConfig::immediate();
//!
//!     let board = Arc::new(SimulatedBoard::new());
//!     let device = DigitizerDevice::create(config, board.clone())?;
//!     let notices = device.subscribe();
//!
//!     let frame = SimulatedBoard::synthetic_pulse(4, 100, 30, 1000, 5);
//!     board.capture(&frame);
//!     device.interrupt_handler().service();
//!     notices.recv_timeout(Duration::from_secs(1))?;
//!
//!     let peak = device.query().peak(0)?;
//!     println!("peak {} at {}", peak.value, peak.timestamp);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod acquisition;
pub mod config;
pub mod error;
pub mod hal;
pub mod utils;

// Re-export commonly used types for convenience
pub use acquisition::{
    DeviceReport, DigitizerDevice, InterruptHandler, PulseNotice, PulseQuery, PulseRecord, Stamped,
};
pub use config::{ConfigLoader, DigitizerConfig};
pub use error::{DigitizerError, DigitizerResult};
pub use hal::{Filter, OversampleMode, RegisterBlock};

pub use utils::time::{current_timestamp_nanos, TimeProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Interrupt-driven VME ADC digitizer driver".to_string(),
        features: vec![
            "Register block abstraction".to_string(),
            "Synthesizer clock programming".to_string(),
            "Per-pulse peak and integral statistics".to_string(),
            "Bounded pulse history".to_string(),
        ],
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// List of features
    pub features: Vec<String>,
}
