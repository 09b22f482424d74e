// tests/config_loading.rs
//! Loading configuration files and creating devices from them

use digitizer_core::config::{ConfigError, ConfigLoader};
use digitizer_core::hal::simulator::SimulatedBoard;
use digitizer_core::hal::{ClockSource, OversampleMode, Transport, TriggerSource};
use digitizer_core::DigitizerDevice;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

const CARD_TOML: &str = r#"
[acquisition]
name = "beamline-adc"
channels = 8
samples = 256
steps = 2
decimation = 2
clock_hz = 200000
oversample_mode = "band_pass32x"
trigger_source = "external"
clock_source = "internal"
transport = "block_copy"

[history]
capacity = 64
usable_depth = 48

[timing]
settle_delay_ms = 0
clock_bit_delay_ms = 0
pll_settle_ms = 0

[calibration]
scales = [0.5, 0.5, 1.0, 2.0]
"#;

#[test]
fn test_full_file_round_trips_into_device() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(CARD_TOML.as_bytes()).unwrap();

    let config = ConfigLoader::from_file(file.path()).unwrap();
    let acq = &config.acquisition;
    assert_eq!(acq.channels, 8);
    assert_eq!(acq.mode(), OversampleMode::BandPass32x);
    assert_eq!(acq.trigger_source, TriggerSource::External);
    assert_eq!(acq.clock_source, ClockSource::Internal);
    assert_eq!(acq.transport, Transport::BlockCopy);
    assert_eq!(config.history.usable_depth(), 48);

    let board = Arc::new(SimulatedBoard::new());
    let device = DigitizerDevice::create(config, board.clone()).unwrap();
    assert_eq!(device.calibration(0).unwrap(), 0.5);
    assert_eq!(device.calibration(7).unwrap(), 1.0);

    let regs = board.snapshot();
    assert_eq!(regs.channel_count, 7);
    assert_eq!(regs.buffer_length, 8 * 256 * 2 / 2 - 1);
    assert_eq!(regs.acquisition_count, 256);
    assert_eq!(regs.decimation, 1);
    assert_eq!(regs.software_triggers, 0);
}

#[test]
fn test_minimal_file_uses_defaults() {
    let config = ConfigLoader::from_toml_str("[acquisition]\nchannels = 2\n").unwrap();
    assert_eq!(config.acquisition.samples, 100);
    assert_eq!(config.history.capacity, 800);
    assert_eq!(config.timing.settle_delay_ms, 50);
}

#[test]
fn test_invalid_files_are_rejected() {
    assert!(matches!(
        ConfigLoader::from_toml_str("[acquisition]\nchannels = 5\n"),
        Err(ConfigError::ValidationError(_))
    ));
    assert!(matches!(
        ConfigLoader::from_toml_str("[acquisition\n"),
        Err(ConfigError::ParseError(_))
    ));
    assert!(matches!(
        ConfigLoader::from_file("/nonexistent/digitizer.toml"),
        Err(ConfigError::FileNotFound(_))
    ));
}
