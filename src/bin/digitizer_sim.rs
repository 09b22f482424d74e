//! Drive a simulated digitizer card from the command line
//!
//! Usage: `digitizer-sim [CONFIG.toml] [PULSES]`
//!
//! Without a config argument the standard search path is used, falling
//! back to built-in defaults with all hardware delays disabled.

use digitizer_core::config::{ConfigLoader, DigitizerConfig, TimingConfig};
use digitizer_core::hal::registers::irq;
use digitizer_core::hal::simulator::SimulatedBoard;
use digitizer_core::{DigitizerDevice, RegisterBlock};
use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_PULSES: usize = 10;

fn load_config(path: Option<&str>) -> Result<DigitizerConfig, Box<dyn Error>> {
    if let Some(path) = path {
        return Ok(ConfigLoader::from_file(path)?);
    }
    match ConfigLoader::new().load() {
        Ok(config) => Ok(config),
        Err(e) => {
            warn!(error = %e, "no configuration file, using defaults");
            let mut config = DigitizerConfig::default();
            config.timing = TimingConfig::immediate();
            Ok(config)
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = load_config(args.first().map(String::as_str))?;
    let pulses = match args.get(1) {
        Some(n) => n.parse()?,
        None => DEFAULT_PULSES,
    };

    let channels = config.acquisition.channels;
    let samples = config.acquisition.samples_per_channel();

    let board = Arc::new(SimulatedBoard::new());
    let mut device = DigitizerDevice::create(config, board.clone())?;
    let handler = device.interrupt_handler();
    let notices = device.subscribe();
    let started = Instant::now();

    for pulse in 0..pulses {
        let peak_index = (samples / 4 + pulse) % samples;
        let amplitude = 200 + 50 * (pulse % 8) as i16;
        board.capture(&SimulatedBoard::synthetic_pulse(channels, samples, peak_index, amplitude, 4));

        // the bus would raise the interrupt until every enabled source is serviced
        while board.read_status() & board.read_interrupt_mask() & irq::DRIVER_SOURCES != 0 {
            handler.service();
        }

        let notice = notices.recv_timeout(Duration::from_secs(5))?;
        let peak = device.query().peak(0)?;
        let integral = device.query().integral(0)?;
        info!(
            sequence = notice.sequence,
            peak = peak.value,
            integral = integral.value,
            "pulse processed"
        );
    }

    info!(rate_hz = device.trigger_rate(started.elapsed()), "trigger rate");
    if pulses > 0 {
        let sum = device.query().integral_sum(0, pulses)?;
        info!(pulses, integral_sum = sum.value, "channel 0 integral over all pulses");
    }

    let report = device.report();
    println!("{}", report.render(2));
    println!("{}", report.to_json()?);

    device.shutdown();
    Ok(())
}
