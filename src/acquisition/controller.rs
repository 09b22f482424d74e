// src/acquisition/controller.rs
//! Device lifecycle: creation, runtime controls and shutdown
//!
//! [`DigitizerDevice::create`] is the only way to get a running device. It
//! either programs the card completely and starts the worker, or fails
//! without exposing anything.

use crate::acquisition::calibration::CalibrationTable;
use crate::acquisition::event::{pulse_event, EventSignal};
use crate::acquisition::frames::FrameArena;
use crate::acquisition::history::HistoryStore;
use crate::acquisition::interrupt::{InterruptCounters, InterruptHandler};
use crate::acquisition::notify::DataReady;
use crate::acquisition::processing::PulseProcessor;
use crate::acquisition::query::PulseQuery;
use crate::acquisition::record::PulseNotice;
use crate::acquisition::synthesizer::{self, ClockStep, SynthesizerWord};
use crate::acquisition::worker::{LoggedFaults, PulseWorker};
use crate::config::{AcquisitionConfig, DigitizerConfig, TimingConfig};
use crate::error::{DigitizerError, DigitizerResult};
use crate::hal::registers::{control, irq, RegisterBlock};
use crate::hal::{ClockSource, Filter, OversampleMode, Transport, TriggerSource};
use crate::utils::time::{MonotonicTimeProvider, TimeProvider};
use crossbeam::channel::Receiver;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};

/// A programmed card with its processing worker
pub struct DigitizerDevice {
    config: DigitizerConfig,
    regs: Arc<dyn RegisterBlock>,
    synthesizer: SynthesizerWord,
    actual_rate_hz: f64,
    /// Current mode; held for every control register write after create
    mode: Arc<Mutex<OversampleMode>>,
    calibration: Arc<CalibrationTable>,
    history: Arc<HistoryStore>,
    query: PulseQuery,
    counters: Arc<InterruptCounters>,
    ready: Arc<DataReady>,
    handler: Arc<InterruptHandler>,
    signal: EventSignal,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

/// Serializable state snapshot of a device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceReport {
    pub name: String,
    pub channels: usize,
    pub samples: usize,
    pub steps: usize,
    pub decimation: u32,
    pub requested_hz: u32,
    pub actual_hz: f64,
    pub effective_rate_hz: f64,
    pub mode: OversampleMode,
    pub filter: Filter,
    pub trigger_source: TriggerSource,
    pub clock_source: ClockSource,
    pub transport: Transport,
    pub synthesizer: SynthesizerWord,
    pub triggers: u64,
    pub pulses_recorded: u64,
    pub history_len: usize,
    pub history_capacity: usize,
    pub history_full: bool,
    pub spurious_interrupts: u64,
    pub transfer_errors: u64,
    pub missed_copies: u64,
    pub running: bool,
}

impl DeviceReport {
    /// Human-readable report; higher levels add detail
    pub fn render(&self, level: u8) -> String {
        let mut out = format!(
            "{}: {} channels x {} samples at {:.1} Hz, {} pulses recorded",
            self.name,
            self.channels,
            self.samples * self.steps,
            self.actual_hz,
            self.pulses_recorded
        );
        if level >= 1 {
            let _ = write!(
                out,
                "\n  mode: {}\n  trigger: {:?}, clock: {:?}, transport: {:?}\n  \
                 requested {} Hz, decimation {}, effective {:.1} Hz\n  \
                 synthesizer: M={} P={} Q={} band={} word={:#08x}",
                self.mode.name(),
                self.trigger_source,
                self.clock_source,
                self.transport,
                self.requested_hz,
                self.decimation,
                self.effective_rate_hz,
                self.synthesizer.m,
                self.synthesizer.p,
                self.synthesizer.q,
                self.synthesizer.band,
                self.synthesizer.word,
            );
        }
        if level >= 2 {
            let _ = write!(
                out,
                "\n  triggers: {}, history {}/{}{}\n  \
                 spurious interrupts: {}, transfer errors: {}, missed copies: {}",
                self.triggers,
                self.history_len,
                self.history_capacity,
                if self.history_full { " (wrapped)" } else { "" },
                self.spurious_interrupts,
                self.transfer_errors,
                self.missed_copies,
            );
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn sleep_for(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

/// Shift the program word into the synthesizer serial port
fn write_synthesizer(regs: &dyn RegisterBlock, word: u32, timing: &TimingConfig) {
    for step in synthesizer::programming_steps(word) {
        match step {
            ClockStep::Write(value) => {
                regs.write_clock(value);
                sleep_for(timing.clock_bit_delay());
            }
            ClockStep::PllSettle => sleep_for(timing.pll_settle()),
        }
    }
}

/// Board reset through ADC reset, acquisition still disabled
fn program_board(
    regs: &dyn RegisterBlock,
    acq: &AcquisitionConfig,
    word: &SynthesizerWord,
    timing: &TimingConfig,
) {
    regs.reset_board();

    let mut ctrl = acq.mode().control_bits() | control::SAMPLE_MASTER | control::CAPTURE;
    if acq.trigger_source == TriggerSource::External {
        ctrl |= control::TRIGGER_EXTERNAL;
    }
    if acq.clock_source == ClockSource::External {
        ctrl |= control::CLOCK_EXTERNAL | control::CLOCK_TERMINATION;
    }
    regs.write_control(ctrl);

    regs.write_interrupt_mask(irq::DRIVER_SOURCES);
    regs.write_channel_count((acq.channels - 1) as u32);
    regs.write_buffer_length((acq.frame_len() / 2 - 1) as u32);
    regs.write_acquisition_count(acq.samples as u32);
    regs.write_decimation(acq.decimation - 1);

    write_synthesizer(regs, word.word, timing);
    regs.reset_adc();
}

impl DigitizerDevice {
    /// Validate, program the card and start acquiring
    pub fn create(config: DigitizerConfig, regs: Arc<dyn RegisterBlock>) -> DigitizerResult<Self> {
        Self::create_with_clock(config, regs, Arc::new(MonotonicTimeProvider::new()))
    }

    /// Like [`create`](Self::create) with an explicit timestamp source
    pub fn create_with_clock(
        config: DigitizerConfig,
        regs: Arc<dyn RegisterBlock>,
        clock: Arc<dyn TimeProvider>,
    ) -> DigitizerResult<Self> {
        config.validate()?;
        let acq = &config.acquisition;

        if !regs.probe() {
            return Err(DigitizerError::HardwareNotPresent {
                reason: format!("{} did not answer the probe", acq.name),
            });
        }

        let mode = acq.mode();
        let (word, actual_rate_hz) = synthesizer::solve_sample_rate(acq.clock_hz, mode)?;
        let effective_rate_hz = actual_rate_hz / f64::from(acq.decimation);

        program_board(regs.as_ref(), acq, &word, &config.timing);

        let channels = acq.channels;
        let calibration = Arc::new(CalibrationTable::with_scales(
            channels,
            &config.calibration.scales,
        ));
        let history = Arc::new(HistoryStore::new(
            config.history.capacity,
            config.history.usable_depth(),
        ));
        let frames = Arc::new(FrameArena::new(acq.frame_len()));
        let counters = Arc::new(InterruptCounters::default());
        let ready = Arc::new(DataReady::new());
        let stop = Arc::new(AtomicBool::new(false));
        let control_lock = Arc::new(Mutex::new(mode));
        let (signal, waiter) = pulse_event();

        let handler = Arc::new(InterruptHandler::new(
            Arc::clone(&regs),
            acq.transport,
            Arc::clone(&frames),
            signal.clone(),
            Arc::clone(&counters),
        ));

        let worker = PulseWorker {
            regs: Arc::clone(&regs),
            waiter,
            stop: Arc::clone(&stop),
            counters: Arc::clone(&counters),
            frames,
            calibration: Arc::clone(&calibration),
            history: Arc::clone(&history),
            ready: Arc::clone(&ready),
            clock,
            processor: PulseProcessor::new(channels, acq.samples_per_channel(), effective_rate_hz),
            trigger: acq.trigger_source,
            settle_delay: config.timing.settle_delay(),
            scales: vec![0.0; channels],
            control: Arc::clone(&control_lock),
            logged: LoggedFaults::default(),
        };

        let handle = thread::Builder::new()
            .name(format!("{}-worker", acq.name))
            .spawn(move || worker.run())
            .map_err(|e| {
                regs.reset_board();
                DigitizerError::WorkerSpawn {
                    reason: e.to_string(),
                }
            })?;

        regs.enable_interrupt_line();
        {
            let _control = control_lock.lock();
            regs.set_control_bits(control::ACQ_ENABLE);
            if acq.trigger_source == TriggerSource::Internal {
                regs.set_control_bits(control::ACQ_START);
            }
        }
        let _ = regs.read_status();

        info!(
            device = %acq.name,
            channels,
            samples = acq.samples_per_channel(),
            requested_hz = acq.clock_hz,
            actual_hz = actual_rate_hz,
            mode = mode.name(),
            m = word.m,
            p = word.p,
            q = word.q,
            "digitizer started"
        );

        let query = PulseQuery::new(Arc::clone(&history), channels);
        Ok(Self {
            config,
            regs,
            synthesizer: word,
            actual_rate_hz,
            mode: control_lock,
            calibration,
            history,
            query,
            counters,
            ready,
            handler,
            signal,
            stop,
            worker: Some(handle),
        })
    }

    pub fn config(&self) -> &DigitizerConfig {
        &self.config
    }

    pub fn synthesizer(&self) -> &SynthesizerWord {
        &self.synthesizer
    }

    /// Sample rate the synthesizer really produces, Hz
    pub fn actual_sample_rate_hz(&self) -> f64 {
        self.actual_rate_hz
    }

    /// Actual sample rate after decimation, the time base of all statistics
    pub fn effective_rate_hz(&self) -> f64 {
        self.actual_rate_hz / f64::from(self.config.acquisition.decimation)
    }

    pub fn mode(&self) -> OversampleMode {
        *self.mode.lock()
    }

    /// Handler to attach to the bus interrupt
    pub fn interrupt_handler(&self) -> Arc<InterruptHandler> {
        Arc::clone(&self.handler)
    }

    pub fn query(&self) -> &PulseQuery {
        &self.query
    }

    /// Receive a notice after every stored pulse
    pub fn subscribe(&self) -> Receiver<PulseNotice> {
        self.ready.subscribe()
    }

    /// Takes effect from the next pulse processed
    pub fn set_calibration(&self, channel: usize, scale: f32) -> DigitizerResult<()> {
        self.calibration.set(channel, scale)
    }

    pub fn calibration(&self, channel: usize) -> DigitizerResult<f32> {
        self.calibration.get(channel)
    }

    /// Switch the input filter without stopping acquisition
    ///
    /// 32x modes toggle between band pass and low pass; 16x mode is low
    /// pass only.
    pub fn set_filter(&self, filter: Filter) -> DigitizerResult<()> {
        let configured = self.config.acquisition.mode();
        let next = match (configured, filter) {
            (OversampleMode::LowPass16x, Filter::LowPass) => OversampleMode::LowPass16x,
            (OversampleMode::LowPass16x, Filter::BandPass) => {
                return Err(DigitizerError::InvalidFilter {
                    requested: filter.name(),
                    mode: configured.name(),
                })
            }
            (_, Filter::BandPass) => OversampleMode::BandPass32x,
            (_, Filter::LowPass) => OversampleMode::LowPass32x,
        };

        let mut mode = self.mode.lock();
        let ctrl = (self.regs.read_control() & !control::ADC_MODE_MASK) | next.control_bits();
        self.regs.write_control(ctrl);
        *mode = next;
        info!(filter = filter.name(), "input filter changed");
        Ok(())
    }

    /// Forget every recorded pulse; queries report no data until the next one
    ///
    /// Sequence numbers keep counting across the reset.
    pub fn clear_history(&self) {
        self.history.clear();
        info!(device = %self.config.acquisition.name, "pulse history cleared");
    }

    /// Triggers per second over `elapsed`; resets the trigger count
    pub fn trigger_rate(&self, elapsed: Duration) -> f64 {
        let count = self.counters.take_triggers();
        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        (self.config.acquisition.steps as u64 * count) as f64 / secs
    }

    pub fn report(&self) -> DeviceReport {
        let acq = &self.config.acquisition;
        let mode = self.mode();
        DeviceReport {
            name: acq.name.clone(),
            channels: acq.channels,
            samples: acq.samples,
            steps: acq.steps,
            decimation: acq.decimation,
            requested_hz: acq.clock_hz,
            actual_hz: self.actual_rate_hz,
            effective_rate_hz: self.effective_rate_hz(),
            mode,
            filter: mode.filter(),
            trigger_source: acq.trigger_source,
            clock_source: acq.clock_source,
            transport: acq.transport,
            synthesizer: self.synthesizer,
            triggers: self.counters.triggers(),
            pulses_recorded: self.history.appended(),
            history_len: self.history.len(),
            history_capacity: self.history.capacity(),
            history_full: self.history.is_full(),
            spurious_interrupts: self.counters.spurious(),
            transfer_errors: self.counters.transfer_errors(),
            missed_copies: self.counters.missed_copies(),
            running: self.is_running(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Stop the card and the worker
    ///
    /// Wakes the worker with the stop flag set and joins it, then masks
    /// every interrupt source and disables acquisition. A pulse in flight is
    /// still recorded but the card is not re-armed. Idempotent. Queries keep
    /// working on the recorded history afterwards.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };

        self.stop.store(true, Ordering::Release);
        self.signal.signal();
        let joined = handle.join();

        self.regs.write_interrupt_mask(0);
        {
            let _control = self.mode.lock();
            self.regs.clear_control_bits(control::ACQ_ENABLE);
        }
        let _ = self.regs.read_status();

        if joined.is_err() {
            error!(device = %self.config.acquisition.name, "processing worker panicked");
        } else {
            debug!(device = %self.config.acquisition.name, "digitizer stopped");
        }
    }
}

impl Drop for DigitizerDevice {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for DigitizerDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigitizerDevice")
            .field("name", &self.config.acquisition.name)
            .field("actual_rate_hz", &self.actual_rate_hz)
            .field("mode", &self.mode())
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::simulator::SimulatedBoard;

    fn config() -> DigitizerConfig {
        let mut config = DigitizerConfig::default();
        config.timing = TimingConfig::immediate();
        config
    }

    #[test]
    fn test_absent_board_is_rejected() {
        let result = DigitizerDevice::create(config(), Arc::new(SimulatedBoard::absent()));
        assert!(matches!(result, Err(DigitizerError::HardwareNotPresent { .. })));
    }

    #[test]
    fn test_invalid_config_touches_nothing() {
        let board = Arc::new(SimulatedBoard::new());
        let mut config = config();
        config.acquisition.channels = 3;

        let result = DigitizerDevice::create(config, board.clone());
        assert!(matches!(
            result,
            Err(DigitizerError::Configuration { field: "channels", .. })
        ));
        assert_eq!(board.snapshot().board_resets, 0);
    }

    #[test]
    fn test_filter_toggle_in_32x_mode() {
        let board = Arc::new(SimulatedBoard::new());
        let device = DigitizerDevice::create(config(), board.clone()).unwrap();
        assert_eq!(device.mode(), OversampleMode::LowPass32x);

        device.set_filter(Filter::BandPass).unwrap();
        assert_eq!(device.mode(), OversampleMode::BandPass32x);
        assert_eq!(board.snapshot().control & control::ADC_MODE_MASK, control::ADC_MODE_32_BANDPASS);

        device.set_filter(Filter::LowPass).unwrap();
        assert_eq!(board.snapshot().control & control::ADC_MODE_MASK, control::ADC_MODE_32_LOWPASS);
        assert_ne!(board.snapshot().control & control::ACQ_ENABLE, 0);
    }

    #[test]
    fn test_start_strobe_waits_for_filter_change() {
        let board = Arc::new(SimulatedBoard::new());
        let device = DigitizerDevice::create(config(), board.clone()).unwrap();
        let notices = device.subscribe();
        let before = board.snapshot().software_triggers;

        let guard = device.mode.lock();
        board.capture(&vec![0; device.config().acquisition.frame_len()]);
        device.interrupt_handler().service();

        // the worker is parked on the control lock before its strobe
        assert!(notices.recv_timeout(Duration::from_millis(100)).is_err());
        assert_eq!(board.snapshot().software_triggers, before);

        // a mode change made under the lock survives the strobe
        let ctrl = (board.read_control() & !control::ADC_MODE_MASK) | control::ADC_MODE_32_BANDPASS;
        board.write_control(ctrl);
        drop(guard);

        notices.recv_timeout(Duration::from_secs(2)).unwrap();
        let regs = board.snapshot();
        assert_eq!(regs.software_triggers, before + 1);
        assert_eq!(regs.control & control::ADC_MODE_MASK, control::ADC_MODE_32_BANDPASS);
    }

    #[test]
    fn test_band_pass_rejected_in_16x_mode() {
        let mut config = config();
        config.acquisition.clock_hz = 1_000_000;
        let device = DigitizerDevice::create(config, Arc::new(SimulatedBoard::new())).unwrap();

        assert_eq!(device.mode(), OversampleMode::LowPass16x);
        assert!(matches!(
            device.set_filter(Filter::BandPass),
            Err(DigitizerError::InvalidFilter { .. })
        ));
        assert!(device.set_filter(Filter::LowPass).is_ok());
    }

    #[test]
    fn test_trigger_rate_resets_count() {
        let board = Arc::new(SimulatedBoard::new());
        let device = DigitizerDevice::create(config(), board.clone()).unwrap();
        let notices = device.subscribe();

        for _ in 0..4 {
            board.capture(&vec![0; device.config().acquisition.frame_len()]);
            device.interrupt_handler().service();
            notices.recv_timeout(Duration::from_secs(2)).unwrap();
        }

        assert_eq!(device.trigger_rate(Duration::from_secs(2)), 2.0);
        assert_eq!(device.trigger_rate(Duration::from_secs(2)), 0.0);
        assert_eq!(device.trigger_rate(Duration::ZERO), 0.0);
    }

    #[test]
    fn test_report_levels() {
        let device = DigitizerDevice::create(config(), Arc::new(SimulatedBoard::new())).unwrap();
        let report = device.report();

        assert_eq!(report.channels, 4);
        assert!(report.running);
        assert_eq!(report.render(0).lines().count(), 1);
        assert!(report.render(1).contains("synthesizer"));
        assert!(report.render(2).contains("spurious interrupts: 0"));

        let json = report.to_json().unwrap();
        assert!(json.contains("\"actual_hz\""));
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let board = Arc::new(SimulatedBoard::new());
        let mut device = DigitizerDevice::create(config(), board.clone()).unwrap();

        device.shutdown();
        assert!(!device.is_running());
        assert_eq!(board.snapshot().interrupt_mask, 0);
        assert_eq!(board.snapshot().control & control::ACQ_ENABLE, 0);

        device.shutdown();
        assert_eq!(device.query().most_recent(), Err(DigitizerError::NoDataAvailable));
    }
}
