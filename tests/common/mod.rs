// tests/common/mod.rs
//! Shared helpers for driving a simulated card

#![allow(dead_code)]

use digitizer_core::acquisition::PulseNotice;
use digitizer_core::config::{AcquisitionConfig, DigitizerConfig, TimingConfig};
use digitizer_core::hal::registers::irq;
use digitizer_core::hal::simulator::SimulatedBoard;
use digitizer_core::hal::{OversampleMode, RegisterBlock, TriggerSource};
use digitizer_core::DigitizerDevice;
use crossbeam::channel::Receiver;
use std::sync::Arc;
use std::time::Duration;

pub const NOTICE_TIMEOUT: Duration = Duration::from_secs(5);

/// Internal trigger, FIFO transport, no delays
pub fn test_config(channels: usize, samples: usize) -> DigitizerConfig {
    DigitizerConfig {
        acquisition: AcquisitionConfig {
            name: "test-card".to_string(),
            channels,
            samples,
            steps: 1,
            decimation: 1,
            clock_hz: 100_000,
            oversample_mode: Some(OversampleMode::LowPass32x),
            trigger_source: TriggerSource::Internal,
            ..AcquisitionConfig::default()
        },
        timing: TimingConfig::immediate(),
        ..DigitizerConfig::default()
    }
}

pub struct Rig {
    pub board: Arc<SimulatedBoard>,
    pub device: DigitizerDevice,
    pub notices: Receiver<PulseNotice>,
}

impl Rig {
    pub fn new(config: DigitizerConfig) -> Self {
        let board = Arc::new(SimulatedBoard::new());
        let device = DigitizerDevice::create(config, board.clone()).expect("device creation");
        let notices = device.subscribe();
        Self { board, device, notices }
    }

    /// Run the handler for as long as an enabled source is pending
    pub fn pump(&self) {
        let handler = self.device.interrupt_handler();
        for _ in 0..4 {
            let pending =
                self.board.read_status() & self.board.read_interrupt_mask() & irq::DRIVER_SOURCES;
            if pending == 0 {
                break;
            }
            handler.service();
        }
    }

    /// Deliver one frame and wait until the worker has stored it
    pub fn fire(&self, frame: &[i16]) -> PulseNotice {
        self.board.capture(frame);
        self.pump();
        self.notices
            .recv_timeout(NOTICE_TIMEOUT)
            .expect("worker did not report the pulse")
    }
}

/// Every channel a linear ramp: sample s of channel c is `k * (c + 1) * (s + 1)`
pub fn ramp_frame(channels: usize, samples: usize, k: i16) -> Vec<i16> {
    let mut frame = Vec::with_capacity(channels * samples);
    for s in 0..samples {
        for c in 0..channels {
            frame.push(k * (c as i16 + 1) * (s as i16 + 1));
        }
    }
    frame
}

/// Every sample of every channel set to `value`
pub fn marker_frame(channels: usize, samples: usize, value: i16) -> Vec<i16> {
    vec![value; channels * samples]
}
