// src/acquisition/worker.rs
//! Processing worker: one pass per completed acquisition

use crate::acquisition::calibration::CalibrationTable;
use crate::acquisition::event::EventWaiter;
use crate::acquisition::frames::FrameArena;
use crate::acquisition::history::HistoryStore;
use crate::acquisition::interrupt::{wake, InterruptCounters};
use crate::acquisition::notify::DataReady;
use crate::acquisition::processing::PulseProcessor;
use crate::acquisition::record::PulseNotice;
use crate::hal::registers::{control, irq, transfer, RegisterBlock};
use crate::hal::{OversampleMode, TriggerSource};
use crate::utils::time::TimeProvider;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn, Level};

/// State owned by the worker thread
pub(crate) struct PulseWorker {
    pub(crate) regs: Arc<dyn RegisterBlock>,
    pub(crate) waiter: EventWaiter,
    pub(crate) stop: Arc<AtomicBool>,
    pub(crate) counters: Arc<InterruptCounters>,
    pub(crate) frames: Arc<FrameArena>,
    pub(crate) calibration: Arc<CalibrationTable>,
    pub(crate) history: Arc<HistoryStore>,
    pub(crate) ready: Arc<DataReady>,
    pub(crate) clock: Arc<dyn TimeProvider>,
    pub(crate) processor: PulseProcessor,
    pub(crate) trigger: TriggerSource,
    pub(crate) settle_delay: Duration,
    pub(crate) scales: Vec<f32>,
    /// Guards every control register write shared with the controller
    pub(crate) control: Arc<Mutex<OversampleMode>>,
    pub(crate) logged: LoggedFaults,
}

/// Interrupt anomaly counts already reported
#[derive(Debug, Default)]
pub(crate) struct LoggedFaults {
    spurious: u64,
    missed_copies: u64,
}

impl PulseWorker {
    /// Wait, process, re-arm, notify, until stopped
    pub(crate) fn run(mut self) {
        debug!("processing worker started");
        loop {
            self.waiter.wait();
            self.log_interrupt_faults();
            if self.stop.load(Ordering::Acquire) {
                break;
            }

            let cause = self.counters.take_wake_cause();
            if cause & wake::ANY == 0 {
                self.counters.note_spurious();
                warn!(cause, "worker woken without a completed frame");
                self.logged.spurious = self.counters.spurious();
                continue;
            }

            let notice = self.handle_pulse(cause);
            self.rearm();
            self.ready.publish(notice);
        }
        info!("processing worker stopped");
    }

    fn handle_pulse(&mut self, cause: u32) -> PulseNotice {
        self.calibration.snapshot_into(&mut self.scales);
        let timestamp = self.clock.now_nanos();

        let record = {
            let mut frame = self.frames.worker_frame();
            if cause & wake::FRAME_READY == 0 {
                read_fifo_frame(self.regs.as_ref(), &mut frame);
            }
            if tracing::enabled!(Level::TRACE) {
                let channels = self.processor.channels();
                trace!(first_row = ?&frame[..channels.min(frame.len())], "raw frame");
            }
            self.processor.process(&frame, &self.scales, timestamp)
        };

        let sequence = self.history.append(record);
        debug!(sequence, timestamp, "pulse recorded");
        PulseNotice { sequence, timestamp }
    }

    /// Report what the interrupt handler counted since the last pass
    fn log_interrupt_faults(&mut self) {
        let spurious = self.counters.spurious();
        if spurious > self.logged.spurious {
            warn!(
                count = spurious - self.logged.spurious,
                total = spurious,
                "interrupts with no driver source"
            );
            self.logged.spurious = spurious;
        }

        let missed = self.counters.missed_copies();
        if missed > self.logged.missed_copies {
            warn!(
                count = missed - self.logged.missed_copies,
                total = missed,
                "frame slot busy, fell back to FIFO read"
            );
            self.logged.missed_copies = missed;
        }

        let errors = self.counters.take_transfer_error_bits();
        for (bit, label) in transfer::ERRORS {
            if errors & bit != 0 {
                warn!(error = label, "block transfer error");
            }
        }
    }

    fn rearm(&self) {
        // a stopping device stays quiet
        if self.stop.load(Ordering::Acquire) {
            return;
        }

        self.regs.reset_adc();
        self.regs.enable_interrupts(irq::ADC_COMPLETE);
        if self.trigger == TriggerSource::Internal {
            if !self.settle_delay.is_zero() {
                std::thread::sleep(self.settle_delay);
            }
            let _control = self.control.lock();
            self.regs.set_control_bits(control::ACQ_START);
        }
        // flush posted writes
        let _ = self.regs.read_status();
    }
}

/// Drain one frame from the FIFO
///
/// Each word carries two channels: the even one in the high half, the odd
/// one in the low half.
pub(crate) fn read_fifo_frame(regs: &dyn RegisterBlock, frame: &mut [i16]) {
    for pair in frame.chunks_exact_mut(2) {
        let word = regs.read_fifo();
        pair[0] = (word >> 16) as u16 as i16;
        pair[1] = (word & 0xffff) as u16 as i16;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::event::pulse_event;
    use crate::acquisition::interrupt::InterruptHandler;
    use crate::hal::simulator::SimulatedBoard;
    use crate::hal::Transport;
    use crate::utils::time::MockTimeProvider;

    fn worker(board: Arc<SimulatedBoard>, counters: Arc<InterruptCounters>) -> PulseWorker {
        let (_signal, waiter) = pulse_event();
        PulseWorker {
            regs: board,
            waiter,
            stop: Arc::new(AtomicBool::new(false)),
            counters,
            frames: Arc::new(FrameArena::new(4)),
            calibration: Arc::new(CalibrationTable::new(2)),
            history: Arc::new(HistoryStore::new(4, 4)),
            ready: Arc::new(DataReady::new()),
            clock: Arc::new(MockTimeProvider::new(0)),
            processor: PulseProcessor::new(2, 2, 1000.0),
            trigger: TriggerSource::Internal,
            settle_delay: Duration::ZERO,
            scales: vec![1.0; 2],
            control: Arc::new(Mutex::new(OversampleMode::LowPass32x)),
            logged: LoggedFaults::default(),
        }
    }

    #[test]
    fn test_rearm_strobes_start() {
        let board = Arc::new(SimulatedBoard::new());
        let worker = worker(board.clone(), Arc::new(InterruptCounters::default()));
        worker.rearm();

        let regs = board.snapshot();
        assert_eq!(regs.adc_resets, 1);
        assert_eq!(regs.software_triggers, 1);
        assert_ne!(regs.interrupt_mask & irq::ADC_COMPLETE, 0);
    }

    #[test]
    fn test_rearm_skipped_once_stopping() {
        let board = Arc::new(SimulatedBoard::new());
        let worker = worker(board.clone(), Arc::new(InterruptCounters::default()));
        worker.stop.store(true, Ordering::Release);
        worker.rearm();

        let regs = board.snapshot();
        assert_eq!(regs.adc_resets, 0);
        assert_eq!(regs.software_triggers, 0);
        assert_eq!(regs.interrupt_mask, 0);
    }

    #[test]
    fn test_interrupt_faults_are_consumed_once() {
        let board = Arc::new(SimulatedBoard::new());
        let counters = Arc::new(InterruptCounters::default());
        let (signal, _waiter) = pulse_event();
        let handler = InterruptHandler::new(
            board.clone(),
            Transport::BlockCopy,
            Arc::new(FrameArena::new(4)),
            signal,
            Arc::clone(&counters),
        );
        board.write_interrupt_mask(irq::DRIVER_SOURCES);
        board.raise_transfer_status(transfer::CHANNEL_ERROR);
        handler.service();
        counters.note_spurious();

        let mut worker = worker(board, Arc::clone(&counters));
        worker.log_interrupt_faults();
        assert_eq!(worker.logged.spurious, 1);
        assert_eq!(counters.take_transfer_error_bits(), 0);
        assert_eq!(counters.transfer_errors(), 1);
    }

    #[test]
    fn test_fifo_words_unpack_high_then_low() {
        let board = SimulatedBoard::new();
        board.capture(&[-3, 7, 32767, -32768]);

        let mut frame = [0i16; 4];
        read_fifo_frame(&board, &mut frame);
        assert_eq!(frame, [-3, 7, 32767, -32768]);
    }
}
