// src/acquisition/interrupt.rs
//! Interrupt service routine
//!
//! [`InterruptHandler::service`] runs in interrupt context. It only touches
//! registers, atomics and the pre-allocated frame slots; it never blocks,
//! allocates or does floating point work. Anything unusual is only counted;
//! the worker logs it on its next pass.

use crate::acquisition::event::EventSignal;
use crate::acquisition::frames::FrameArena;
use crate::hal::registers::{irq, status, transfer, RegisterBlock};
use crate::hal::Transport;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// Why the worker was woken, as status register bits
pub mod wake {
    use crate::hal::registers::status;

    /// Frame waiting in the FIFO
    pub const FIFO_READY: u32 = status::ADC_COMPLETE;
    /// Frame waiting in the worker frame slot
    pub const FRAME_READY: u32 = status::TRANSFER;
    pub const ANY: u32 = FIFO_READY | FRAME_READY;
}

/// Counters shared between the handler, the worker and the controller
#[derive(Debug, Default)]
pub struct InterruptCounters {
    triggers: AtomicU64,
    spurious: AtomicU64,
    transfer_errors: AtomicU64,
    missed_copies: AtomicU64,
    transfer_error_bits: AtomicU32,
    wake_cause: AtomicU32,
}

impl InterruptCounters {
    /// Triggers since the last call; resets the count
    pub fn take_triggers(&self) -> u64 {
        self.triggers.swap(0, Ordering::AcqRel)
    }

    pub fn triggers(&self) -> u64 {
        self.triggers.load(Ordering::Acquire)
    }

    /// Interrupts or wakeups with no recognised source
    pub fn spurious(&self) -> u64 {
        self.spurious.load(Ordering::Acquire)
    }

    pub fn transfer_errors(&self) -> u64 {
        self.transfer_errors.load(Ordering::Acquire)
    }

    /// Block copies skipped because the target slot was busy
    pub fn missed_copies(&self) -> u64 {
        self.missed_copies.load(Ordering::Acquire)
    }

    pub(crate) fn note_spurious(&self) {
        self.spurious.fetch_add(1, Ordering::AcqRel);
    }

    /// Transfer error bits seen since the last call
    pub(crate) fn take_transfer_error_bits(&self) -> u32 {
        self.transfer_error_bits.swap(0, Ordering::AcqRel)
    }

    pub(crate) fn take_wake_cause(&self) -> u32 {
        self.wake_cause.swap(0, Ordering::AcqRel)
    }

    fn add_wake_cause(&self, bits: u32) {
        self.wake_cause.fetch_or(bits, Ordering::AcqRel);
    }
}

/// Interrupt context half of a device
pub struct InterruptHandler {
    regs: Arc<dyn RegisterBlock>,
    transport: Transport,
    frames: Arc<FrameArena>,
    signal: EventSignal,
    counters: Arc<InterruptCounters>,
}

impl InterruptHandler {
    pub fn new(
        regs: Arc<dyn RegisterBlock>,
        transport: Transport,
        frames: Arc<FrameArena>,
        signal: EventSignal,
        counters: Arc<InterruptCounters>,
    ) -> Self {
        Self {
            regs,
            transport,
            frames,
            signal,
            counters,
        }
    }

    /// Service one bus interrupt
    pub fn service(&self) {
        let pending = self.regs.read_status() & self.regs.read_interrupt_mask();

        if pending & irq::DRIVER_SOURCES == 0 {
            self.counters.note_spurious();
            // drop any foreign source somebody enabled
            let mask = self.regs.read_interrupt_mask();
            self.regs.write_interrupt_mask(mask & irq::DRIVER_SOURCES);
        }

        if pending & status::ADC_COMPLETE != 0 {
            self.on_adc_complete();
        }

        if pending & status::TRANSFER != 0 {
            self.on_transfer();
        }

        self.regs.enable_interrupt_line();
    }

    fn on_adc_complete(&self) {
        // stays masked until the worker has drained the frame
        self.regs.disable_interrupts(irq::ADC_COMPLETE);
        self.counters.triggers.fetch_add(1, Ordering::AcqRel);

        match self.transport {
            Transport::Fifo => self.wake(wake::FIFO_READY),
            Transport::BlockCopy => match self.frames.try_hardware_frame() {
                Some(mut frame) => self.regs.block_copy(&mut frame),
                None => {
                    // worker drains the FIFO itself
                    self.counters.missed_copies.fetch_add(1, Ordering::AcqRel);
                    self.wake(wake::FIFO_READY);
                }
            },
        }
    }

    fn on_transfer(&self) {
        let dcsr = self.regs.read_transfer_status();

        let errors = dcsr & transfer::ERROR_MASK;
        if errors != 0 {
            self.counters
                .transfer_errors
                .fetch_add(u64::from(errors.count_ones()), Ordering::AcqRel);
            self.counters
                .transfer_error_bits
                .fetch_or(errors, Ordering::AcqRel);
        }

        if dcsr & transfer::DONE != 0 {
            match self.transport {
                Transport::BlockCopy => {
                    self.frames.hand_over();
                    self.wake(wake::FRAME_READY);
                }
                // completion without a block copy
                Transport::Fifo => self.counters.note_spurious(),
            }
        }

        self.regs.clear_transfer_status();
    }

    fn wake(&self, cause: u32) {
        self.counters.add_wake_cause(cause);
        self.signal.signal();
    }

    pub fn counters(&self) -> &Arc<InterruptCounters> {
        &self.counters
    }
}

impl std::fmt::Debug for InterruptHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterruptHandler")
            .field("transport", &self.transport)
            .field("counters", &self.counters)
            .finish()
    }
}
