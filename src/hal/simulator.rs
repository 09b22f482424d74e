//! In-memory register block for tests and the demo binary
//!
//! `SimulatedBoard` models the parts of the card the driver touches: the
//! status/mask/control registers, the packed FIFO, the block transfer engine
//! and the synthesizer serial port. It never raises interrupts by itself;
//! the caller loads a frame with [`SimulatedBoard::capture`] and then runs
//! the interrupt handler, the way the bus would.

use crate::hal::registers::{control, status, transfer, RegisterBlock};
use parking_lot::Mutex;
use rand::Rng;
use std::collections::VecDeque;

/// Register-level view of the simulated card
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardSnapshot {
    pub status: u32,
    pub interrupt_mask: u32,
    pub control: u32,
    pub channel_count: u32,
    pub buffer_length: u32,
    pub acquisition_count: u32,
    pub decimation: u32,
    pub transfer_status: u32,
    pub fifo_words: usize,
    pub board_resets: u32,
    pub adc_resets: u32,
    pub software_triggers: u32,
    pub interrupt_line_enables: u32,
    pub block_copies: u32,
}

#[derive(Debug, Default)]
struct BoardState {
    regs: BoardSnapshot,
    clock_writes: Vec<u32>,
    fifo: VecDeque<u32>,
    capture: Vec<i16>,
}

/// Simulated ADC card
#[derive(Debug)]
pub struct SimulatedBoard {
    present: bool,
    state: Mutex<BoardState>,
}

impl Default for SimulatedBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBoard {
    /// A card that answers the probe
    pub fn new() -> Self {
        Self {
            present: true,
            state: Mutex::new(BoardState::default()),
        }
    }

    /// An empty slot: the probe fails
    pub fn absent() -> Self {
        Self {
            present: false,
            state: Mutex::new(BoardState::default()),
        }
    }

    /// Complete an acquisition with `frame` (sample-major, channel-interleaved)
    ///
    /// Fills the FIFO two channels per word and raises the ADC-complete
    /// status bit.
    pub fn capture(&self, frame: &[i16]) {
        let mut state = self.state.lock();
        state.fifo.clear();
        for pair in frame.chunks(2) {
            let high = pair[0] as u16 as u32;
            let low = pair.get(1).map_or(0, |v| *v as u16 as u32);
            state.fifo.push_back((high << 16) | low);
        }
        state.capture.clear();
        state.capture.extend_from_slice(frame);
        state.regs.status |= status::ADC_COMPLETE | status::BUS;
    }

    /// Force raw status bits, e.g. to model a spurious interrupt source
    pub fn raise_status(&self, bits: u32) {
        self.state.lock().regs.status |= bits;
    }

    /// Force raw transfer status bits
    pub fn raise_transfer_status(&self, bits: u32) {
        let mut state = self.state.lock();
        state.regs.transfer_status |= bits;
        state.regs.status |= status::TRANSFER | status::BUS;
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        let state = self.state.lock();
        let mut regs = state.regs.clone();
        regs.fifo_words = state.fifo.len();
        regs
    }

    /// Serial data bits written to the synthesizer port, in write order
    pub fn clock_bits(&self) -> Vec<bool> {
        self.state
            .lock()
            .clock_writes
            .iter()
            .map(|value| value & 1 == 1)
            .collect()
    }

    /// Build one synthetic pulse frame
    ///
    /// Every channel carries a triangular pulse peaking at `peak_index`
    /// scaled by `amplitude * (channel + 1)`, plus uniform noise of
    /// `noise` counts.
    pub fn synthetic_pulse(
        channels: usize,
        samples: usize,
        peak_index: usize,
        amplitude: i16,
        noise: i16,
    ) -> Vec<i16> {
        let mut rng = rand::thread_rng();
        let width = (samples / 4).max(1) as f64;
        let mut frame = Vec::with_capacity(channels * samples);
        for sample in 0..samples {
            let distance = (sample as f64 - peak_index as f64).abs();
            let shape = (1.0 - distance / width).max(0.0);
            for channel in 0..channels {
                let scale = f64::from(amplitude) * (channel + 1) as f64;
                let jitter = if noise > 0 { rng.gen_range(-noise..=noise) } else { 0 };
                let value = (shape * scale).round() as i32 + i32::from(jitter);
                frame.push(value.clamp(i16::MIN as i32, i16::MAX as i32) as i16);
            }
        }
        frame
    }
}

impl RegisterBlock for SimulatedBoard {
    fn probe(&self) -> bool {
        self.present
    }

    fn reset_board(&self) {
        let mut state = self.state.lock();
        let resets = state.regs.board_resets + 1;
        state.regs.status = 0;
        state.regs.interrupt_mask = 0;
        state.regs.control = 0;
        state.regs.transfer_status = 0;
        state.regs.board_resets = resets;
        state.fifo.clear();
    }

    fn reset_adc(&self) {
        let mut state = self.state.lock();
        state.regs.status &= !(status::ADC_COMPLETE | status::BUS);
        state.regs.adc_resets += 1;
        state.fifo.clear();
    }

    fn read_status(&self) -> u32 {
        self.state.lock().regs.status
    }

    fn read_interrupt_mask(&self) -> u32 {
        self.state.lock().regs.interrupt_mask
    }

    fn write_interrupt_mask(&self, mask: u32) {
        self.state.lock().regs.interrupt_mask = mask;
    }

    fn read_control(&self) -> u32 {
        self.state.lock().regs.control
    }

    fn write_control(&self, value: u32) {
        let mut state = self.state.lock();
        if value & control::ACQ_START != 0 {
            state.regs.software_triggers += 1;
        }
        // The start bit is a strobe and reads back as zero
        state.regs.control = value & !control::ACQ_START;
    }

    fn write_channel_count(&self, value: u32) {
        self.state.lock().regs.channel_count = value;
    }

    fn write_buffer_length(&self, value: u32) {
        self.state.lock().regs.buffer_length = value;
    }

    fn write_acquisition_count(&self, value: u32) {
        self.state.lock().regs.acquisition_count = value;
    }

    fn write_decimation(&self, value: u32) {
        self.state.lock().regs.decimation = value;
    }

    fn write_clock(&self, value: u32) {
        self.state.lock().clock_writes.push(value);
    }

    fn read_fifo(&self) -> u32 {
        self.state.lock().fifo.pop_front().unwrap_or(0)
    }

    fn block_copy(&self, dest: &mut [i16]) {
        let mut state = self.state.lock();
        let len = dest.len().min(state.capture.len());
        dest[..len].copy_from_slice(&state.capture[..len]);
        state.fifo.clear();
        state.regs.block_copies += 1;
        state.regs.transfer_status |= transfer::DONE;
        state.regs.status |= status::TRANSFER | status::BUS;
    }

    fn read_transfer_status(&self) -> u32 {
        self.state.lock().regs.transfer_status
    }

    fn clear_transfer_status(&self) {
        let mut state = self.state.lock();
        state.regs.transfer_status = 0;
        state.regs.status &= !status::TRANSFER;
    }

    fn enable_interrupt_line(&self) {
        self.state.lock().regs.interrupt_line_enables += 1;
    }
}
