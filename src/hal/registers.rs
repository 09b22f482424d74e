// src/hal/registers.rs
//! Register block abstraction for the ADC card

/// Status register bits
pub mod status {
    /// Block transfer engine finished or failed
    pub const TRANSFER: u32 = 0x0001;
    /// Acquisition of the configured frame count completed
    pub const ADC_COMPLETE: u32 = 0x0002;
    pub const P2: u32 = 0x0004;
    /// Bus interrupt pending, always TRANSFER | ADC_COMPLETE
    pub const BUS: u32 = 0x0008;
}

/// Interrupt mask register bits
pub mod irq {
    pub const TRANSFER: u32 = 0x0001;
    pub const ADC_COMPLETE: u32 = 0x0002;
    /// Sources the driver ever enables
    pub const DRIVER_SOURCES: u32 = TRANSFER | ADC_COMPLETE;
}

/// Control register bits
pub mod control {
    pub const TRIGGER_EXTERNAL: u32 = 0x0001;
    pub const CLOCK_EXTERNAL: u32 = 0x0002;
    pub const SAMPLE_MASTER: u32 = 0x0040;
    pub const CLOCK_TERMINATION: u32 = 0x0080;
    pub const ADC_MODE_32_BANDPASS: u32 = 0x0000;
    pub const ADC_MODE_32_LOWPASS: u32 = 0x0400;
    pub const ADC_MODE_16_LOWPASS: u32 = 0x0C00;
    pub const ADC_MODE_MASK: u32 = 0x0C00;
    /// Capture mode, cleared means continuous
    pub const CAPTURE: u32 = 0x1000;
    /// Software trigger
    pub const ACQ_START: u32 = 0x2000;
    pub const ACQ_ENABLE: u32 = 0x4000;
}

/// Block transfer status bits
pub mod transfer {
    pub const CHANNEL_ERROR: u32 = 0x0001_0000;
    pub const READ_MODIFY_WRITE_ERROR: u32 = 0x0000_2000;
    pub const DMA_LOCAL_BUS_ERROR: u32 = 0x0000_0020;
    pub const LOCAL_BUS_ERROR: u32 = 0x0000_0008;
    pub const BUS_ERROR: u32 = 0x0000_0004;
    pub const DONE: u32 = 0x0000_0002;

    pub const ERROR_MASK: u32 =
        CHANNEL_ERROR | READ_MODIFY_WRITE_ERROR | DMA_LOCAL_BUS_ERROR | LOCAL_BUS_ERROR | BUS_ERROR;

    /// Error bits with their log labels
    pub const ERRORS: [(u32, &str); 5] = [
        (CHANNEL_ERROR, "CERR"),
        (READ_MODIFY_WRITE_ERROR, "RMCERR"),
        (DMA_LOCAL_BUS_ERROR, "DLBERR"),
        (LOCAL_BUS_ERROR, "LBERR"),
        (BUS_ERROR, "VBERR"),
    ];
}

/// Bus-mapped register block of one ADC card
///
/// Implementations must be callable from interrupt context for the
/// status, mask, transfer and interrupt-line methods: no blocking, no
/// allocation.
pub trait RegisterBlock: Send + Sync {
    /// Check whether the card answers at its base address
    fn probe(&self) -> bool;

    /// Reset the whole board; no interrupt, no acquisition afterwards
    fn reset_board(&self);

    /// Reset the ADC, reloading decimation, buffer length and counts
    fn reset_adc(&self);

    fn read_status(&self) -> u32;

    fn read_interrupt_mask(&self) -> u32;

    fn write_interrupt_mask(&self, mask: u32);

    fn read_control(&self) -> u32;

    fn write_control(&self, value: u32);

    /// Channel count register, programmed as C - 1
    fn write_channel_count(&self, value: u32);

    /// Buffer length register, programmed as C*S*T / 2 - 1
    fn write_buffer_length(&self, value: u32);

    /// Frames per acquisition, programmed as S
    fn write_acquisition_count(&self, value: u32);

    /// Decimation register, programmed as D - 1
    fn write_decimation(&self, value: u32);

    /// Synthesizer programming register; the LSB is the serial data bit
    fn write_clock(&self, value: u32);

    /// Pop one FIFO word: even channel in the high half, odd in the low half
    fn read_fifo(&self) -> u32;

    /// Copy the completed capture buffer into `dest`
    ///
    /// Completion is reported through the transfer status register and
    /// the transfer interrupt source.
    fn block_copy(&self, dest: &mut [i16]);

    fn read_transfer_status(&self) -> u32;

    fn clear_transfer_status(&self);

    /// Re-enable the bus interrupt line after acknowledge
    fn enable_interrupt_line(&self);

    /// Set bits in the interrupt mask
    fn enable_interrupts(&self, bits: u32) {
        self.write_interrupt_mask(self.read_interrupt_mask() | bits);
    }

    /// Clear bits in the interrupt mask
    fn disable_interrupts(&self, bits: u32) {
        self.write_interrupt_mask(self.read_interrupt_mask() & !bits);
    }

    /// Set bits in the control register
    fn set_control_bits(&self, bits: u32) {
        self.write_control(self.read_control() | bits);
    }

    /// Clear bits in the control register
    fn clear_control_bits(&self, bits: u32) {
        self.write_control(self.read_control() & !bits);
    }
}
