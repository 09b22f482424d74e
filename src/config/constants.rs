// src/config/constants.rs
//! Hardware limits and driver defaults

/// Sampling limits of the ADC card
pub mod adc {
    pub const MIN_SAMPLE_RATE_HZ: u32 = 32_000;
    /// Above this rate only 16x oversampling is possible
    pub const MID_SAMPLE_RATE_HZ: u32 = 600_000;
    pub const MAX_SAMPLE_RATE_HZ: u32 = 1_200_000;

    pub const MIN_CHANNELS: usize = 2;
    pub const MAX_CHANNELS: usize = 32;

    /// Samples per FIFO bank
    pub const MAX_BUFFER_SAMPLES: usize = 0x10_0000;

    pub const MIN_DECIMATION: u32 = 1;
    pub const MAX_DECIMATION: u32 = 256;

    pub const DEFAULT_CHANNELS: usize = 4;
    pub const DEFAULT_SAMPLES: usize = 100;
    pub const DEFAULT_STEPS: usize = 1;
    pub const DEFAULT_DECIMATION: u32 = 1;
    pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 100_000;
}

/// Frequency synthesizer parameters
pub mod synth {
    /// Reference crystal frequency in MHz
    pub const REFERENCE_MHZ: f64 = 14.31818;

    /// VCO band edges in MHz, ascending
    pub const VCO_BANDS_MHZ: [f64; 3] = [50.0, 80.0, 150.0];
    /// Band select code programmed for each VCO band
    pub const VCO_BAND_CODES: [u32; 2] = [0, 8];

    pub const M_MAX: u32 = 7;
    pub const P_MIN: u32 = 4;
    pub const P_MAX: u32 = 130;
    pub const Q_MIN: u32 = 3;
    pub const Q_MAX: u32 = 128;

    /// Program word width before zero stuffing
    pub const PROGRAM_WORD_BITS: u32 = 22;
    pub const CONTROL_WORD_BITS: u32 = 14;
    pub const CONTROL_LOAD: u32 = 0x1e05;
    pub const CONTROL_LATCH: u32 = 0x1e04;
    pub const CONTROL_RUN: u32 = 0x1e00;
    /// A zero is stuffed after this many consecutive ones
    pub const STUFF_AFTER_ONES: u32 = 3;
}

/// History ring parameters
pub mod history {
    pub const DEFAULT_CAPACITY: usize = 800;
    pub const MIN_CAPACITY: usize = 2;
}

/// Timing defaults, all in milliseconds
pub mod timing {
    pub const DEFAULT_SETTLE_DELAY_MS: u64 = 50;
    pub const DEFAULT_CLOCK_BIT_DELAY_MS: u64 = 20;
    pub const DEFAULT_PLL_SETTLE_MS: u64 = 100;
    pub const MAX_DELAY_MS: u64 = 10_000;
}
