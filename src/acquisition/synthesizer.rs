// src/acquisition/synthesizer.rs
//! Sample clock synthesizer programming
//!
//! The synthesizer produces `REF * 2 * P / (Q * 2^M)` MHz. [`solve`] picks
//! the integers for a requested frequency; [`programming_steps`] turns the
//! resulting word into the bit-serial write sequence the card expects.

use crate::config::constants::synth::*;
use crate::error::{DigitizerError, DigitizerResult};
use crate::hal::OversampleMode;
use serde::Serialize;

/// Solved synthesizer setting
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SynthesizerWord {
    /// Output divider exponent, 0..=7
    pub m: u32,
    /// Feedback multiplier, 4..=130
    pub p: u32,
    /// Reference divider, 3..=128
    pub q: u32,
    /// VCO band index into the band code table
    pub band: usize,
    /// Packed program word, before zero stuffing
    pub word: u32,
    /// Frequency actually produced, MHz
    pub actual_mhz: f64,
}

impl SynthesizerWord {
    /// VCO frequency for this setting, MHz
    pub fn vco_mhz(&self) -> f64 {
        vco_output(self.p, self.q)
    }
}

/// Single register access while programming the synthesizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockStep {
    /// Write this value; the card latches its LSB
    Write(u32),
    /// Wait for the PLL to lock
    PllSettle,
}

fn vco_output(p: u32, q: u32) -> f64 {
    REFERENCE_MHZ * 2.0 * f64::from(p) / f64::from(q)
}

fn band_index(vco: f64) -> usize {
    let last = VCO_BANDS_MHZ.len() - 1;
    let mut i = 0;
    while VCO_BANDS_MHZ[i + 1] < vco && i < last - 1 {
        i += 1;
    }
    i
}

fn pack(m: u32, p: u32, q: u32, band: usize) -> u32 {
    (((p - 3) & 0x7f) << 15) | ((m & 0x7) << 11) | (((q - 2) & 0x7f) << 4) | (VCO_BAND_CODES[band] & 0xf)
}

/// Best reference divider for `p` at `vco`
///
/// The output falls monotonically with Q, so the optimum is one of the two
/// integers around the exact quotient, clamped to the legal range.
fn best_q(p: u32, vco: f64) -> (u32, f64) {
    let exact = REFERENCE_MHZ * 2.0 * f64::from(p) / vco;
    let clamp = |q: f64| (q.max(f64::from(Q_MIN)).min(f64::from(Q_MAX))) as u32;
    let low = clamp(exact.floor());
    let high = clamp(exact.ceil());

    let err_low = (vco - vco_output(p, low)).abs();
    let err_high = (vco - vco_output(p, high)).abs();
    if err_high < err_low {
        (high, err_high)
    } else {
        (low, err_low)
    }
}

/// Find M, P and Q for `target_mhz`
///
/// The target is doubled until it lands in the lowest VCO band, then every
/// P is scanned at that M and at each further doubling that stays inside
/// the top band. The setting with the smallest VCO error wins; ties keep
/// the first one found.
pub fn solve(target_mhz: f64) -> DigitizerResult<SynthesizerWord> {
    let fail = || DigitizerError::ClockProgramming { target_mhz };
    if !target_mhz.is_finite() || target_mhz <= 0.0 {
        return Err(fail());
    }

    let top = VCO_BANDS_MHZ[VCO_BANDS_MHZ.len() - 1];
    let mut m = 0u32;
    let mut vco = target_mhz;
    while vco < VCO_BANDS_MHZ[0] && m <= M_MAX {
        vco *= 2.0;
        m += 1;
    }
    if m > M_MAX || vco > top {
        return Err(fail());
    }

    // (m, band, p, q, err)
    let mut best: Option<(u32, usize, u32, u32, f64)> = None;
    loop {
        let band = band_index(vco);
        for p in P_MIN..=P_MAX {
            let (q, err) = best_q(p, vco);
            if best.map_or(true, |(.., best_err)| err < best_err) {
                best = Some((m, band, p, q, err));
            }
        }
        if vco * 2.0 > top || m == M_MAX {
            break;
        }
        vco *= 2.0;
        m += 1;
    }

    let (m, band, p, q, _) = best.ok_or_else(fail)?;
    Ok(SynthesizerWord {
        m,
        p,
        q,
        band,
        word: pack(m, p, q, band),
        actual_mhz: vco_output(p, q) / f64::from(1u32 << m),
    })
}

/// Solve the synthesizer for an ADC sample rate
///
/// Returns the word and the sample rate it really produces, in Hz.
pub fn solve_sample_rate(
    sample_rate_hz: u32,
    mode: OversampleMode,
) -> DigitizerResult<(SynthesizerWord, f64)> {
    let ratio = f64::from(mode.ratio());
    let word = solve(f64::from(sample_rate_hz) * ratio / 1.0e6)?;
    let actual_hz = word.actual_mhz * 1.0e6 / ratio;
    Ok((word, actual_hz))
}

/// Program word bits, LSB first, with a zero after every run of three ones
pub fn stuffed_program_bits(word: u32) -> Vec<bool> {
    let mut bits = Vec::with_capacity(PROGRAM_WORD_BITS as usize + 8);
    let mut ones = 0;
    for i in 0..PROGRAM_WORD_BITS {
        let bit = (word >> i) & 1 == 1;
        bits.push(bit);
        ones = if bit { ones + 1 } else { 0 };
        if ones == STUFF_AFTER_ONES {
            bits.push(false);
            ones = 0;
        }
    }
    bits
}

fn control_word(steps: &mut Vec<ClockStep>, mut value: u32) {
    for _ in 0..CONTROL_WORD_BITS {
        steps.push(ClockStep::Write(value));
        value >>= 1;
    }
}

/// Full register write sequence for one program word
pub fn programming_steps(word: u32) -> Vec<ClockStep> {
    let mut steps = Vec::with_capacity(3 * CONTROL_WORD_BITS as usize + 32);

    control_word(&mut steps, CONTROL_LOAD);

    let mut ones = 0;
    let mut value = word;
    for _ in 0..PROGRAM_WORD_BITS {
        steps.push(ClockStep::Write(value));
        ones = if value & 1 == 1 { ones + 1 } else { 0 };
        if ones == STUFF_AFTER_ONES {
            steps.push(ClockStep::Write(0));
            ones = 0;
        }
        value >>= 1;
    }

    control_word(&mut steps, CONTROL_LATCH);
    steps.push(ClockStep::PllSettle);
    control_word(&mut steps, CONTROL_RUN);
    steps
}
