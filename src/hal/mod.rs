// src/hal/mod.rs
//! Hardware Abstraction Layer for the ADC card

pub mod registers;
pub mod types;
pub mod simulator;

pub use registers::RegisterBlock;
pub use types::*;
