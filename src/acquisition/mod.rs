// src/acquisition/mod.rs
//! Acquisition driver: interrupt handling, pulse processing and history

pub mod calibration;
pub mod controller;
pub mod event;
pub mod frames;
pub mod history;
pub mod interrupt;
pub mod notify;
pub mod processing;
pub mod query;
pub mod record;
pub mod synthesizer;
mod worker;

pub use calibration::CalibrationTable;
pub use controller::{DeviceReport, DigitizerDevice};
pub use history::HistoryStore;
pub use interrupt::{InterruptCounters, InterruptHandler};
pub use processing::{channel_stats, ChannelStats, PulseProcessor};
pub use query::PulseQuery;
pub use record::{ChannelData, PulseNotice, PulseRecord, Stamped};
pub use synthesizer::SynthesizerWord;
