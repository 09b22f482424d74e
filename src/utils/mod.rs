//! Common utilities for the digitizer driver

pub mod time;

pub use time::{
    current_timestamp_nanos,
    MockTimeProvider,
    MonotonicTimeProvider,
    SystemTimeProvider,
    TimeProvider,
};
