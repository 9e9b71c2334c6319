//! iqcast core — real-time IQ sample pipeline for SDR transmit hardware

pub mod config;
pub mod device;
pub mod error;
pub mod pipeline;
pub mod source;
pub mod types;

pub use types::*;
