//! Sample pipeline — ring buffer, gain conversion, reader task, transmit feeder
//!
//! This module contains the real-time core of iqcast:
//! - BlockRing: bounded circular store of converted sample blocks
//! - GainControl: soft gain + AGC float-to-device-format conversion
//! - reader task: background thread ingesting and converting raw blocks
//! - TxFeeder: the consumer side handed to a transmit backend's callback
//! - Pipeline: lifecycle controller tying start and shutdown together
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐              ┌─────────────────────┐
//! │   Reader Thread  │──publish()──►│      BlockRing      │
//! │ (read + convert) │              │  (N blocks, SPSC)   │
//! └──────────────────┘              └──────────┬──────────┘
//!          ▲                                   │ fill()
//!          │ SampleSource                      ▼
//! ┌──────────────────┐              ┌─────────────────────┐
//! │  Input (file /   │              │   Backend Thread    │
//! │  stdin stream)   │              │ (device callback)   │
//! └──────────────────┘              └─────────────────────┘
//! ```
//!
//! Exactly two execution contexts touch the ring: the reader thread and the
//! backend's serialized callback. Both may block on the ring; a terminal
//! lifecycle transition wakes every waiter in both directions.

mod controller;
mod feeder;
mod gain;
mod lifecycle;
mod reader;
mod ring;

pub use controller::*;
pub use feeder::*;
pub use gain::*;
pub use lifecycle::*;
pub use ring::*;
