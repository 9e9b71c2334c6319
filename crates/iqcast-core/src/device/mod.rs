//! Transmit backends
//!
//! A backend owns the hardware (or file) endpoint and the streaming loop:
//! it calls `TxFeeder::fill` with a fixed-size destination buffer, ships
//! each filled block out, and terminates when the feeder answers `Stop`.
//!
//! - `FileSink`: always built; writes device-format blocks to a file or
//!   stdout for offline use and testing.
//! - `BladerfTx`: libbladeRF FFI transmit path, behind the `bladerf`
//!   feature so the workspace builds without the vendor library.

mod backend;
mod file;

#[cfg(feature = "bladerf")]
mod bladerf;

pub use backend::TxBackend;
pub use file::FileSink;

#[cfg(feature = "bladerf")]
pub use bladerf::{list_devices, BladerfInfo, BladerfTx};
