//! Common trait for transmit backends

use crate::error::DeviceResult;
use crate::pipeline::TxFeeder;

/// A transmit endpoint that drives the consumer side of the pipeline.
///
/// `stream` runs the backend's streaming loop on the calling thread,
/// invoking the feeder strictly serially (never two invocations in
/// flight), and returns once the feeder reports `Stop` or the device
/// fails. Returns the number of blocks streamed.
pub trait TxBackend {
    fn stream(&mut self, feeder: &mut TxFeeder) -> DeviceResult<u64>;
}
