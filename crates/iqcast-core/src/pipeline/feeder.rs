//! Consumer side: the handle a transmit backend drives from its callback
//!
//! The backend owns the real-time deadline, so this path is kept minimal:
//! one phase check, one blocking reserve, one copy. No allocation happens
//! here; the destination buffer belongs to the backend.

use std::sync::Arc;

use super::lifecycle::Phase;
use super::ring::BlockRing;

/// Outcome of one feeder callback invocation.
///
/// Models the backend's "return a filled buffer or a null pointer"
/// protocol as an explicit two-variant result: `Stop` tells the backend to
/// terminate streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    /// The destination buffer now holds one converted block
    Filled,
    /// No data will ever arrive again; stop streaming
    Stop,
}

/// Consumer handle pulling converted blocks out of the pipeline.
///
/// Invoked serially by the backend; the exclusive receiver makes a second
/// concurrent consumer unrepresentable.
pub struct TxFeeder {
    ring: Arc<BlockRing>,
}

impl TxFeeder {
    pub(super) fn new(ring: Arc<BlockRing>) -> Self {
        Self { ring }
    }

    /// Interleaved `i16` count the backend must size its buffers to
    pub fn block_len(&self) -> usize {
        self.ring.block_len()
    }

    /// Fill `dest` with the oldest converted block.
    ///
    /// Blocks while the ring is empty and the input is still alive.
    /// Returns `Stop` immediately on an external stop request (even if
    /// data remains), or once the input is exhausted and the ring has
    /// drained.
    pub fn fill(&mut self, dest: &mut [i16]) -> FeedStatus {
        assert_eq!(
            dest.len(),
            self.ring.block_len(),
            "destination size is fixed at stream setup"
        );

        // Forced stop takes priority over buffered data
        if self.ring.phase() == Phase::StopRequested {
            return FeedStatus::Stop;
        }

        let Some(slot) = self.ring.reserve_read() else {
            return FeedStatus::Stop;
        };
        dest.copy_from_slice(&slot);
        slot.release();
        FeedStatus::Filled
    }
}
