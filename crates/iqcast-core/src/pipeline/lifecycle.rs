//! Pipeline lifecycle state
//!
//! A single monotone state machine replaces the classic pattern of a global
//! mutable shutdown flag polled without synchronization. The phase lives
//! under the ring's cursor lock, so every blocking wait observes transitions
//! without a race, and each terminal transition broadcasts to all waiters.

use std::sync::Arc;

use super::ring::BlockRing;

/// Pipeline execution phase.
///
/// `Running` is the only non-terminal phase. The two terminal phases are
/// reached by exactly one transition each:
/// - `StopRequested`: external stop signal; the feeder returns `Stop`
///   immediately, even if converted data remains in the ring.
/// - `InputExhausted`: the input source reported end-of-stream or an error;
///   the feeder drains the ring, then returns `Stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    StopRequested,
    InputExhausted,
}

impl Phase {
    /// Whether the reader loop must end
    #[inline]
    pub fn is_terminal(self) -> bool {
        self != Phase::Running
    }
}

/// Cloneable handle for requesting a pipeline stop from any thread.
///
/// Safe to call from a signal handler thread; idempotent (a second call,
/// or a call after the input already ran dry, is a no-op).
#[derive(Clone)]
pub struct StopHandle {
    ring: Arc<BlockRing>,
}

impl StopHandle {
    pub(crate) fn new(ring: Arc<BlockRing>) -> Self {
        Self { ring }
    }

    /// Request a stop. Wakes every party blocked on the ring.
    pub fn request_stop(&self) {
        if self.ring.transition(Phase::StopRequested) {
            log::info!("stop requested, shutting down stream");
        }
    }

    /// Current pipeline phase
    pub fn phase(&self) -> Phase {
        self.ring.phase()
    }
}
