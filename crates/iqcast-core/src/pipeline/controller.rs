//! Pipeline lifecycle controller
//!
//! `Pipeline::start` wires the whole producer side together and hands back
//! the consumer handle; `shutdown` is the single sequenced teardown path:
//! request stop, wake every waiter, join the reader, release storage.

use std::sync::Arc;
use std::thread::JoinHandle;

use crate::config::PipelineConfig;
use crate::error::ConfigResult;
use crate::source::SampleSource;

use super::feeder::TxFeeder;
use super::gain::GainControl;
use super::lifecycle::{Phase, StopHandle};
use super::reader;
use super::ring::BlockRing;

/// Owns the reader task and the shared ring.
///
/// The ring storage itself is freed when the last of the controller, the
/// feeder and the reader drops its reference — after both ends have
/// stopped touching it.
pub struct Pipeline {
    ring: Arc<BlockRing>,
    reader: Option<JoinHandle<()>>,
}

impl Pipeline {
    /// Validate the configuration, allocate the ring, spawn the reader
    /// task, and return the controller plus the consumer handle for the
    /// transmit backend.
    pub fn start(
        config: &PipelineConfig,
        source: Box<dyn SampleSource>,
    ) -> ConfigResult<(Pipeline, TxFeeder)> {
        config.validate()?;

        let ring = Arc::new(BlockRing::new(
            config.ring_blocks,
            config.samples_per_block,
        )?);
        log::info!(
            "pipeline: {} blocks x {} samples ({} KiB ring)",
            config.ring_blocks,
            config.samples_per_block,
            config.ring_blocks * config.block_len() * std::mem::size_of::<i16>() / 1024
        );

        let gain = GainControl::new(config.gain, config.agc_ceiling);
        let handle = reader::spawn(Arc::clone(&ring), source, gain);

        let feeder = TxFeeder::new(Arc::clone(&ring));
        let pipeline = Pipeline {
            ring,
            reader: Some(handle),
        };
        Ok((pipeline, feeder))
    }

    /// Handle for requesting a stop from any thread (signal handlers, UIs)
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle::new(Arc::clone(&self.ring))
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> Phase {
        self.ring.phase()
    }

    /// Block until the ring is full or the pipeline reached a terminal
    /// phase. Called once before starting the real-time consumer so it
    /// begins with maximum headroom.
    pub fn wait_until_primed(&self) {
        self.ring.wait_until_primed();
    }

    /// Orderly teardown: request stop, wake all waiters, join the reader.
    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        self.ring.transition(Phase::StopRequested);
        if let Some(handle) = self.reader.take() {
            if handle.join().is_err() {
                log::error!("reader task panicked during shutdown");
            }
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.teardown();
    }
}
