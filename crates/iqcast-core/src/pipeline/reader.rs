//! Producer side: background reader task
//!
//! One thread loops over reserve → read → convert → publish until the
//! input runs dry or a terminal phase is observed. All input failures end
//! this loop; none of them end the process.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::source::SampleSource;
use crate::types::IqPair;

use super::gain::GainControl;
use super::lifecycle::Phase;
use super::ring::BlockRing;

pub(super) fn spawn(
    ring: Arc<BlockRing>,
    source: Box<dyn SampleSource>,
    gain: GainControl,
) -> JoinHandle<()> {
    thread::spawn(move || run(ring, source, gain))
}

fn run(ring: Arc<BlockRing>, mut source: Box<dyn SampleSource>, mut gain: GainControl) {
    let samples = ring.samples_per_block();
    let mut raw = vec![IqPair::ZERO; samples];

    loop {
        // Reserve before reading, so a stall on a full ring applies
        // backpressure to the input instead of buffering unboundedly.
        let Some(mut slot) = ring.reserve_write() else {
            break;
        };

        let read = match source.read_pairs(&mut raw) {
            Ok(n) => n,
            Err(e) => {
                log::error!("input read failed: {}", e);
                ring.transition(Phase::InputExhausted);
                break;
            }
        };

        if read == 0 {
            log::info!("input exhausted");
            ring.transition(Phase::InputExhausted);
            break;
        }

        if read < samples {
            log::warn!("short read: {} of {} sample pairs", read, samples);
            // The remainder transmits as a silent carrier rather than
            // whatever the slot held on its previous lap.
            raw[read..].fill(IqPair::ZERO);
        }

        gain.convert_block(&raw, &mut slot);
        slot.publish();
    }

    log::debug!("reader task finished (final gain {:.6})", gain.gain());
}
