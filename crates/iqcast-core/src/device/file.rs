//! File-backed transmit sink
//!
//! Writes converted SC16 Q11 blocks to a file or stdout instead of a
//! radio. Useful for checking a capture end-to-end before keying a real
//! transmitter, and as the backend for environments without hardware.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::DeviceResult;
use crate::pipeline::{FeedStatus, TxFeeder};

use super::backend::TxBackend;

/// Transmit backend that writes raw device-format samples to a byte sink
pub struct FileSink {
    out: Box<dyn Write + Send>,
    label: String,
}

impl FileSink {
    /// Create a sink writing to `path`
    pub fn create(path: &Path) -> DeviceResult<Self> {
        let file = File::create(path)?;
        Ok(Self {
            out: Box::new(BufWriter::new(file)),
            label: path.display().to_string(),
        })
    }

    /// Create a sink writing to stdout
    pub fn stdout() -> Self {
        Self {
            out: Box::new(BufWriter::new(io::stdout())),
            label: "<stdout>".to_string(),
        }
    }
}

impl TxBackend for FileSink {
    fn stream(&mut self, feeder: &mut TxFeeder) -> DeviceResult<u64> {
        // One reusable block buffer; the feeder itself never allocates
        let mut block = vec![0i16; feeder.block_len()];
        let mut blocks = 0u64;

        loop {
            match feeder.fill(&mut block) {
                FeedStatus::Stop => break,
                FeedStatus::Filled => {
                    self.out.write_all(bytemuck::cast_slice(&block))?;
                    blocks += 1;
                }
            }
        }

        self.out.flush()?;
        log::info!("sink {}: {} blocks written", self.label, blocks);
        Ok(blocks)
    }
}
