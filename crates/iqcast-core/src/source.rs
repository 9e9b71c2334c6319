//! Input collaborator: sequential sources of raw IQ sample pairs
//!
//! The pipeline only needs "fill this buffer with as many pairs as you
//! have, tell me how many you managed, report end-of-stream". The shipped
//! implementation decodes interleaved little-endian `f32` I/Q pairs from
//! any byte stream — a capture file or stdin.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::types::{IqPair, BYTES_PER_RAW_PAIR};

/// A sequential source of raw IQ sample pairs. No seeking required.
pub trait SampleSource: Send {
    /// Fill `dest` with as many pairs as are available, returning the
    /// number of whole pairs read. `Ok(0)` means end-of-stream.
    fn read_pairs(&mut self, dest: &mut [IqPair]) -> io::Result<usize>;
}

/// Decodes interleaved little-endian `f32` IQ pairs from a byte stream.
///
/// Reads the underlying stream in chunks of at most `chunk_bytes`, the way
/// the classic tool sized its `fread` calls; small chunks keep pipe-fed
/// input responsive. A trailing partial pair at end-of-stream is dropped.
pub struct RawIqReader<R> {
    inner: R,
    chunk_bytes: usize,
}

impl<R: Read + Send> RawIqReader<R> {
    pub fn new(inner: R, chunk_bytes: usize) -> Self {
        Self {
            inner,
            chunk_bytes: chunk_bytes.max(BYTES_PER_RAW_PAIR),
        }
    }
}

impl<R: Read + Send> SampleSource for RawIqReader<R> {
    fn read_pairs(&mut self, dest: &mut [IqPair]) -> io::Result<usize> {
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(dest);

        let mut filled = 0;
        while filled < bytes.len() {
            let want = (bytes.len() - filled).min(self.chunk_bytes);
            match self.inner.read(&mut bytes[filled..filled + want]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        if filled % BYTES_PER_RAW_PAIR != 0 {
            log::warn!(
                "input ended mid-pair, dropping {} trailing bytes",
                filled % BYTES_PER_RAW_PAIR
            );
        }
        Ok(filled / BYTES_PER_RAW_PAIR)
    }
}

/// Open a sample source over a file, or over stdin when `path` is `None`.
pub fn open_source(
    path: Option<&Path>,
    chunk_bytes: usize,
) -> io::Result<Box<dyn SampleSource>> {
    match path {
        Some(path) => {
            let file = File::open(path)?;
            Ok(Box::new(RawIqReader::new(BufReader::new(file), chunk_bytes)))
        }
        None => Ok(Box::new(RawIqReader::new(io::stdin(), chunk_bytes))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(pairs: &[(f32, f32)]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for &(i, q) in pairs {
            bytes.extend_from_slice(&i.to_le_bytes());
            bytes.extend_from_slice(&q.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_reads_whole_pairs() {
        let data = encode(&[(1.0, -1.0), (0.5, 0.25)]);
        let mut src = RawIqReader::new(Cursor::new(data), 4096);

        let mut dest = [IqPair::ZERO; 2];
        assert_eq!(src.read_pairs(&mut dest).unwrap(), 2);
        assert_eq!(dest[0], IqPair::new(1.0, -1.0));
        assert_eq!(dest[1], IqPair::new(0.5, 0.25));
        assert_eq!(src.read_pairs(&mut dest).unwrap(), 0);
    }

    #[test]
    fn test_short_input_returns_partial_count() {
        let data = encode(&[(1.0, 2.0)]);
        let mut src = RawIqReader::new(Cursor::new(data), 4096);

        let mut dest = [IqPair::ZERO; 4];
        assert_eq!(src.read_pairs(&mut dest).unwrap(), 1);
        assert_eq!(dest[0], IqPair::new(1.0, 2.0));
    }

    #[test]
    fn test_trailing_partial_pair_is_dropped() {
        let mut data = encode(&[(1.0, 2.0)]);
        data.extend_from_slice(&[0xAA, 0xBB, 0xCC]); // 3 stray bytes
        let mut src = RawIqReader::new(Cursor::new(data), 4096);

        let mut dest = [IqPair::ZERO; 4];
        assert_eq!(src.read_pairs(&mut dest).unwrap(), 1);
    }

    #[test]
    fn test_chunked_reads_assemble_a_full_block() {
        // Chunk smaller than the destination forces multiple read calls
        let data = encode(&[(1.0, 2.0), (3.0, 4.0), (5.0, 6.0)]);
        let mut src = RawIqReader::new(Cursor::new(data), BYTES_PER_RAW_PAIR);

        let mut dest = [IqPair::ZERO; 3];
        assert_eq!(src.read_pairs(&mut dest).unwrap(), 3);
        assert_eq!(dest[2], IqPair::new(5.0, 6.0));
    }
}
