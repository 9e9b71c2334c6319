//! Soft gain, AGC and device-format conversion
//!
//! Converts raw float IQ pairs to SC16 Q11 with a software gain stage in
//! front of the quantizer. The optional AGC reduces the gain whenever a
//! post-gain sample magnitude reaches the configured ceiling, so the gain
//! sequence is monotone non-increasing over the life of the stream — the
//! stage never turns gain back up on its own.
//!
//! The gain mutation is observable across blocks, so conversion is not pure
//! call-to-call. The single-producer pipeline serializes all calls.

use crate::types::{IqPair, FULL_SCALE, SAMPLE_MAX, SAMPLE_MIN};

/// Stateful gain stage feeding the quantizer
pub struct GainControl {
    /// Current soft gain (linear, positive)
    gain: f32,
    /// AGC magnitude ceiling; 0 disables AGC
    ceiling: f32,
}

impl GainControl {
    /// Create a gain stage with an initial soft gain and AGC ceiling
    pub fn new(gain: f32, ceiling: f32) -> Self {
        Self { gain, ceiling }
    }

    /// Current soft gain
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Convert one block of raw pairs into interleaved device samples.
    ///
    /// `out` must hold exactly `2 * raw.len()` values.
    pub fn convert_block(&mut self, raw: &[IqPair], out: &mut [i16]) {
        debug_assert_eq!(out.len(), raw.len() * 2);

        for (pair, out_pair) in raw.iter().zip(out.chunks_exact_mut(2)) {
            let mut i = pair.i * self.gain;
            let mut q = pair.q * self.gain;

            if self.ceiling > 0.0 {
                let m = (i * i + q * q).sqrt();
                if m >= self.ceiling {
                    // Scale the gain so this sample lands exactly on the
                    // ceiling, and re-apply it to the current pair. The
                    // factor is <= 1, keeping the gain sequence monotone.
                    self.gain *= self.ceiling / m;
                    log::warn!(
                        "soft gain reduced to {:.6} (sample magnitude {:.6})",
                        self.gain,
                        m
                    );
                    i = pair.i * self.gain;
                    q = pair.q * self.gain;
                }
            }

            out_pair[0] = quantize(i);
            out_pair[1] = quantize(q);
        }
    }
}

/// Round to the nearest SC16 Q11 step, saturating at the format bounds.
#[inline]
fn quantize(value: f32) -> i16 {
    (value * FULL_SCALE)
        .round()
        .clamp(SAMPLE_MIN as f32, SAMPLE_MAX as f32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(values: &[(f32, f32)]) -> Vec<IqPair> {
        values.iter().map(|&(i, q)| IqPair::new(i, q)).collect()
    }

    fn convert(gain: &mut GainControl, raw: &[IqPair]) -> Vec<i16> {
        let mut out = vec![0i16; raw.len() * 2];
        gain.convert_block(raw, &mut out);
        out
    }

    #[test]
    fn test_unity_gain_quantization() {
        let mut gain = GainControl::new(1.0, 0.0);
        let out = convert(&mut gain, &pairs(&[(0.0, 1.0), (-1.0, 0.5)]));
        assert_eq!(out, vec![0, 2047, -2047, 1024]); // 0.5 * 2047 rounds up
    }

    #[test]
    fn test_soft_gain_applied_before_quantization() {
        let mut gain = GainControl::new(0.5, 0.0);
        let out = convert(&mut gain, &pairs(&[(1.0, -1.0)]));
        assert_eq!(out, vec![1024, -1024]);
    }

    #[test]
    fn test_out_of_range_saturates_instead_of_wrapping() {
        let mut gain = GainControl::new(1.0, 0.0);
        let out = convert(&mut gain, &pairs(&[(1.5, -1.5), (100.0, -100.0)]));
        assert_eq!(out, vec![SAMPLE_MAX, SAMPLE_MIN, SAMPLE_MAX, SAMPLE_MIN]);
    }

    #[test]
    fn test_round_trip_within_one_step() {
        let mut gain = GainControl::new(0.8, 0.0);
        let raw = pairs(&[(0.123, -0.456), (0.789, 0.01), (-0.333, 0.999)]);
        let out = convert(&mut gain, &raw);

        for (pair, out_pair) in raw.iter().zip(out.chunks_exact(2)) {
            let i_back = out_pair[0] as f32 / FULL_SCALE;
            let q_back = out_pair[1] as f32 / FULL_SCALE;
            assert!((i_back - pair.i * 0.8).abs() <= 1.0 / FULL_SCALE);
            assert!((q_back - pair.q * 0.8).abs() <= 1.0 / FULL_SCALE);
        }
    }

    #[test]
    fn test_agc_rescales_hot_sample_onto_ceiling() {
        let mut gain = GainControl::new(1.0, 0.5);
        // Magnitude 1.0 with gain 1.0 exceeds the 0.5 ceiling
        let out = convert(&mut gain, &pairs(&[(1.0, 0.0)]));

        assert!((gain.gain() - 0.5).abs() < 1e-6);
        // The triggering sample is re-converted with the reduced gain
        assert_eq!(out, vec![(0.5f32 * FULL_SCALE).round() as i16, 0]);
    }

    #[test]
    fn test_agc_gain_is_monotone_non_increasing() {
        let mut gain = GainControl::new(2.0, 0.8);
        let blocks = [
            pairs(&[(0.9, 0.0), (0.1, 0.1)]),
            pairs(&[(0.05, 0.05), (0.02, 0.0)]), // quiet block: no change
            pairs(&[(2.0, 0.0)]),
        ];

        let mut last = gain.gain();
        for block in &blocks {
            let mut out = vec![0i16; block.len() * 2];
            gain.convert_block(block, &mut out);
            assert!(
                gain.gain() <= last + 1e-9,
                "gain rose from {} to {}",
                last,
                gain.gain()
            );
            last = gain.gain();
        }
        assert!(gain.gain() < 2.0);
    }

    #[test]
    fn test_agc_persists_across_blocks() {
        let mut gain = GainControl::new(1.0, 0.5);
        convert(&mut gain, &pairs(&[(1.0, 0.0)]));
        let reduced = gain.gain();

        // A later in-range sample is scaled by the already-reduced gain
        let out = convert(&mut gain, &pairs(&[(0.4, 0.0)]));
        assert_eq!(out[0], (0.4 * reduced * FULL_SCALE).round() as i16);
        assert!((gain.gain() - reduced).abs() < 1e-9);
    }

    #[test]
    fn test_agc_disabled_when_ceiling_zero() {
        let mut gain = GainControl::new(1.0, 0.0);
        convert(&mut gain, &pairs(&[(100.0, 100.0)]));
        assert_eq!(gain.gain(), 1.0);
    }
}
