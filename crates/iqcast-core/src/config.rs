//! Pipeline and device configuration
//!
//! Both structs are plain data passed to the core at construction time; the
//! core exposes no runtime reconfiguration. Defaults match the classic
//! bladeRF file-transmit tool so existing sample files and scripts carry
//! over unchanged.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Sample pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// IQ sample pairs per block (one block per ring slot and per device
    /// buffer submission)
    pub samples_per_block: usize,
    /// Ring capacity in blocks; must be a power of two
    pub ring_blocks: usize,
    /// Initial soft gain (linear)
    pub gain: f32,
    /// AGC ceiling on post-gain sample magnitude; 0 disables AGC
    pub agc_ceiling: f32,
    /// Chunk size in bytes for input read calls
    pub read_chunk_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            samples_per_block: 16384,
            ring_blocks: 256,
            gain: 1.0,
            agc_ceiling: 0.0,
            read_chunk_bytes: 4096,
        }
    }
}

impl PipelineConfig {
    /// Reject configurations the pipeline cannot run with.
    ///
    /// Called by `Pipeline::start` before any allocation or thread spawn.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.ring_blocks == 0 || !self.ring_blocks.is_power_of_two() {
            return Err(ConfigError::RingCapacity(self.ring_blocks));
        }
        if self.samples_per_block == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }
        if !(self.gain.is_finite() && self.gain > 0.0) {
            return Err(ConfigError::InvalidGain(self.gain));
        }
        if !(self.agc_ceiling.is_finite() && self.agc_ceiling >= 0.0) {
            return Err(ConfigError::InvalidAgcCeiling(self.agc_ceiling));
        }
        Ok(())
    }

    /// Interleaved `i16` count of one converted block
    pub fn block_len(&self) -> usize {
        self.samples_per_block * 2
    }
}

/// Transmit device configuration
///
/// Only read by hardware backends; the file sink ignores it. The zero
/// values on `bandwidth_hz` and `num_transfers` mean "derive from the other
/// fields", matching the original tool's auto rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device identifier; empty string opens the first device found
    pub device_id: String,
    /// TX center frequency in Hz
    pub frequency_hz: u64,
    /// TX sample rate in samples per second
    pub sample_rate: u32,
    /// TX low-pass filter bandwidth in Hz; 0 = 3/4 of the sample rate
    pub bandwidth_hz: u32,
    /// TXVGA1 gain in dB
    pub txvga1_db: i32,
    /// TXVGA2 gain in dB
    pub txvga2_db: i32,
    /// Number of device-side sample buffers
    pub num_buffers: u32,
    /// Maximum in-flight transfers; 0 = half of `num_buffers`
    pub num_transfers: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_id: String::new(),
            frequency_hz: 300_000_000,
            sample_rate: 1_000_000,
            bandwidth_hz: 0,
            txvga1_db: -35,
            txvga2_db: 0,
            num_buffers: 16,
            num_transfers: 0,
        }
    }
}

impl DeviceConfig {
    /// Bandwidth with the auto rule applied
    pub fn effective_bandwidth(&self) -> u32 {
        if self.bandwidth_hz == 0 {
            self.sample_rate / 4 * 3
        } else {
            self.bandwidth_hz
        }
    }

    /// In-flight transfer count with the auto rule applied
    pub fn effective_transfers(&self) -> u32 {
        if self.num_transfers == 0 {
            self.num_buffers / 2
        } else {
            self.num_transfers
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_ring_capacity_must_be_power_of_two() {
        let cfg = PipelineConfig {
            ring_blocks: 6,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::RingCapacity(6))
        ));

        let cfg = PipelineConfig {
            ring_blocks: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::RingCapacity(0))));
    }

    #[test]
    fn test_zero_block_rejected() {
        let cfg = PipelineConfig {
            samples_per_block: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroBlockSize)));
    }

    #[test]
    fn test_gain_must_be_positive() {
        let cfg = PipelineConfig {
            gain: 0.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = PipelineConfig {
            gain: -1.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_device_auto_rules() {
        let cfg = DeviceConfig::default();
        assert_eq!(cfg.effective_bandwidth(), 750_000);
        assert_eq!(cfg.effective_transfers(), 8);

        let cfg = DeviceConfig {
            bandwidth_hz: 1_500_000,
            num_transfers: 4,
            ..Default::default()
        };
        assert_eq!(cfg.effective_bandwidth(), 1_500_000);
        assert_eq!(cfg.effective_transfers(), 4);
    }
}
