//! Error types for pipeline construction and transmit backends

use thiserror::Error;

/// Errors rejected at pipeline construction, before any thread starts
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Ring capacity must allow the cursor arithmetic (mod 2N masking)
    #[error("ring capacity must be a nonzero power of two, got {0}")]
    RingCapacity(usize),

    /// A block must hold at least one sample pair
    #[error("samples per block must be nonzero")]
    ZeroBlockSize,

    /// Soft gain is a linear scale factor applied before quantization
    #[error("soft gain must be positive and finite, got {0}")]
    InvalidGain(f32),

    /// Zero disables AGC; negative ceilings are meaningless
    #[error("AGC ceiling must be zero (disabled) or positive, got {0}")]
    InvalidAgcCeiling(f32),
}

/// Result type for pipeline construction
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur in a transmit backend
#[derive(Error, Debug)]
pub enum DeviceError {
    /// No transmit-capable devices attached
    #[error("no transmit devices found")]
    NoDevices,

    /// Failed to open a device by identifier
    #[error("failed to open device \"{id}\" (error {code})")]
    Open { id: String, code: i32 },

    /// A device parameter could not be applied
    #[error("failed to configure {what} (error {code})")]
    Configure { what: &'static str, code: i32 },

    /// The streaming loop reported a device error
    #[error("transmit stream error (error {code})")]
    Stream { code: i32 },

    /// I/O failure in a file-backed sink
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for transmit backends
pub type DeviceResult<T> = Result<T, DeviceError>;
