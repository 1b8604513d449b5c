//! Core types for SSTV decoding.
//!
//! Audio enters the decoder as single-precision samples nominally in
//! `[-1.0, 1.0]`; filter design and frequency estimates run in double
//! precision. Decoded image data is plain 8-bit RGB.

use serde::{Deserialize, Serialize};

/// A single mono audio sample.
pub type Sample = f32;

/// Frequency in Hz, as produced by the discriminator.
pub type Frequency = f64;

/// One decoded image pixel, 8 bits per channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Pixel {
    /// Construct a pixel from channel values.
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Result type for decoder operations.
pub type SstvResult<T> = Result<T, SstvError>;

/// Errors that can occur while constructing or driving a decoder.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SstvError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unsupported mode for VIS code {vis_code}")]
    UnsupportedMode { vis_code: u8 },

    #[error("no PD timings registered for VIS code {vis_code}")]
    MissingTimings { vis_code: u8 },
}
