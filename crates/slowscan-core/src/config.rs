//! Decoder configuration.
//!
//! All tunables of the DSP front end in one serde-friendly struct. The
//! defaults reproduce the reference decoder; most callers only ever set
//! `input_rate`. Parsing a config file (YAML, TOML, ...) is left to the
//! caller; this crate only defines the shape and validates it.
//!
//! ## Example
//!
//! ```rust
//! use slowscan_core::config::DecoderConfig;
//!
//! let config = DecoderConfig {
//!     input_rate: 48000.0,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{SstvError, SstvResult};

/// The sample rate every internal timing constant is derived from.
pub const INTERNAL_SAMPLE_RATE: f64 = 11025.0;

/// Configuration for [`SstvDecoder`](crate::decoder::SstvDecoder).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Sample rate of the audio handed to `process`, in Hz. Inputs within
    /// 1 Hz of the internal rate bypass the resampler.
    pub input_rate: f64,
    /// Band-pass FIR length (odd).
    pub bandpass_taps: usize,
    /// Band-pass lower cutoff in Hz.
    pub bandpass_low_hz: f64,
    /// Band-pass upper cutoff in Hz.
    pub bandpass_high_hz: f64,
    /// Hilbert transformer length (odd). Also the length of the startup
    /// transient during which the discriminator reports 0 Hz.
    pub hilbert_taps: usize,
    /// DC blocker pole location.
    pub dc_alpha: f32,
    /// AGC target amplitude.
    pub agc_target: f32,
    /// AGC envelope attack coefficient (fast).
    pub agc_attack: f32,
    /// AGC envelope release coefficient (slow).
    pub agc_release: f32,
    /// Median window applied to frequencies ahead of the VIS decoder (odd).
    pub median_window: usize,
    /// Polyphase resampler phase count.
    pub resampler_phases: usize,
    /// Taps per resampler phase.
    pub resampler_taps_per_phase: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            input_rate: INTERNAL_SAMPLE_RATE,
            bandpass_taps: 31,
            bandpass_low_hz: 500.0,
            bandpass_high_hz: 2500.0,
            hilbert_taps: 95,
            dc_alpha: 0.995,
            agc_target: 0.5,
            agc_attack: 0.01,
            agc_release: 0.001,
            median_window: 9,
            resampler_phases: 64,
            resampler_taps_per_phase: 16,
        }
    }
}

impl DecoderConfig {
    /// Check the configuration for values the DSP chain cannot work with.
    pub fn validate(&self) -> SstvResult<()> {
        if !(self.input_rate.is_finite() && self.input_rate > 0.0) {
            return Err(SstvError::InvalidConfig(format!(
                "input_rate must be positive, got {}",
                self.input_rate
            )));
        }
        if self.bandpass_taps < 3 || self.bandpass_taps % 2 == 0 {
            return Err(SstvError::InvalidConfig(format!(
                "bandpass_taps must be odd and >= 3, got {}",
                self.bandpass_taps
            )));
        }
        if !(self.bandpass_low_hz > 0.0 && self.bandpass_high_hz > self.bandpass_low_hz) {
            return Err(SstvError::InvalidConfig(format!(
                "band-pass cutoffs must satisfy 0 < low < high, got {}..{}",
                self.bandpass_low_hz, self.bandpass_high_hz
            )));
        }
        if self.bandpass_high_hz >= INTERNAL_SAMPLE_RATE / 2.0 {
            return Err(SstvError::InvalidConfig(format!(
                "bandpass_high_hz {} is at or above Nyquist for the internal rate",
                self.bandpass_high_hz
            )));
        }
        if self.hilbert_taps < 3 || self.hilbert_taps % 2 == 0 {
            return Err(SstvError::InvalidConfig(format!(
                "hilbert_taps must be odd and >= 3, got {}",
                self.hilbert_taps
            )));
        }
        if !(self.dc_alpha > 0.0 && self.dc_alpha < 1.0) {
            return Err(SstvError::InvalidConfig(format!(
                "dc_alpha must be in (0, 1), got {}",
                self.dc_alpha
            )));
        }
        if self.median_window == 0 {
            return Err(SstvError::InvalidConfig(
                "median_window must be at least 1".into(),
            ));
        }
        if self.resampler_phases < 2 || self.resampler_taps_per_phase < 2 {
            return Err(SstvError::InvalidConfig(format!(
                "resampler needs at least 2 phases and 2 taps per phase, got {}x{}",
                self.resampler_phases, self.resampler_taps_per_phase
            )));
        }
        Ok(())
    }

    /// Whether the resampler stage is engaged for this input rate.
    pub fn resampling_engaged(&self) -> bool {
        (self.input_rate - INTERNAL_SAMPLE_RATE).abs() >= 1.0
    }
}
