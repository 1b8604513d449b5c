//! # Slowscan Core
//!
//! Streaming decoder for Slow-Scan Television (SSTV) transmissions. Feed
//! it mono audio samples; it hands back the detected mode, decoded image
//! rows and a completion event through callbacks.
//!
//! ## Signal flow
//!
//! ```text
//! audio -> Resample -> Band-pass -> DC block -> AGC -> Hilbert/FM
//!       -> VIS header decode -> PD line demodulation -> RGB rows
//! ```
//!
//! Everything runs synchronously on the caller's thread. Each DSP stage
//! is an ordinary block with `process`/`reset`, usable on its own; the
//! [`decoder::SstvDecoder`] wires the whole chain together and owns the
//! protocol state machines.
//!
//! - **VIS decode**: calibration preamble, leader/break/leader, then the
//!   7-bit mode code with even parity, keyed at 30 ms per bit.
//! - **PD demodulation**: two image rows per six-segment group with
//!   shared chrominance, sub-sample clock discipline and automatic
//!   frequency correction.
//!
//! File and audio I/O, image encoding and display belong to the caller;
//! this crate is deliberately sans-io.
//!
//! ## Example
//!
//! ```rust
//! use slowscan_core::{DecoderState, SstvDecoder};
//!
//! let mut decoder = SstvDecoder::new(11025.0);
//! decoder.set_on_mode_detected(|mode| {
//!     eprintln!("receiving {} ({}x{})", mode.name, mode.width, mode.height);
//! });
//! decoder.set_on_line_decoded(|index, pixels| {
//!     // push the row into a frame buffer
//!     let _ = (index, pixels);
//! });
//! decoder.set_on_image_complete(|width, height| {
//!     eprintln!("image done: {width}x{height}");
//! });
//!
//! // Pump audio in whatever block size the capture side produces.
//! let block = vec![0.0f32; 2048];
//! decoder.process(&block);
//! assert_eq!(decoder.state(), DecoderState::SearchingVis);
//! ```

pub mod agc;
pub mod config;
pub mod dc_blocker;
pub mod decoder;
pub mod fir_filter;
pub mod freq_estimator;
pub mod median_filter;
pub mod modes;
pub mod pd_demodulator;
pub mod resampler;
pub mod types;
pub mod vis_decoder;

pub use config::{DecoderConfig, INTERNAL_SAMPLE_RATE};
pub use decoder::{DecoderState, SstvDecoder};
pub use modes::{
    demodulation_timings, lookup_mode, pd_timings, ModeDescriptor, PdTimings, SstvFamily,
};
pub use types::{Pixel, Sample, SstvError, SstvResult};
