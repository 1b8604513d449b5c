//! SSTV Decoder — the full receive pipeline.
//!
//! Owns every stage and wires them into a push pipeline:
//!
//! ```text
//! audio -> resample (if needed) -> band-pass -> DC block -> AGC
//!       -> frequency estimate -> VIS decoder | PD demodulator
//! ```
//!
//! Each `process` call runs to completion on the caller's thread and
//! invokes the registered callbacks inline; there are no queues, timers
//! or internal threads. The caller picks its own block size and pacing.
//! One decoder instance is single-threaded; independent instances share
//! nothing.
//!
//! ## Example
//!
//! ```rust
//! use slowscan_core::decoder::{DecoderState, SstvDecoder};
//!
//! let mut decoder = SstvDecoder::new(11025.0);
//! decoder.set_on_mode_detected(|mode| println!("mode: {}", mode.name));
//! decoder.set_on_line_decoded(|idx, _pixels| println!("line {idx}"));
//! decoder.set_on_image_complete(|w, h| println!("done: {w}x{h}"));
//!
//! decoder.process(&vec![0.0f32; 2048]); // silence: no callbacks fire
//! assert_eq!(decoder.state(), DecoderState::SearchingVis);
//! ```

use crate::agc::{Agc, AgcConfig};
use crate::config::{DecoderConfig, INTERNAL_SAMPLE_RATE};
use crate::dc_blocker::DcBlocker;
use crate::fir_filter::FirFilter;
use crate::freq_estimator::FrequencyEstimator;
use crate::modes::{demodulation_timings, ModeDescriptor};
use crate::pd_demodulator::{LineGroup, PdDemodulator};
use crate::resampler::PolyphaseResampler;
use crate::types::{Pixel, Sample, SstvResult};
use crate::vis_decoder::VisDecoder;

/// What the pipeline is currently listening for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// No mode locked; frequencies go to the VIS decoder.
    SearchingVis,
    /// Mode locked; frequencies go to the image demodulator.
    DecodingImageData,
    /// A full image was emitted; input is ignored until `reset`.
    ImageComplete,
}

type ModeCallback = Box<dyn FnMut(&ModeDescriptor)>;
type LineCallback = Box<dyn FnMut(usize, &[Pixel])>;
type CompleteCallback = Box<dyn FnMut(usize, usize)>;

/// Streaming SSTV decoder.
pub struct SstvDecoder {
    config: DecoderConfig,
    resample_engaged: bool,

    resampler: PolyphaseResampler,
    bandpass: FirFilter,
    dc_blocker: DcBlocker,
    agc: Agc,
    freq_estimator: FrequencyEstimator,
    vis: VisDecoder,
    pd: PdDemodulator,

    state: DecoderState,
    mode: Option<ModeDescriptor>,

    on_mode_detected: Option<ModeCallback>,
    on_line_decoded: Option<LineCallback>,
    on_image_complete: Option<CompleteCallback>,
}

impl SstvDecoder {
    /// Create a decoder for audio at `input_rate` Hz with default tuning.
    ///
    /// # Panics
    ///
    /// Panics if `input_rate` is not positive and finite.
    pub fn new(input_rate: f64) -> Self {
        let config = DecoderConfig {
            input_rate,
            ..Default::default()
        };
        match Self::with_config(config) {
            Ok(decoder) => decoder,
            Err(e) => panic!("invalid decoder configuration: {e}"),
        }
    }

    /// Create a decoder from an explicit configuration.
    pub fn with_config(config: DecoderConfig) -> SstvResult<Self> {
        config.validate()?;

        let resampler = PolyphaseResampler::with_geometry(
            config.input_rate,
            INTERNAL_SAMPLE_RATE,
            config.resampler_phases,
            config.resampler_taps_per_phase,
        );
        let bandpass = FirFilter::band_pass(
            config.bandpass_taps,
            INTERNAL_SAMPLE_RATE,
            config.bandpass_low_hz,
            config.bandpass_high_hz,
        );
        let agc = Agc::new(AgcConfig {
            target: config.agc_target,
            attack: config.agc_attack,
            release: config.agc_release,
            ..Default::default()
        });

        Ok(Self {
            resample_engaged: config.resampling_engaged(),
            resampler,
            bandpass,
            dc_blocker: DcBlocker::new(config.dc_alpha),
            agc,
            freq_estimator: FrequencyEstimator::new(INTERNAL_SAMPLE_RATE, config.hilbert_taps),
            vis: VisDecoder::new(INTERNAL_SAMPLE_RATE, config.median_window),
            pd: PdDemodulator::new(INTERNAL_SAMPLE_RATE),
            state: DecoderState::SearchingVis,
            mode: None,
            on_mode_detected: None,
            on_line_decoded: None,
            on_image_complete: None,
            config,
        })
    }

    /// The rate every internal timing constant is derived from.
    pub fn internal_rate(&self) -> f64 {
        INTERNAL_SAMPLE_RATE
    }

    /// Current pipeline state.
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// The mode locked by the last VIS decode, if any.
    pub fn current_mode(&self) -> Option<&ModeDescriptor> {
        self.mode.as_ref()
    }

    /// The configuration this decoder was built from.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Called with the descriptor on every valid VIS stop bit, including
    /// unknown codes (family `Unknown`).
    pub fn set_on_mode_detected<F>(&mut self, callback: F)
    where
        F: FnMut(&ModeDescriptor) + 'static,
    {
        self.on_mode_detected = Some(Box::new(callback));
    }

    /// Called with `(line_index, pixels)` for every reconstructed row,
    /// top to bottom, pixels in (R, G, B) order.
    pub fn set_on_line_decoded<F>(&mut self, callback: F)
    where
        F: FnMut(usize, &[Pixel]) + 'static,
    {
        self.on_line_decoded = Some(Box::new(callback));
    }

    /// Called with `(width, height)` once after the last row of an image.
    pub fn set_on_image_complete<F>(&mut self, callback: F)
    where
        F: FnMut(usize, usize) + 'static,
    {
        self.on_image_complete = Some(Box::new(callback));
    }

    /// Feed raw audio samples; runs registered callbacks inline.
    pub fn process(&mut self, samples: &[Sample]) {
        let resampled;
        let samples = if self.resample_engaged {
            resampled = self.resampler.process(samples);
            resampled.as_slice()
        } else {
            samples
        };

        for &sample in samples {
            let filtered = self.bandpass.process_sample(sample);
            let unbiased = self.dc_blocker.process_sample(filtered);
            let leveled = self.agc.process_sample(unbiased);
            let freq = self.freq_estimator.process_sample(leveled);

            match self.state {
                DecoderState::SearchingVis => {
                    if let Some(mode) = self.vis.process_frequency(freq) {
                        self.lock_mode(mode);
                    }
                }
                DecoderState::DecodingImageData => {
                    if let Some(group) = self.pd.process_frequency(freq) {
                        self.emit_group(group);
                    }
                }
                DecoderState::ImageComplete => {}
            }
        }
    }

    /// Return every stage to its post-construction state and resume
    /// searching for a header. Callbacks stay registered.
    pub fn reset(&mut self) {
        self.resampler.reset();
        self.bandpass.reset();
        self.dc_blocker.reset();
        self.agc.reset();
        self.freq_estimator.reset();
        self.vis.reset();
        self.pd.reset();
        self.state = DecoderState::SearchingVis;
        self.mode = None;
        tracing::debug!("decoder reset, searching for VIS");
    }

    fn lock_mode(&mut self, mode: ModeDescriptor) {
        if let Some(cb) = self.on_mode_detected.as_mut() {
            cb(&mode);
        }

        match demodulation_timings(&mode) {
            Ok(timings) => {
                tracing::info!(
                    mode = mode.name,
                    vis_code = mode.vis_code,
                    width = mode.width,
                    height = mode.height,
                    "mode detected, decoding image data"
                );
                self.pd.configure(mode, timings);
                self.mode = Some(mode);
                self.state = DecoderState::DecodingImageData;
            }
            Err(error) => {
                tracing::warn!(%error, "mode not decodable, restarting header search");
                self.reset();
            }
        }
    }

    fn emit_group(&mut self, group: LineGroup) {
        if let Some(cb) = self.on_line_decoded.as_mut() {
            for (idx, row) in &group.lines {
                cb(*idx, row);
            }
        }

        if group.image_complete {
            let (width, height) = self
                .mode
                .map(|m| (m.width, m.height))
                .unwrap_or((0, 0));
            tracing::info!(width, height, "image complete");
            if let Some(cb) = self.on_image_complete.as_mut() {
                cb(width, height);
            }
            self.state = DecoderState::ImageComplete;
        }
    }
}
