//! FIR Filter — windowed-sinc band-pass with circular delay line.
//!
//! Constrains the audio to the SSTV band (sync through white tone) ahead
//! of the discriminator. The band-pass is synthesized as the difference
//! of two low-pass sinc kernels under a Hamming window. A modest tap
//! count is enough here; the quadrature discriminator downstream
//! tolerates soft stopband skirts.
//!
//! ## Example
//!
//! ```rust
//! use slowscan_core::fir_filter::FirFilter;
//!
//! let mut filter = FirFilter::band_pass(31, 11025.0, 500.0, 2500.0);
//! let tone: Vec<f32> = (0..500)
//!     .map(|i| (2.0 * std::f32::consts::PI * 1900.0 * i as f32 / 11025.0).sin())
//!     .collect();
//! let out = filter.process(&tone);
//! assert_eq!(out.len(), tone.len());
//! ```

use crate::types::Sample;

fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        (std::f64::consts::PI * x).sin() / (std::f64::consts::PI * x)
    }
}

/// Design band-pass taps as `LPF(high) - LPF(low)`, Hamming windowed.
///
/// The result is normalized to unity magnitude response at the center of
/// the passband. (A plain coefficient-sum normalization is the low-pass
/// rule; a band-pass sums to roughly zero and would blow up.)
pub fn design_band_pass(tap_count: usize, sample_rate: f64, low_hz: f64, high_hz: f64) -> Vec<f64> {
    assert!(tap_count >= 3, "need at least 3 taps");
    assert!(
        low_hz > 0.0 && high_hz > low_hz && high_hz < sample_rate / 2.0,
        "cutoffs must satisfy 0 < low < high < Nyquist"
    );

    let fc1 = low_hz / sample_rate;
    let fc2 = high_hz / sample_rate;
    let m = (tap_count - 1) as f64;

    let mut taps = Vec::with_capacity(tap_count);
    for i in 0..tap_count {
        let n = i as f64 - m / 2.0;
        let ideal = 2.0 * fc2 * sinc(2.0 * fc2 * n) - 2.0 * fc1 * sinc(2.0 * fc1 * n);
        let window = 0.54 - 0.46 * (2.0 * std::f64::consts::PI * i as f64 / m).cos();
        taps.push(ideal * window);
    }

    // Unity gain at band center.
    let center = (low_hz + high_hz) / 2.0;
    let omega = 2.0 * std::f64::consts::PI * center / sample_rate;
    let (mut re, mut im) = (0.0, 0.0);
    for (k, &t) in taps.iter().enumerate() {
        re += t * (omega * k as f64).cos();
        im -= t * (omega * k as f64).sin();
    }
    let magnitude = (re * re + im * im).sqrt();
    if magnitude > 1e-12 {
        for t in taps.iter_mut() {
            *t /= magnitude;
        }
    }

    taps
}

/// Stateful FIR filter over a flat circular delay line.
#[derive(Debug, Clone)]
pub struct FirFilter {
    taps: Vec<f32>,
    delay_line: Vec<Sample>,
    write_idx: usize,
}

impl FirFilter {
    /// Create a band-pass filter for the given band.
    pub fn band_pass(tap_count: usize, sample_rate: f64, low_hz: f64, high_hz: f64) -> Self {
        let taps = design_band_pass(tap_count, sample_rate, low_hz, high_hz)
            .into_iter()
            .map(|t| t as f32)
            .collect();
        Self::from_taps(taps)
    }

    /// Create a filter from explicit taps.
    pub fn from_taps(taps: Vec<f32>) -> Self {
        assert!(!taps.is_empty(), "taps must not be empty");
        let n = taps.len();
        Self {
            taps,
            delay_line: vec![0.0; n],
            write_idx: 0,
        }
    }

    /// Number of taps.
    pub fn tap_count(&self) -> usize {
        self.taps.len()
    }

    /// Group delay in samples (linear phase).
    pub fn group_delay(&self) -> usize {
        self.taps.len() / 2
    }

    /// Filter one sample.
    pub fn process_sample(&mut self, input: Sample) -> Sample {
        let n = self.taps.len();
        self.delay_line[self.write_idx] = input;

        let mut acc = 0.0f32;
        for (k, &tap) in self.taps.iter().enumerate() {
            let idx = (self.write_idx + n - k) % n;
            acc += tap * self.delay_line[idx];
        }

        self.write_idx = (self.write_idx + 1) % n;
        acc
    }

    /// Filter a block of samples.
    pub fn process(&mut self, input: &[Sample]) -> Vec<Sample> {
        input.iter().map(|&x| self.process_sample(x)).collect()
    }

    /// Zero the delay line and write pointer.
    pub fn reset(&mut self) {
        self.delay_line.fill(0.0);
        self.write_idx = 0;
    }
}
