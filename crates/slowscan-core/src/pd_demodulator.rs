//! PD Demodulator — line reconstruction for the PD mode family.
//!
//! A PD transmission carries two image rows per six-segment group:
//!
//! ```text
//! SYNC(20 ms @1200) -> PORCH(2.08 ms @1500)
//!   -> Y1 -> R-Y -> B-Y -> Y2   (segment_ms each)
//! ```
//!
//! Clock discipline is what keeps columns vertical over a two-minute
//! transmission. The sync edge is the only hard re-alignment to the
//! transmitter's clock; between the four data segments the segment timer
//! keeps its fractional residue instead of being zeroed, so rounding
//! error across a full image stays under one sample. During the middle
//! of each sync pulse the decoder measures the carrier offset and folds
//! it into a slow AFC correction applied to every stored frequency.
//!
//! ## Example
//!
//! ```rust
//! use slowscan_core::pd_demodulator::{freq_to_pixel, PdDemodulator};
//! use slowscan_core::modes::{lookup_mode, pd_timings};
//!
//! assert_eq!(freq_to_pixel(1500.0), 0);
//! assert_eq!(freq_to_pixel(2300.0), 255);
//!
//! let mut pd = PdDemodulator::new(11025.0);
//! pd.configure(lookup_mode(95), pd_timings(95).unwrap());
//! assert!(pd.process_frequency(1900.0).is_none()); // idle until a sync edge
//! ```

use crate::modes::{ModeDescriptor, PdTimings, BLACK_FREQ, FREQ_RANGE, SYNC_FREQ, WHITE_FREQ};
use crate::types::{Frequency, Pixel};

/// Tolerance for recognizing the sync tone from idle.
const SYNC_TOLERANCE_HZ: f64 = 60.0;

/// AFC measurement window inside the sync pulse, in milliseconds.
const AFC_WINDOW_START_MS: f64 = 5.0;
const AFC_WINDOW_END_MS: f64 = 15.0;

/// Smoothing factor for the frequency-offset estimate.
const AFC_ALPHA: f64 = 0.1;

/// Earliest point at which sync may hand over to the porch when the
/// corrected frequency already reads closer to black than to sync.
/// Strictly inside the nominal 20 ms sync window.
const SMART_SYNC_MIN_MS: f64 = 15.0;

/// Map a corrected frequency onto a luminance/chrominance byte.
///
/// Linear between [`BLACK_FREQ`] and [`WHITE_FREQ`], clamped outside.
pub fn freq_to_pixel(frequency: Frequency) -> u8 {
    if frequency <= BLACK_FREQ {
        return 0;
    }
    if frequency >= WHITE_FREQ {
        return 255;
    }
    let normalized = (frequency - BLACK_FREQ) / FREQ_RANGE;
    (normalized * 255.0) as u8
}

/// BT.601 fixed-point YCbCr to RGB, Y pedestal 16, chroma centered at 128.
pub fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> Pixel {
    let y = y as i32 - 16;
    let cb = cb as i32 - 128;
    let cr = cr as i32 - 128;
    let r = (298 * y + 409 * cr + 128) >> 8;
    let g = (298 * y - 100 * cb - 208 * cr + 128) >> 8;
    let b = (298 * y + 516 * cb + 128) >> 8;
    Pixel {
        r: r.clamp(0, 255) as u8,
        g: g.clamp(0, 255) as u8,
        b: b.clamp(0, 255) as u8,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Idle,
    Sync,
    Porch,
    Y1,
    Ry,
    By,
    Y2,
}

/// A pair of decoded rows, emitted after each completed group.
#[derive(Debug, Clone)]
pub struct LineGroup {
    /// `(line_index, pixels)` in transmission order.
    pub lines: Vec<(usize, Vec<Pixel>)>,
    /// Set on the group that completes the image.
    pub image_complete: bool,
}

/// Streaming PD image demodulator.
///
/// Must be [`configure`](Self::configure)d with a mode and its timings
/// before it reacts to input; frequencies fed before that are ignored.
#[derive(Debug, Clone)]
pub struct PdDemodulator {
    samples_per_ms: f64,

    mode: Option<ModeDescriptor>,
    timings: Option<PdTimings>,

    segment: Segment,
    segment_timer: f64,
    freq_offset: f64,
    current_line: usize,
    complete: bool,

    segment_buf: Vec<Frequency>,
    y1: Vec<u8>,
    y2: Vec<u8>,
    cr: Vec<u8>,
    cb: Vec<u8>,
}

impl PdDemodulator {
    /// Create a demodulator for frequency estimates at `sample_rate`.
    pub fn new(sample_rate: f64) -> Self {
        assert!(sample_rate > 0.0, "sample_rate must be positive");
        Self {
            samples_per_ms: sample_rate / 1000.0,
            mode: None,
            timings: None,
            segment: Segment::Idle,
            segment_timer: 0.0,
            freq_offset: 0.0,
            current_line: 0,
            complete: false,
            segment_buf: Vec::new(),
            y1: Vec::new(),
            y2: Vec::new(),
            cr: Vec::new(),
            cb: Vec::new(),
        }
    }

    /// Arm the demodulator for one mode. Clears all per-image state.
    pub fn configure(&mut self, mode: ModeDescriptor, timings: PdTimings) {
        self.reset();
        let capacity = (timings.segment_ms * self.samples_per_ms) as usize + 16;
        self.segment_buf.reserve(capacity);
        self.mode = Some(mode);
        self.timings = Some(timings);
    }

    /// Line index the next decoded row will carry.
    pub fn current_line(&self) -> usize {
        self.current_line
    }

    /// Whether a full image has been emitted since `configure`.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Current AFC offset estimate in Hz.
    pub fn frequency_offset(&self) -> f64 {
        self.freq_offset
    }

    /// Drop the configured mode and all per-image state.
    pub fn reset(&mut self) {
        self.mode = None;
        self.timings = None;
        self.segment = Segment::Idle;
        self.segment_timer = 0.0;
        self.freq_offset = 0.0;
        self.current_line = 0;
        self.complete = false;
        self.segment_buf.clear();
        self.y1.clear();
        self.y2.clear();
        self.cr.clear();
        self.cb.clear();
    }

    /// Feed one raw frequency estimate. Returns a [`LineGroup`] on the
    /// sample that completes a group of two rows.
    pub fn process_frequency(&mut self, raw: Frequency) -> Option<LineGroup> {
        let (mode, timings) = match (self.mode, self.timings) {
            (Some(m), Some(t)) => (m, t),
            _ => return None,
        };
        if self.complete {
            return None;
        }

        let corrected = raw - self.freq_offset;
        self.segment_timer += 1.0;

        let sync_samples = timings.sync_ms * self.samples_per_ms;
        let porch_samples = timings.porch_ms * self.samples_per_ms;
        let segment_samples = timings.segment_ms * self.samples_per_ms;

        match self.segment {
            Segment::Idle => {
                // Hard sync: the transmitter's clock is adopted here.
                if (raw - SYNC_FREQ).abs() < SYNC_TOLERANCE_HZ {
                    self.segment = Segment::Sync;
                    self.segment_timer = 0.0;
                }
            }

            Segment::Sync => {
                if self.segment_timer > AFC_WINDOW_START_MS * self.samples_per_ms
                    && self.segment_timer < AFC_WINDOW_END_MS * self.samples_per_ms
                {
                    // Mid-pulse measurement, clear of both edges.
                    let measured = raw - SYNC_FREQ;
                    self.freq_offset = AFC_ALPHA * measured + (1.0 - AFC_ALPHA) * self.freq_offset;
                }

                let smart_exit = self.segment_timer > SMART_SYNC_MIN_MS * self.samples_per_ms
                    && (corrected - BLACK_FREQ).abs() < (corrected - SYNC_FREQ).abs();
                if smart_exit || self.segment_timer >= sync_samples {
                    self.segment = Segment::Porch;
                    self.segment_timer = 0.0;
                }
            }

            Segment::Porch => {
                if self.segment_timer >= porch_samples {
                    self.segment = Segment::Y1;
                    self.segment_timer = 0.0;
                    self.segment_buf.clear();
                }
            }

            Segment::Y1 | Segment::Ry | Segment::By | Segment::Y2 => {
                self.segment_buf.push(corrected);

                if self.segment_timer >= segment_samples {
                    let plane = resample_segment(&self.segment_buf, mode.width);
                    self.segment_buf.clear();

                    match self.segment {
                        Segment::Y1 => {
                            self.y1 = plane;
                            self.segment = Segment::Ry;
                        }
                        Segment::Ry => {
                            self.cr = plane;
                            self.segment = Segment::By;
                        }
                        Segment::By => {
                            self.cb = plane;
                            self.segment = Segment::Y2;
                        }
                        Segment::Y2 => {
                            self.y2 = plane;
                            self.segment = Segment::Idle;
                            // The next sync re-aligns; no carry into idle.
                            self.segment_timer = 0.0;
                            return self.finish_group(&mode);
                        }
                        _ => unreachable!(),
                    }

                    // Keep the sub-sample residue so segment boundaries do
                    // not drift across the group.
                    self.segment_timer -= segment_samples;
                }
            }
        }

        None
    }

    fn finish_group(&mut self, mode: &ModeDescriptor) -> Option<LineGroup> {
        let width = mode.width;
        if self.y1.len() != width
            || self.y2.len() != width
            || self.cr.len() != width
            || self.cb.len() != width
        {
            tracing::warn!(
                y1 = self.y1.len(),
                y2 = self.y2.len(),
                cr = self.cr.len(),
                cb = self.cb.len(),
                width,
                "discarding group with incomplete segment planes"
            );
            self.y1.clear();
            self.y2.clear();
            self.cr.clear();
            self.cb.clear();
            return None;
        }

        let mut lines = Vec::with_capacity(2);
        for plane in [&self.y1, &self.y2] {
            if self.current_line >= mode.height {
                break;
            }
            let row: Vec<Pixel> = (0..width)
                .map(|i| ycbcr_to_rgb(plane[i], self.cb[i], self.cr[i]))
                .collect();
            lines.push((self.current_line, row));
            self.current_line += 1;
        }

        let image_complete = self.current_line >= mode.height;
        if image_complete {
            self.complete = true;
        }
        if lines.is_empty() {
            return None;
        }
        Some(LineGroup {
            lines,
            image_complete,
        })
    }
}

/// Shrink a segment's frequency record to `width` pixels.
///
/// Frequencies are interpolated first and only then quantized, which
/// avoids staircasing in dark regions where one code is ~3 Hz wide.
fn resample_segment(buffer: &[Frequency], width: usize) -> Vec<u8> {
    if buffer.is_empty() {
        return vec![0; width];
    }
    let src_len = buffer.len() as f64;
    (0..width)
        .map(|i| {
            let pos = i as f64 / width as f64 * src_len;
            let idx_a = pos as usize;
            let idx_b = (idx_a + 1).min(buffer.len() - 1);
            let weight = pos - idx_a as f64;
            let freq = buffer[idx_a] * (1.0 - weight) + buffer[idx_b] * weight;
            freq_to_pixel(freq)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::{lookup_mode, pd_timings};

    const FS: f64 = 11025.0;

    fn configured() -> PdDemodulator {
        let mut pd = PdDemodulator::new(FS);
        pd.configure(lookup_mode(95), pd_timings(95).unwrap());
        pd
    }

    /// Render a (frequency, ms) schedule to one estimate per sample.
    fn render(spec: &[(f64, f64)]) -> Vec<f64> {
        let mut out = Vec::new();
        let mut cursor = 0.0f64;
        let mut emitted = 0usize;
        for &(freq, ms) in spec {
            cursor += ms;
            let until = (cursor / 1000.0 * FS).round() as usize;
            while emitted < until {
                out.push(freq);
                emitted += 1;
            }
        }
        out
    }

    /// One PD120 group: flat tones per segment. A few milliseconds of
    /// grey tail let the final segment boundary fire; the demodulator
    /// sits in idle through the tail until the next sync.
    fn group_spec(y1: f64, ry: f64, by: f64, y2: f64) -> Vec<(f64, f64)> {
        vec![
            (1200.0, 20.0),
            (1500.0, 2.08),
            (y1, 121.6),
            (ry, 121.6),
            (by, 121.6),
            (y2, 121.6),
            (1900.0, 5.0),
        ]
    }

    fn drive(pd: &mut PdDemodulator, freqs: &[f64]) -> Vec<LineGroup> {
        freqs
            .iter()
            .filter_map(|&f| pd.process_frequency(f))
            .collect()
    }

    #[test]
    fn test_freq_to_pixel_anchors() {
        assert_eq!(freq_to_pixel(1500.0), 0);
        assert_eq!(freq_to_pixel(2300.0), 255);
        let mid = freq_to_pixel(1900.0);
        assert!(mid == 127 || mid == 128, "mid tone gave {mid}");
    }

    #[test]
    fn test_freq_to_pixel_clamps() {
        assert_eq!(freq_to_pixel(300.0), 0);
        assert_eq!(freq_to_pixel(1200.0), 0);
        assert_eq!(freq_to_pixel(9000.0), 255);
    }

    #[test]
    fn test_freq_to_pixel_monotonic() {
        let mut last = 0u8;
        for f in (1500..=2300).step_by(10) {
            let v = freq_to_pixel(f as f64);
            assert!(v >= last, "not monotonic at {f}");
            last = v;
        }
    }

    #[test]
    fn test_ycbcr_black_and_white() {
        assert_eq!(ycbcr_to_rgb(16, 128, 128), Pixel::rgb(0, 0, 0));
        let white = ycbcr_to_rgb(235, 128, 128);
        assert!(white.r >= 254 && white.g >= 254 && white.b >= 254);
    }

    #[test]
    fn test_ycbcr_clamps() {
        let p = ycbcr_to_rgb(0, 255, 0);
        assert!(p.r <= 255 && p.g <= 255);
        let q = ycbcr_to_rgb(255, 0, 255);
        assert_eq!(q.r, 255);
    }

    #[test]
    fn test_unconfigured_ignores_input() {
        let mut pd = PdDemodulator::new(FS);
        for _ in 0..10_000 {
            assert!(pd.process_frequency(1200.0).is_none());
        }
    }

    #[test]
    fn test_full_image_line_count_and_order() {
        let mut pd = configured();
        let one_group = render(&group_spec(1900.0, 1900.0, 1900.0, 1900.0));
        let mut groups = Vec::new();
        for _ in 0..248 {
            groups.extend(drive(&mut pd, &one_group));
        }
        assert_eq!(groups.len(), 248);

        let mut expected = 0usize;
        for g in &groups {
            for (idx, row) in &g.lines {
                assert_eq!(*idx, expected);
                assert_eq!(row.len(), 640);
                expected += 1;
            }
        }
        assert_eq!(expected, 496);
        assert!(groups.last().unwrap().image_complete);
        assert!(groups[..247].iter().all(|g| !g.image_complete));
        assert!(pd.is_complete());
    }

    #[test]
    fn test_flat_grey_pixels() {
        let mut pd = configured();
        let stream = render(&group_spec(1900.0, 1900.0, 1900.0, 1900.0));
        let groups = drive(&mut pd, &stream);
        assert_eq!(groups.len(), 1);
        let expected = ycbcr_to_rgb(127, 127, 127);
        for (_, row) in &groups[0].lines {
            for px in &row[5..635] {
                assert!(
                    (px.r as i32 - expected.r as i32).abs() <= 2
                        && (px.g as i32 - expected.g as i32).abs() <= 2
                        && (px.b as i32 - expected.b as i32).abs() <= 2,
                    "pixel {px:?} vs {expected:?}"
                );
            }
        }
    }

    #[test]
    fn test_column_alignment_across_groups() {
        // A black-to-white step in the middle of every luminance segment
        // must land on the same column in every row. This is what the
        // fractional segment-timer carry buys.
        let mut pd = configured();
        let spec: Vec<(f64, f64)> = vec![
            (1200.0, 20.0),
            (1500.0, 2.08),
            (1500.0, 60.8),
            (2300.0, 60.8), // Y1: half black, half white
            (1900.0, 121.6),
            (1900.0, 121.6),
            (1500.0, 60.8),
            (2300.0, 60.8), // Y2: same step
            (1900.0, 5.0),
        ];
        let one_group = render(&spec);
        let mut groups = Vec::new();
        for _ in 0..20 {
            groups.extend(drive(&mut pd, &one_group));
        }
        assert_eq!(groups.len(), 20);

        for g in &groups {
            for (idx, row) in &g.lines {
                let col = row
                    .iter()
                    .position(|p| p.r > 128)
                    .expect("no white region in row");
                assert!(
                    (316..=324).contains(&col),
                    "line {idx}: step at column {col}"
                );
            }
        }
    }

    #[test]
    fn test_afc_cancels_carrier_drift() {
        let spec = group_spec(1900.0, 1900.0, 1900.0, 1900.0);
        let clean = render(&spec);
        let drifted: Vec<f64> = clean.iter().map(|f| f + 30.0).collect();

        let mut pd_clean = configured();
        let mut pd_drifted = configured();
        let mut ref_groups = Vec::new();
        let mut afc_groups = Vec::new();
        for _ in 0..3 {
            ref_groups.extend(drive(&mut pd_clean, &clean));
            afc_groups.extend(drive(&mut pd_drifted, &drifted));
        }
        assert_eq!(ref_groups.len(), afc_groups.len());
        assert!(pd_drifted.frequency_offset() > 20.0);

        for (r, a) in ref_groups.iter().zip(afc_groups.iter()) {
            for ((_, rr), (_, ar)) in r.lines.iter().zip(a.lines.iter()) {
                for (rp, ap) in rr[5..635].iter().zip(ar[5..635].iter()) {
                    assert!(
                        (rp.r as i32 - ap.r as i32).abs() <= 4,
                        "{rp:?} vs {ap:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_truncated_image_never_completes() {
        let mut pd = configured();
        let one_group = render(&group_spec(1900.0, 1900.0, 1900.0, 1900.0));
        let mut groups = Vec::new();
        for _ in 0..100 {
            groups.extend(drive(&mut pd, &one_group));
        }
        assert_eq!(groups.len(), 100);
        assert_eq!(pd.current_line(), 200);
        assert!(!pd.is_complete());
        assert!(groups.iter().all(|g| !g.image_complete));
    }

    #[test]
    fn test_complete_image_goes_quiet() {
        let mut pd = configured();
        let one_group = render(&group_spec(1900.0, 1900.0, 1900.0, 1900.0));
        for _ in 0..248 {
            drive(&mut pd, &one_group);
        }
        assert!(pd.is_complete());
        // Further groups are ignored until reconfigured.
        assert!(drive(&mut pd, &one_group).is_empty());
    }

    #[test]
    fn test_reset_requires_reconfigure() {
        let mut pd = configured();
        let one_group = render(&group_spec(1900.0, 1900.0, 1900.0, 1900.0));
        drive(&mut pd, &one_group);
        pd.reset();
        assert_eq!(pd.current_line(), 0);
        assert!(drive(&mut pd, &one_group).is_empty());
    }
}
