//! VIS Decoder — FSK header recognition state machine.
//!
//! Walks the calibration preamble, the 1900 Hz leader bursts around the
//! 10 ms break, then clocks out start bit, seven data bits (LSB first),
//! even parity and stop bit. Input is one frequency estimate per sample;
//! a short median filter rejects discriminator glitches before any state
//! logic sees them.
//!
//! Timing discipline: each state counts every sample since entry and
//! fires its transition on an in-tolerance sample once the nominal
//! duration has elapsed. A run of off-tolerance samples longer than
//! [`MAX_ERROR_TIME_MS`] resets the machine to idle; an in-tolerance
//! sample clears the run. Losing the carrier entirely (estimates under
//! 100 Hz) resets immediately.
//!
//! ## Example
//!
//! ```rust
//! use slowscan_core::vis_decoder::VisDecoder;
//!
//! let mut vis = VisDecoder::new(11025.0, 9);
//! // 2 s of dead air never produces a mode
//! for _ in 0..22050 {
//!     assert!(vis.process_frequency(0.0).is_none());
//! }
//! ```

use crate::median_filter::MedianFilter;
use crate::modes::{
    lookup_mode, ModeDescriptor, PREAMBLE_TONES, SYNC_FREQ, VIS_BIT_MS, VIS_BREAK_MS,
    VIS_LEADER_FREQ, VIS_LEADER_MS,
};
use crate::types::Frequency;

/// Tolerance around each target tone.
pub const FREQ_TOLERANCE_HZ: f64 = 60.0;

/// Longest tolerated run of off-tolerance samples.
pub const MAX_ERROR_TIME_MS: f64 = 15.0;

/// Estimates below this are treated as loss of signal.
const SIGNAL_LOSS_HZ: f64 = 100.0;

/// How much of the first preamble tone may be missed while the DSP chain
/// warms up and still be accepted.
const IDLE_LATCH_SLACK_MS: f64 = 12.0;

/// Data/parity bits below this average frequency decode as 1.
const BIT_THRESHOLD_HZ: f64 = 1200.0;

const DATA_BIT_COUNT: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisState {
    Idle,
    Preamble,
    LeaderBurst1,
    Break,
    LeaderBurst2,
    StartBit,
    DataBits,
    ParityBit,
    StopBit,
    Complete,
}

/// Streaming VIS header decoder.
#[derive(Debug, Clone)]
pub struct VisDecoder {
    samples_per_ms: f64,
    median: MedianFilter,

    state: VisState,
    state_timer: f64,
    error_samples: f64,
    preamble_step: usize,

    data_bits: u8,
    bits_decoded: u32,
    bit_freq_accum: f64,
    bit_sample_count: u32,
}

impl VisDecoder {
    /// Create a decoder for frequency estimates at `sample_rate`.
    pub fn new(sample_rate: f64, median_window: usize) -> Self {
        assert!(sample_rate > 0.0, "sample_rate must be positive");
        Self {
            samples_per_ms: sample_rate / 1000.0,
            median: MedianFilter::new(median_window),
            state: VisState::Idle,
            state_timer: 0.0,
            error_samples: 0.0,
            preamble_step: 0,
            data_bits: 0,
            bits_decoded: 0,
            bit_freq_accum: 0.0,
            bit_sample_count: 0,
        }
    }

    /// Whether a header has been fully decoded since the last reset.
    pub fn is_complete(&self) -> bool {
        self.state == VisState::Complete
    }

    /// Return to idle, forgetting any partial header.
    pub fn reset(&mut self) {
        self.state = VisState::Idle;
        self.state_timer = 0.0;
        self.error_samples = 0.0;
        self.preamble_step = 0;
        self.data_bits = 0;
        self.bits_decoded = 0;
        self.bit_freq_accum = 0.0;
        self.bit_sample_count = 0;
        self.median.reset();
    }

    fn transition(&mut self, next: VisState) {
        self.state = next;
        self.state_timer = 0.0;
        self.error_samples = 0.0;
        self.bit_freq_accum = 0.0;
        self.bit_sample_count = 0;
    }

    fn near(freq: Frequency, target: Frequency) -> bool {
        (freq - target).abs() < FREQ_TOLERANCE_HZ
    }

    /// Tolerate a stray sample; reset once the error budget is spent.
    fn tolerate_error(&mut self) {
        self.error_samples += 1.0;
        if self.error_samples > MAX_ERROR_TIME_MS * self.samples_per_ms {
            self.reset();
        }
    }

    /// Feed one raw frequency estimate. Returns the decoded descriptor
    /// on the sample that completes a valid header.
    pub fn process_frequency(&mut self, raw: Frequency) -> Option<ModeDescriptor> {
        let freq = self.median.process_sample(raw);

        if freq < SIGNAL_LOSS_HZ {
            if self.state != VisState::Idle || self.state_timer > 0.0 {
                self.reset();
            }
            return None;
        }

        self.state_timer += 1.0;

        match self.state {
            VisState::Idle => {
                let (tone, duration_ms) = PREAMBLE_TONES[0];
                if Self::near(freq, tone) {
                    let required = (duration_ms - IDLE_LATCH_SLACK_MS) * self.samples_per_ms;
                    if self.state_timer >= required {
                        self.preamble_step = 1;
                        self.transition(VisState::Preamble);
                    }
                } else {
                    self.state_timer = 0.0;
                }
            }

            VisState::Preamble => {
                let (tone, duration_ms) = PREAMBLE_TONES[self.preamble_step];
                if Self::near(freq, tone) {
                    self.error_samples = 0.0;
                    if self.state_timer >= duration_ms * self.samples_per_ms {
                        self.preamble_step += 1;
                        if self.preamble_step >= PREAMBLE_TONES.len() {
                            self.transition(VisState::LeaderBurst1);
                        } else {
                            self.state_timer = 0.0;
                            self.error_samples = 0.0;
                        }
                    }
                } else {
                    self.tolerate_error();
                }
            }

            VisState::LeaderBurst1 => {
                self.expect_tone(VIS_LEADER_FREQ, VIS_LEADER_MS, freq, VisState::Break);
            }

            VisState::Break => {
                self.expect_tone(SYNC_FREQ, VIS_BREAK_MS, freq, VisState::LeaderBurst2);
            }

            VisState::LeaderBurst2 => {
                self.expect_tone(VIS_LEADER_FREQ, VIS_LEADER_MS, freq, VisState::StartBit);
            }

            VisState::StartBit => {
                self.expect_tone(SYNC_FREQ, VIS_BIT_MS, freq, VisState::DataBits);
            }

            VisState::DataBits => {
                self.bit_freq_accum += freq;
                self.bit_sample_count += 1;
                if self.state_timer >= VIS_BIT_MS * self.samples_per_ms {
                    let avg = self.bit_freq_accum / self.bit_sample_count as f64;
                    if avg < BIT_THRESHOLD_HZ {
                        self.data_bits |= 1u8 << self.bits_decoded;
                    }
                    self.bits_decoded += 1;
                    self.state_timer = 0.0;
                    self.bit_freq_accum = 0.0;
                    self.bit_sample_count = 0;
                    if self.bits_decoded >= DATA_BIT_COUNT {
                        self.transition(VisState::ParityBit);
                    }
                }
            }

            VisState::ParityBit => {
                self.bit_freq_accum += freq;
                self.bit_sample_count += 1;
                if self.state_timer >= VIS_BIT_MS * self.samples_per_ms {
                    let avg = self.bit_freq_accum / self.bit_sample_count as f64;
                    let parity_bit = u32::from(avg < BIT_THRESHOLD_HZ);
                    let ones = self.data_bits.count_ones();
                    if (ones + parity_bit) % 2 == 0 {
                        self.transition(VisState::StopBit);
                    } else {
                        tracing::debug!(
                            vis_code = self.data_bits,
                            "VIS parity check failed, restarting header search"
                        );
                        self.reset();
                    }
                }
            }

            VisState::StopBit => {
                if Self::near(freq, SYNC_FREQ) {
                    self.error_samples = 0.0;
                    if self.state_timer >= VIS_BIT_MS * self.samples_per_ms {
                        let mode = lookup_mode(self.data_bits);
                        self.state = VisState::Complete;
                        return Some(mode);
                    }
                } else {
                    self.tolerate_error();
                }
            }

            VisState::Complete => {}
        }

        None
    }

    /// Shared discipline for the fixed-tone states.
    fn expect_tone(
        &mut self,
        target: Frequency,
        duration_ms: f64,
        freq: Frequency,
        next: VisState,
    ) {
        if Self::near(freq, target) {
            self.error_samples = 0.0;
            if self.state_timer >= duration_ms * self.samples_per_ms {
                self.transition(next);
            }
        } else {
            self.tolerate_error();
        }
    }
}
