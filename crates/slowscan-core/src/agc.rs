//! AGC — peak-envelope automatic gain control.
//!
//! Tracks the signal envelope with a fast attack and slow release, then
//! applies `target / envelope` gain smoothed through a one-pole so gain
//! changes do not modulate the tone being measured. Must run after DC
//! removal; a bias would dominate the envelope.
//!
//! ## Example
//!
//! ```rust
//! use slowscan_core::agc::{Agc, AgcConfig};
//!
//! let mut agc = Agc::new(AgcConfig::default());
//! let quiet: Vec<f32> = (0..8000).map(|i| 0.05 * (i as f32 * 0.7).sin()).collect();
//! let out = agc.process(&quiet);
//! let peak = out[6000..].iter().fold(0.0f32, |m, &x| m.max(x.abs()));
//! assert!(peak > 0.3, "gain should pull quiet input up, got {peak}");
//! ```

use crate::types::Sample;

/// AGC tuning parameters.
#[derive(Debug, Clone)]
pub struct AgcConfig {
    /// Target envelope amplitude.
    pub target: f32,
    /// Envelope coefficient while the signal grows (fast).
    pub attack: f32,
    /// Envelope coefficient while the signal shrinks (slow).
    pub release: f32,
    /// Gain ceiling, reached during dropouts and silence.
    pub max_gain: f32,
}

impl Default for AgcConfig {
    fn default() -> Self {
        Self {
            target: 0.5,
            attack: 0.01,
            release: 0.001,
            max_gain: 1e5,
        }
    }
}

/// Peak-envelope AGC with asymmetric attack/release.
#[derive(Debug, Clone)]
pub struct Agc {
    config: AgcConfig,
    envelope: f32,
    gain: f32,
}

/// Below this envelope the gain is frozen instead of chased toward
/// infinity during silence.
const ENVELOPE_FLOOR: f32 = 1e-6;

/// One-pole smoothing applied to the gain itself.
const GAIN_SMOOTHING: f32 = 0.1;

impl Agc {
    /// Create an AGC from a configuration.
    pub fn new(config: AgcConfig) -> Self {
        assert!(config.target > 0.0, "target must be positive");
        assert!(
            config.attack > 0.0 && config.attack <= 1.0,
            "attack must be in (0, 1]"
        );
        assert!(
            config.release > 0.0 && config.release <= 1.0,
            "release must be in (0, 1]"
        );
        Self {
            config,
            envelope: 0.0,
            gain: 1.0,
        }
    }

    /// Current applied gain.
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Process one sample.
    pub fn process_sample(&mut self, input: Sample) -> Sample {
        let magnitude = input.abs();
        let coeff = if magnitude > self.envelope {
            self.config.attack
        } else {
            self.config.release
        };
        self.envelope = coeff * magnitude + (1.0 - coeff) * self.envelope;

        if self.envelope > ENVELOPE_FLOOR {
            let desired = self.config.target / self.envelope;
            let smoothed = GAIN_SMOOTHING * desired + (1.0 - GAIN_SMOOTHING) * self.gain;
            self.gain = smoothed.min(self.config.max_gain);
        }

        input * self.gain
    }

    /// Process a block of samples.
    pub fn process(&mut self, input: &[Sample]) -> Vec<Sample> {
        input.iter().map(|&x| self.process_sample(x)).collect()
    }

    /// Reset envelope and gain.
    pub fn reset(&mut self) {
        self.envelope = 0.0;
        self.gain = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn tone(amplitude: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| amplitude * (2.0 * PI * 1900.0 * i as f32 / 11025.0).sin())
            .collect()
    }

    #[test]
    fn test_boosts_quiet_signal() {
        let mut agc = Agc::new(AgcConfig::default());
        let out = agc.process(&tone(0.05, 12000));
        let peak = out[10000..].iter().fold(0.0f32, |m, &x| m.max(x.abs()));
        assert!(peak > 0.35 && peak < 1.0, "peak {peak}");
    }

    #[test]
    fn test_tames_loud_signal() {
        let mut agc = Agc::new(AgcConfig::default());
        let out = agc.process(&tone(4.0, 12000));
        let peak = out[10000..].iter().fold(0.0f32, |m, &x| m.max(x.abs()));
        assert!(peak < 1.0, "peak {peak}");
    }

    #[test]
    fn test_silence_respects_gain_ceiling() {
        let mut agc = Agc::new(AgcConfig::default());
        agc.process(&tone(0.5, 4000));
        let out = agc.process(&vec![0.0; 40000]);
        assert!(agc.gain() <= AgcConfig::default().max_gain);
        assert!(out.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_output_finite_for_zero_input() {
        let mut agc = Agc::new(AgcConfig::default());
        for _ in 0..1000 {
            assert!(agc.process_sample(0.0).is_finite());
        }
    }

    #[test]
    fn test_reset() {
        let mut agc = Agc::new(AgcConfig::default());
        agc.process(&tone(0.01, 5000));
        agc.reset();
        assert_eq!(agc.gain(), 1.0);
    }
}
