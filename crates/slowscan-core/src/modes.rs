//! SSTV mode registry and wire-level frequency constants.
//!
//! Every tone frequency in this module is fixed by the SSTV conventions
//! and must not be tuned. The mode registry maps the 7-bit VIS code to a
//! [`ModeDescriptor`]; PD scan-line timings live in a second registry so
//! that future families can reuse the descriptor table without carrying
//! PD-specific fields.
//!
//! ## Example
//!
//! ```rust
//! use slowscan_core::modes::{lookup_mode, pd_timings, SstvFamily};
//!
//! let mode = lookup_mode(95);
//! assert_eq!(mode.name, "PD120");
//! assert_eq!((mode.width, mode.height), (640, 496));
//! assert_eq!(mode.family, SstvFamily::Pd);
//!
//! let timings = pd_timings(95).unwrap();
//! assert!((timings.segment_ms - 121.6).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{SstvError, SstvResult};

/// Horizontal sync tone (also VIS start/stop/break).
pub const SYNC_FREQ: f64 = 1200.0;
/// Frequency mapped to luminance 0.
pub const BLACK_FREQ: f64 = 1500.0;
/// Frequency mapped to luminance 255.
pub const WHITE_FREQ: f64 = 2300.0;
/// Width of the luminance band.
pub const FREQ_RANGE: f64 = WHITE_FREQ - BLACK_FREQ;

/// VIS data bit value 1.
pub const VIS_LOGIC_1_FREQ: f64 = 1100.0;
/// VIS data bit value 0.
pub const VIS_LOGIC_0_FREQ: f64 = 1300.0;
/// Leader burst tone before and after the VIS break.
pub const VIS_LEADER_FREQ: f64 = 1900.0;

/// Leader burst duration in milliseconds.
pub const VIS_LEADER_MS: f64 = 300.0;
/// Break duration between the two leader bursts.
pub const VIS_BREAK_MS: f64 = 10.0;
/// Duration of the start, data, parity and stop bits.
pub const VIS_BIT_MS: f64 = 30.0;

/// The calibration preamble: eight 100 ms tones preceding the leader.
pub const PREAMBLE_TONES: [(f64, f64); 8] = [
    (1900.0, 100.0),
    (1500.0, 100.0),
    (1900.0, 100.0),
    (1500.0, 100.0),
    (2300.0, 100.0),
    (1500.0, 100.0),
    (2300.0, 100.0),
    (1500.0, 100.0),
];

/// SSTV mode family. Only PD is demodulated; the variant set is open so
/// that registering a Martin or Scottie table later is additive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SstvFamily {
    /// PD modes: two rows per six-segment group, shared chrominance.
    Pd,
    /// VIS code not present in the registry.
    Unknown,
}

/// Stable identity of an SSTV mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModeDescriptor {
    pub name: &'static str,
    pub vis_code: u8,
    pub width: usize,
    pub height: usize,
    /// Nominal full-image transmission time in seconds.
    pub duration_s: f64,
    pub family: SstvFamily,
}

/// Scan-line timings shared by the PD demodulator, keyed by VIS code.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PdTimings {
    pub sync_ms: f64,
    pub porch_ms: f64,
    /// Duration of each of the four data segments (Y1, R-Y, B-Y, Y2).
    pub segment_ms: f64,
}

const MODE_REGISTRY: [ModeDescriptor; 6] = [
    ModeDescriptor {
        name: "PD50",
        vis_code: 93,
        width: 320,
        height: 256,
        duration_s: 50.0,
        family: SstvFamily::Pd,
    },
    ModeDescriptor {
        name: "PD120",
        vis_code: 95,
        width: 640,
        height: 496,
        duration_s: 126.0,
        family: SstvFamily::Pd,
    },
    ModeDescriptor {
        name: "PD180",
        vis_code: 96,
        width: 640,
        height: 496,
        duration_s: 187.0,
        family: SstvFamily::Pd,
    },
    ModeDescriptor {
        name: "PD240",
        vis_code: 97,
        width: 640,
        height: 496,
        duration_s: 248.0,
        family: SstvFamily::Pd,
    },
    ModeDescriptor {
        name: "PD160",
        vis_code: 98,
        width: 512,
        height: 400,
        duration_s: 161.0,
        family: SstvFamily::Pd,
    },
    ModeDescriptor {
        name: "PD90",
        vis_code: 99,
        width: 320,
        height: 256,
        duration_s: 90.0,
        family: SstvFamily::Pd,
    },
];

const PD_SYNC_MS: f64 = 20.0;
const PD_PORCH_MS: f64 = 2.08;

const PD_TIMING_REGISTRY: [(u8, PdTimings); 6] = [
    (
        93,
        PdTimings {
            sync_ms: PD_SYNC_MS,
            porch_ms: PD_PORCH_MS,
            segment_ms: 91.52,
        },
    ),
    (
        95,
        PdTimings {
            sync_ms: PD_SYNC_MS,
            porch_ms: PD_PORCH_MS,
            segment_ms: 121.6,
        },
    ),
    (
        96,
        PdTimings {
            sync_ms: PD_SYNC_MS,
            porch_ms: PD_PORCH_MS,
            segment_ms: 183.04,
        },
    ),
    (
        97,
        PdTimings {
            sync_ms: PD_SYNC_MS,
            porch_ms: PD_PORCH_MS,
            segment_ms: 244.48,
        },
    ),
    (
        98,
        PdTimings {
            sync_ms: PD_SYNC_MS,
            porch_ms: PD_PORCH_MS,
            segment_ms: 195.854,
        },
    ),
    (
        99,
        PdTimings {
            sync_ms: PD_SYNC_MS,
            porch_ms: PD_PORCH_MS,
            segment_ms: 170.24,
        },
    ),
];

/// Look up a VIS code in the mode registry.
///
/// Unknown codes yield a synthetic descriptor with
/// [`SstvFamily::Unknown`] that still carries the raw code, so callers
/// can log or display what was actually transmitted.
pub fn lookup_mode(vis_code: u8) -> ModeDescriptor {
    MODE_REGISTRY
        .iter()
        .find(|m| m.vis_code == vis_code)
        .copied()
        .unwrap_or(ModeDescriptor {
            name: "Unknown",
            vis_code,
            width: 0,
            height: 0,
            duration_s: 0.0,
            family: SstvFamily::Unknown,
        })
}

/// Scan-line timings for a PD mode, if registered.
pub fn pd_timings(vis_code: u8) -> Option<PdTimings> {
    PD_TIMING_REGISTRY
        .iter()
        .find(|(code, _)| *code == vis_code)
        .map(|(_, t)| *t)
}

/// Resolve the timings a demodulator needs for a detected mode.
///
/// Fails with [`SstvError::UnsupportedMode`] for families this crate
/// cannot demodulate, and with [`SstvError::MissingTimings`] for a PD
/// code that has no entry in the timing registry.
pub fn demodulation_timings(mode: &ModeDescriptor) -> SstvResult<PdTimings> {
    match mode.family {
        SstvFamily::Pd => pd_timings(mode.vis_code).ok_or(SstvError::MissingTimings {
            vis_code: mode.vis_code,
        }),
        _ => Err(SstvError::UnsupportedMode {
            vis_code: mode.vis_code,
        }),
    }
}
