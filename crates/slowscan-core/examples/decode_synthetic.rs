//! Decode a synthesized PD120 header and report the detected mode.
//!
//! Run with: `cargo run --example decode_synthetic`

use slowscan_core::modes::{
    PREAMBLE_TONES, SYNC_FREQ, VIS_BIT_MS, VIS_BREAK_MS, VIS_LEADER_FREQ, VIS_LEADER_MS,
    VIS_LOGIC_0_FREQ, VIS_LOGIC_1_FREQ,
};
use slowscan_core::SstvDecoder;

const RATE: f64 = 11025.0;

/// Render a (frequency, ms) schedule to audio by phase integration.
fn synthesize(spec: &[(f64, f64)]) -> Vec<f32> {
    let mut out = Vec::new();
    let mut phase = 0.0f64;
    let mut cursor_ms = 0.0f64;
    for &(freq, ms) in spec {
        cursor_ms += ms;
        let until = (cursor_ms / 1000.0 * RATE).round() as usize;
        while out.len() < until {
            phase = (phase + std::f64::consts::TAU * freq / RATE) % std::f64::consts::TAU;
            out.push((0.8 * phase.sin()) as f32);
        }
    }
    out
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // VIS header for PD120 (code 95).
    let code = 95u8;
    let mut spec: Vec<(f64, f64)> = PREAMBLE_TONES.to_vec();
    spec.push((VIS_LEADER_FREQ, VIS_LEADER_MS));
    spec.push((SYNC_FREQ, VIS_BREAK_MS));
    spec.push((VIS_LEADER_FREQ, VIS_LEADER_MS));
    spec.push((SYNC_FREQ, VIS_BIT_MS));
    let mut ones = 0;
    for bit in 0..7 {
        let set = (code >> bit) & 1 == 1;
        ones += usize::from(set);
        spec.push((
            if set { VIS_LOGIC_1_FREQ } else { VIS_LOGIC_0_FREQ },
            VIS_BIT_MS,
        ));
    }
    spec.push((
        if ones % 2 == 1 {
            VIS_LOGIC_1_FREQ
        } else {
            VIS_LOGIC_0_FREQ
        },
        VIS_BIT_MS,
    ));
    spec.push((SYNC_FREQ, VIS_BIT_MS));

    let audio = synthesize(&spec);

    let mut decoder = SstvDecoder::new(RATE);
    decoder.set_on_mode_detected(|mode| {
        println!(
            "detected {} (VIS {}): {}x{}, ~{:.0} s",
            mode.name, mode.vis_code, mode.width, mode.height, mode.duration_s
        );
    });

    for block in audio.chunks(2048) {
        decoder.process(block);
    }
}
