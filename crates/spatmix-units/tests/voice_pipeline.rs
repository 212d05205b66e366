// SPDX-License-Identifier: LGPL-3.0-or-later
//
// End-to-end checks of a voice: configuration picks a resampler, the
// resampler feeds per-channel gains and an HRTF filter.

use std::f32::consts::PI;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use spatmix_lib::fixed::{Phase, increment_from_pitch, source_span};
use spatmix_lib::types::{BUFFER_SIZE, ChannelBuffer, FRACTION_ONE};
use spatmix_units::config::MixerConfig;
use spatmix_units::gains::ChannelGains;
use spatmix_units::hrtf::HrtfFilter;
use spatmix_units::resampler::{Resampler, SourceResampler};

// ─── Test helpers ──────────────────────────────────────────────────────

/// Sine of `cycles_per_sample` whose sample `i` sits at time `i - offset`.
fn sine(len: usize, cycles_per_sample: f32, offset: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (2.0 * PI * cycles_per_sample * (i as f32 - offset as f32)).sin())
        .collect()
}

fn max_abs_error(actual: &[f32], expected: impl Fn(usize) -> f32) -> f32 {
    actual
        .iter()
        .enumerate()
        .map(|(i, &y)| (y - expected(i)).abs())
        .fold(0.0, f32::max)
}

// ═══════════════════════════════════════════════════════════════════════
// Resampling accuracy
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn every_resampler_tracks_a_slow_sine() {
    const FREQ: f32 = 0.01;
    for kind in Resampler::ALL {
        let resampler = SourceResampler::new(kind);
        let pad = resampler.lookback();
        let src = sine(4096, FREQ, pad);

        for pitch in [0.5f32, 0.75, 1.0, 1.25, 1.5] {
            let increment = increment_from_pitch(pitch);
            let frac = FRACTION_ONE / 3;
            let mut dst = vec![0.0f32; 1024];
            let out = resampler.process(&src, pad, frac, increment, &mut dst);

            let error = max_abs_error(out, |i| {
                let t = (frac as f64 + increment as f64 * i as f64) / FRACTION_ONE as f64;
                (2.0 * std::f64::consts::PI * FREQ as f64 * t).sin() as f32
            });
            let tolerance = if kind == Resampler::Point { 0.07 } else { 3e-3 };
            assert!(
                error <= tolerance,
                "{kind} at pitch {pitch}: error {error} > {tolerance}"
            );
        }
    }
}

#[test]
fn sinc_resamplers_reject_content_above_the_new_nyquist() {
    // 0.4 cycles/sample played at double speed would alias to 0.2 output
    // cycles/sample; the downsampling scale must attenuate it.
    for kind in [Resampler::Bsinc12, Resampler::Bsinc24] {
        let resampler = SourceResampler::new(kind);
        let pad = resampler.lookback();
        let src = sine(8192, 0.4, pad);
        let mut dst = vec![0.0f32; 1024];
        let out = resampler.process(&src, pad, 0, 2 * FRACTION_ONE, &mut dst);
        let rms = (out[64..].iter().map(|y| y * y).sum::<f32>() / (out.len() - 64) as f32).sqrt();
        assert!(rms < 0.1, "{kind}: aliased rms {rms}");
    }
}

#[test]
fn block_splitting_does_not_change_output() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let src: Vec<f32> = (0..8192).map(|_| rng.random::<f32>() * 2.0 - 1.0).collect();

    for kind in Resampler::ALL {
        let resampler = SourceResampler::new(kind);
        let pad = resampler.lookback();
        for _ in 0..10 {
            let increment = rng.random_range(FRACTION_ONE / 4..=2 * FRACTION_ONE);
            let frac = rng.random_range(0..FRACTION_ONE);

            let mut whole = vec![0.0f32; 1500];
            let expected = resampler.process(&src, pad, frac, increment, &mut whole).to_vec();

            let mut pieces = Vec::with_capacity(1500);
            let mut phase = Phase::new(pad as isize, frac);
            while pieces.len() < 1500 {
                let n = rng.random_range(1..=300).min(1500 - pieces.len());
                let mut block = vec![0.0f32; n];
                let out = resampler.process(&src, phase.pos as usize, phase.frac, increment, &mut block);
                pieces.extend_from_slice(out);
                phase = phase.advance(increment, n);
            }

            assert_eq!(pieces, expected, "{kind} increment {increment}");
        }
    }
}

#[test]
fn source_span_covers_kernel_reads() {
    // A source exactly as long as lookback + span + lookahead is enough.
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    for kind in Resampler::ALL {
        let resampler = SourceResampler::new(kind);
        for _ in 0..20 {
            let increment = rng.random_range(1..=3 * FRACTION_ONE);
            let frac = rng.random_range(0..FRACTION_ONE);
            let n = rng.random_range(1..=512);
            let len = resampler.lookback() + source_span(frac, increment, n) + resampler.lookahead();
            let src = vec![0.5f32; len];
            let mut dst = vec![0.0f32; n];
            resampler.process(&src, resampler.lookback(), frac, increment, &mut dst);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Full voice
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn configured_voice_renders_to_speakers_and_headphones() {
    let config = MixerConfig::from_toml_str(
        r#"
        resampler = "bsinc12"
        hrtf_fade_samples = 32
        "#,
    )
    .unwrap();
    let resampler = SourceResampler::new(config.resampler());
    assert_eq!(resampler.kind(), Resampler::Bsinc12);

    let pad = resampler.lookback();
    let src = sine(4096, 0.02, pad);
    let increment = increment_from_pitch(1.1);
    let block = 256;

    let mut gains = ChannelGains::new(2);
    gains.set_target(&[0.8, 0.2], config.hrtf_fade_samples);
    let mut speakers: Vec<ChannelBuffer> = vec![[0.0; BUFFER_SIZE]; 2];

    let mut filter = HrtfFilter::new(8);
    filter.set_target(
        &[[0.6, 0.3], [0.3, 0.2], [0.1, 0.1]],
        [0, 4],
        1.0,
        config.hrtf_fade_samples,
    );
    let mut left = vec![0.0f32; BUFFER_SIZE];
    let mut right = vec![0.0f32; BUFFER_SIZE];

    let mut phase = Phase::new(pad as isize, 0);
    let mut scratch = vec![0.0f32; block];
    for b in 0..4 {
        let out = resampler.process(&src, phase.pos as usize, phase.frac, increment, &mut scratch);
        gains.mix(out, &mut speakers, b * block);
        filter.process(out, &mut left, &mut right, b * block);
        phase = phase.advance(increment, block);
    }

    assert_eq!(gains.current(), &[0.8, 0.2]);
    let rendered = 4 * block;
    for chan in &speakers {
        assert!(chan[..rendered].iter().all(|y| y.is_finite()));
    }

    // Past the fade, the speaker feeds are the resampled signal scaled by
    // the target gains.
    for i in 64..rendered {
        let diff = (speakers[1][i] - 0.25 * speakers[0][i]).abs();
        assert!(diff < 1e-6, "sample {i}: channel gains out of proportion");
    }
    let peak = speakers[0][64..rendered].iter().fold(0.0f32, |m, y| m.max(y.abs()));
    assert!((peak - 0.8).abs() < 0.02, "speaker peak {peak}");

    assert!(left[..rendered].iter().all(|y| y.is_finite()));
    assert!(right[..rendered].iter().all(|y| y.is_finite()));
    assert!(left[100..rendered].iter().any(|&y| y.abs() > 0.1));
    // The right ear hears the source four samples later.
    assert!(right[..4].iter().all(|&y| y == 0.0));
}
