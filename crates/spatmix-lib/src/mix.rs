// SPDX-License-Identifier: LGPL-3.0-or-later

//! Accumulating channel mixers.
//!
//! [`mix`] spreads one mono source block over several output channels,
//! each with its own gain ramp. [`mix_row`] is the transpose: several
//! input channels summed into one output with fixed weights, i.e. one row
//! of a static mixing matrix. Both only ever add into the output.

// Signatures follow the engine's mixer call contract.
#![allow(clippy::too_many_arguments)]

use multiversion::multiversion;

use crate::types::{ChannelBuffer, GAIN_SILENCE_THRESHOLD};

/// Mix `data[..buffer_size]` into every channel of `out_buffer` starting
/// at `out_pos`, ramping each channel's gain from `current_gains[c]`
/// towards `target_gains[c]` over `counter` samples.
///
/// - A channel whose gain differs from its target by no more than
///   `f32::EPSILON` is not ramped.
/// - Otherwise the first `min(buffer_size, counter)` samples are ramped
///   linearly. If the ramp finishes inside this block (including
///   `counter == 0`) the stored gain snaps exactly to the target; if not,
///   it keeps the partially advanced value for the next call.
/// - The remaining samples use the resulting gain, unless it is at or
///   below [`GAIN_SILENCE_THRESHOLD`], in which case the tail is skipped.
///   The ramp itself is never skipped.
///
/// # Examples
/// ```
/// use spatmix_lib::mix::mix;
/// use spatmix_lib::types::{ChannelBuffer, BUFFER_SIZE};
///
/// let data = [1.0f32; 4];
/// let mut out: Vec<ChannelBuffer> = vec![[0.0; BUFFER_SIZE]];
/// let mut current = [0.0f32];
/// mix(&data, &mut out, &mut current, &[1.0], 4, 0, 4);
/// assert_eq!(current[0], 1.0);
/// assert!(out[0][0] < out[0][1] && out[0][2] < out[0][3]);
/// ```
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub fn mix(
    data: &[f32],
    out_buffer: &mut [ChannelBuffer],
    current_gains: &mut [f32],
    target_gains: &[f32],
    counter: usize,
    out_pos: usize,
    buffer_size: usize,
) {
    debug_assert!(!out_buffer.is_empty());
    debug_assert!(buffer_size > 0);

    let delta = if counter > 0 { 1.0 / counter as f32 } else { 0.0 };
    let data = &data[..buffer_size];

    for ((out, gain_slot), &target) in out_buffer
        .iter_mut()
        .zip(current_gains.iter_mut())
        .zip(target_gains.iter())
    {
        let out = &mut out[out_pos..out_pos + buffer_size];
        let mut pos = 0;
        let mut gain = *gain_slot;
        let diff = target - gain;

        if diff.abs() > f32::EPSILON {
            let ramp_len = buffer_size.min(counter);
            let step = diff * delta;
            let mut step_count = 0.0f32;
            for (o, &s) in out[..ramp_len].iter_mut().zip(&data[..ramp_len]) {
                *o += s * (gain + step * step_count);
                step_count += 1.0;
            }
            pos = ramp_len;
            if pos == counter {
                gain = target;
            } else {
                gain += step * step_count;
            }
            *gain_slot = gain;
        }

        if !(gain.abs() > GAIN_SILENCE_THRESHOLD) {
            continue;
        }
        for (o, &s) in out[pos..].iter_mut().zip(&data[pos..]) {
            *o += s * gain;
        }
    }
}

/// Add `sum(gains[c] * data[c][in_pos + i])` into `out_buffer[i]` for
/// `i` in `0..buffer_size`.
///
/// Input channels whose gain is at or below [`GAIN_SILENCE_THRESHOLD`]
/// are skipped outright, so whatever they hold (NaN included) never
/// reaches the output.
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub fn mix_row(
    out_buffer: &mut [f32],
    gains: &[f32],
    data: &[ChannelBuffer],
    in_pos: usize,
    buffer_size: usize,
) {
    debug_assert!(!gains.is_empty());
    debug_assert!(buffer_size > 0);

    let out = &mut out_buffer[..buffer_size];
    for (&gain, chan) in gains.iter().zip(data.iter()) {
        if !(gain.abs() > GAIN_SILENCE_THRESHOLD) {
            continue;
        }
        for (o, &s) in out.iter_mut().zip(&chan[in_pos..in_pos + buffer_size]) {
            *o += s * gain;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BUFFER_SIZE;
    use float_cmp::assert_approx_eq;

    fn channels(n: usize) -> Vec<ChannelBuffer> {
        vec![[0.0; BUFFER_SIZE]; n]
    }

    #[test]
    fn test_mix_steady_gain() {
        let data = [1.0; 4];
        let mut out = channels(1);
        let mut current = [0.5];
        mix(&data, &mut out, &mut current, &[0.5], 0, 0, 4);
        assert_eq!(current, [0.5]);
        assert_eq!(&out[0][..5], &[0.5, 0.5, 0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_mix_accumulates() {
        let data = [1.0; 4];
        let mut out = channels(1);
        out[0][..4].copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        let mut current = [2.0];
        mix(&data, &mut out, &mut current, &[2.0], 0, 0, 4);
        assert_eq!(&out[0][..4], &[3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_mix_full_ramp_snaps_to_target() {
        let data = [1.0; 4];
        let mut out = channels(1);
        let mut current = [0.0];
        mix(&data, &mut out, &mut current, &[1.0], 4, 0, 4);
        assert_eq!(current[0], 1.0);
        assert_eq!(out[0][0], 0.0);
        for w in out[0][..4].windows(2) {
            assert!(w[1] > w[0], "ramp not increasing: {:?}", &out[0][..4]);
        }
        assert_approx_eq!(f32, out[0][3], 0.75, ulps = 2);
    }

    #[test]
    fn test_mix_partial_ramp_keeps_progress() {
        let data = [1.0; 8];
        let mut out = channels(1);
        let mut current = [0.0];
        // Ramp over 16 samples, only 8 of them in this block.
        mix(&data, &mut out, &mut current, &[1.0], 16, 0, 8);
        assert_approx_eq!(f32, current[0], 0.5, ulps = 2);
        assert_approx_eq!(f32, out[0][7], 7.0 / 16.0, ulps = 2);

        // Next block continues with the remaining 8 samples of the ramp.
        let mut out2 = channels(1);
        mix(&data, &mut out2, &mut current, &[1.0], 8, 0, 8);
        assert_eq!(current[0], 1.0);
        assert_approx_eq!(f32, out2[0][0], 0.5, ulps = 2);
    }

    #[test]
    fn test_mix_ramp_shorter_than_block_then_steady() {
        let data = [2.0; 8];
        let mut out = channels(1);
        let mut current = [1.0];
        mix(&data, &mut out, &mut current, &[0.5], 2, 0, 8);
        assert_eq!(current[0], 0.5);
        assert_approx_eq!(f32, out[0][0], 2.0, ulps = 2);
        assert_approx_eq!(f32, out[0][1], 1.5, ulps = 2);
        for &y in &out[0][2..8] {
            assert_approx_eq!(f32, y, 1.0, ulps = 2);
        }
    }

    #[test]
    fn test_mix_zero_counter_jumps_to_target() {
        let data = [1.0; 4];
        let mut out = channels(1);
        let mut current = [0.25];
        mix(&data, &mut out, &mut current, &[0.75], 0, 0, 4);
        assert_eq!(current[0], 0.75);
        assert_eq!(&out[0][..4], &[0.75; 4]);
    }

    #[test]
    fn test_mix_silent_tail_untouched() {
        let data = [1.0; 8];
        let mut out = channels(1);
        let mut current = [1.0];
        mix(&data, &mut out, &mut current, &[0.0], 4, 0, 8);
        assert_eq!(current[0], 0.0);
        // Ramp region is written even though it ends at silence.
        assert_eq!(out[0][0], 1.0);
        assert_approx_eq!(f32, out[0][3], 0.25, ulps = 2);
        assert_eq!(&out[0][4..8], &[0.0; 4]);
    }

    #[test]
    fn test_mix_silent_channel_ignores_nan_data() {
        let data = [f32::NAN; 4];
        let mut out = channels(1);
        let mut current = [0.0];
        mix(&data, &mut out, &mut current, &[0.0], 0, 0, 4);
        assert!(out[0][..4].iter().all(|&y| y == 0.0));
    }

    #[test]
    fn test_mix_out_pos_and_multiple_channels() {
        let data = [1.0; 4];
        let mut out = channels(3);
        let mut current = [1.0, 0.0, 0.5];
        let target = [1.0, 0.0, 0.5];
        mix(&data, &mut out, &mut current, &target, 0, 10, 4);
        assert_eq!(&out[0][9..15], &[0.0, 1.0, 1.0, 1.0, 1.0, 0.0]);
        assert!(out[1].iter().all(|&y| y == 0.0));
        assert_eq!(&out[2][10..14], &[0.5; 4]);
    }

    #[test]
    fn test_mix_row_sums_weighted_channels() {
        let mut data = channels(3);
        data[0][..4].copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        data[1][..4].copy_from_slice(&[10.0, 20.0, 30.0, 40.0]);
        data[2][..4].copy_from_slice(&[100.0; 4]);
        let mut out = [1.0f32; 4];
        mix_row(&mut out, &[0.5, 0.1, 0.01], &data, 0, 4);
        assert_approx_eq!(f32, out[0], 3.5, epsilon = 1e-5);
        assert_approx_eq!(f32, out[3], 8.0, epsilon = 1e-5);
    }

    #[test]
    fn test_mix_row_skips_zero_gain_nan_data() {
        let mut data = channels(2);
        data[0][..4].copy_from_slice(&[f32::NAN, f32::INFINITY, f32::NEG_INFINITY, f32::NAN]);
        data[1][..4].copy_from_slice(&[1.0; 4]);
        let mut out = [0.0f32; 4];
        mix_row(&mut out, &[0.0, 2.0], &data, 0, 4);
        assert_eq!(out, [2.0; 4]);
    }

    #[test]
    fn test_mix_row_in_pos() {
        let mut data = channels(1);
        for (i, s) in data[0].iter_mut().enumerate().take(16) {
            *s = i as f32;
        }
        let mut out = [0.0f32; 4];
        mix_row(&mut out, &[1.0], &data, 8, 4);
        assert_eq!(out, [8.0, 9.0, 10.0, 11.0]);
    }
}
