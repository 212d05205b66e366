// SPDX-License-Identifier: LGPL-3.0-or-later

//! HRIR convolution into circular stereo delay lines.
//!
//! Each input sample contributes a scaled copy of a short stereo impulse
//! response into a power-of-two delay line of [`HRIR_LENGTH`] slots.
//! After the contribution the slot at the write head holds a finished
//! output sample, so the delay line behaves like an unbounded convolution
//! tail folded into fixed storage.
//!
//! Per sample, the mixers below:
//! 1. record the input in the history ring (for interaural delays),
//! 2. clear the slot about to become the tail end of the response,
//! 3. accumulate the response with [`apply_coeffs`],
//! 4. add the finished slot at the write head to the outputs,
//! 5. advance the offset.
//!
//! Coefficient tables come from the HRTF dataset loader, which lives
//! outside this crate.

// Signatures follow the engine's mixer call contract.
#![allow(clippy::too_many_arguments)]

use multiversion::multiversion;

use crate::types::{Float2, HRIR_LENGTH, HRIR_MASK, HRTF_HISTORY_LENGTH, HRTF_HISTORY_MASK};

/// Add `coeffs[c] * (left, right)` into `values[(offset + c) & HRIR_MASK]`
/// for `c` in `0..ir_size`.
///
/// # Examples
/// ```
/// use spatmix_lib::hrtf::apply_coeffs;
/// use spatmix_lib::types::{Float2, HRIR_LENGTH};
///
/// let mut values = [[0.0f32; 2]; HRIR_LENGTH];
/// let coeffs: [Float2; 2] = [[1.0, 0.5], [0.25, 0.125]];
/// apply_coeffs(HRIR_LENGTH - 1, &mut values, 2, &coeffs, 2.0, 4.0);
/// assert_eq!(values[HRIR_LENGTH - 1], [2.0, 2.0]);
/// assert_eq!(values[0], [0.5, 0.5]);
/// ```
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub fn apply_coeffs(
    offset: usize,
    values: &mut [Float2; HRIR_LENGTH],
    ir_size: usize,
    coeffs: &[Float2],
    left: f32,
    right: f32,
) {
    debug_assert!(ir_size <= HRIR_LENGTH);
    for (c, coeff) in coeffs[..ir_size].iter().enumerate() {
        let off = (offset + c) & HRIR_MASK;
        values[off][0] += coeff[0] * left;
        values[off][1] += coeff[1] * right;
    }
}

/// Per-voice HRTF filter memory.
#[derive(Debug, Clone)]
pub struct HrtfState {
    /// Recent input samples, indexed by `offset & HRTF_HISTORY_MASK`.
    pub history: [f32; HRTF_HISTORY_LENGTH],
    /// Accumulating convolution tail.
    pub values: [Float2; HRIR_LENGTH],
}

impl Default for HrtfState {
    fn default() -> Self {
        Self::new()
    }
}

impl HrtfState {
    /// Create a silent filter state.
    pub fn new() -> Self {
        Self {
            history: [0.0; HRTF_HISTORY_LENGTH],
            values: [[0.0; 2]; HRIR_LENGTH],
        }
    }

    /// Silence the history and convolution tail.
    pub fn clear(&mut self) {
        self.history.fill(0.0);
        self.values.fill([0.0; 2]);
    }
}

/// A fixed HRTF filter: response, per-ear delay and gain.
#[derive(Debug, Clone, Copy)]
pub struct HrtfParams<'a> {
    pub coeffs: &'a [Float2],
    /// Interaural delays in samples, `[left, right]`.
    pub delay: [usize; 2],
    pub gain: f32,
}

/// An HRTF filter whose gain ramps by `gain_step` per sample.
#[derive(Debug, Clone, Copy)]
pub struct MixHrtfParams<'a> {
    pub coeffs: &'a [Float2],
    pub delay: [usize; 2],
    /// Gain at the first sample of the block; updated to the gain reached
    /// after the block.
    pub gain: f32,
    pub gain_step: f32,
}

#[inline(always)]
fn delayed(history: &[f32; HRTF_HISTORY_LENGTH], offset: usize, delay: usize) -> f32 {
    history[offset.wrapping_sub(delay) & HRTF_HISTORY_MASK]
}

#[inline(always)]
fn clear_tail(values: &mut [Float2; HRIR_LENGTH], offset: usize, ir_size: usize) {
    values[(offset + ir_size - 1) & HRIR_MASK] = [0.0; 2];
}

/// Convolve `data[..buffer_size]` through one HRTF filter and add the
/// result into `left_out`/`right_out` starting at `out_pos`.
///
/// `offset` is the voice's running sample counter; the caller advances it
/// by `buffer_size` afterwards. `params.gain` is left at the gain reached
/// at the end of the block.
pub fn mix_hrtf(
    left_out: &mut [f32],
    right_out: &mut [f32],
    data: &[f32],
    mut offset: usize,
    out_pos: usize,
    ir_size: usize,
    params: &mut MixHrtfParams<'_>,
    state: &mut HrtfState,
    buffer_size: usize,
) {
    debug_assert!(ir_size > 0 && ir_size <= HRIR_LENGTH);
    let gain = params.gain;
    let gain_step = params.gain_step;
    let mut step_count = 0.0f32;

    let outputs = left_out[out_pos..out_pos + buffer_size]
        .iter_mut()
        .zip(&mut right_out[out_pos..out_pos + buffer_size]);
    for ((l_out, r_out), &sample) in outputs.zip(&data[..buffer_size]) {
        state.history[offset & HRTF_HISTORY_MASK] = sample;

        let g = gain + gain_step * step_count;
        let left = delayed(&state.history, offset, params.delay[0]) * g;
        let right = delayed(&state.history, offset, params.delay[1]) * g;

        clear_tail(&mut state.values, offset, ir_size);
        apply_coeffs(offset, &mut state.values, ir_size, params.coeffs, left, right);

        let [l, r] = state.values[offset & HRIR_MASK];
        *l_out += l;
        *r_out += r;

        step_count += 1.0;
        offset += 1;
    }
    params.gain = gain + gain_step * step_count;
}

/// Like [`mix_hrtf`], but crossfades from `old_params` to `new_params`
/// over the block.
///
/// The old filter fades linearly from its gain to silence across
/// `buffer_size` samples while the new one ramps by its own step; both
/// feed the same delay line so the transition is seamless.
///
/// The new filter starts at `new_params.gain`. For a fade-in the caller
/// passes `0.0` there and a positive `gain_step`; a non-zero start gain
/// makes the new response enter abruptly.
pub fn mix_hrtf_blend(
    left_out: &mut [f32],
    right_out: &mut [f32],
    data: &[f32],
    mut offset: usize,
    out_pos: usize,
    ir_size: usize,
    old_params: &HrtfParams<'_>,
    new_params: &mut MixHrtfParams<'_>,
    state: &mut HrtfState,
    buffer_size: usize,
) {
    debug_assert!(ir_size > 0 && ir_size <= HRIR_LENGTH);
    debug_assert!(buffer_size > 0);
    let old_gain = old_params.gain;
    let old_gain_step = -old_gain / buffer_size as f32;
    let new_gain = new_params.gain;
    let new_gain_step = new_params.gain_step;
    let mut step_count = 0.0f32;

    let outputs = left_out[out_pos..out_pos + buffer_size]
        .iter_mut()
        .zip(&mut right_out[out_pos..out_pos + buffer_size]);
    for ((l_out, r_out), &sample) in outputs.zip(&data[..buffer_size]) {
        state.history[offset & HRTF_HISTORY_MASK] = sample;
        clear_tail(&mut state.values, offset, ir_size);

        let g = old_gain + old_gain_step * step_count;
        let left = delayed(&state.history, offset, old_params.delay[0]) * g;
        let right = delayed(&state.history, offset, old_params.delay[1]) * g;
        apply_coeffs(offset, &mut state.values, ir_size, old_params.coeffs, left, right);

        let g = new_gain + new_gain_step * step_count;
        let left = delayed(&state.history, offset, new_params.delay[0]) * g;
        let right = delayed(&state.history, offset, new_params.delay[1]) * g;
        apply_coeffs(offset, &mut state.values, ir_size, new_params.coeffs, left, right);

        let [l, r] = state.values[offset & HRIR_MASK];
        *l_out += l;
        *r_out += r;

        step_count += 1.0;
        offset += 1;
    }
    new_params.gain = new_gain + new_gain_step * step_count;
}

/// One input channel of a direct (speaker-less) HRTF decode.
#[derive(Debug, Clone)]
pub struct DirectHrtfChannel {
    pub values: [Float2; HRIR_LENGTH],
    pub coeffs: [Float2; HRIR_LENGTH],
}

impl DirectHrtfChannel {
    /// Channel with the given response and a silent delay line.
    pub fn new(coeffs: &[Float2]) -> Self {
        let mut chan = Self {
            values: [[0.0; 2]; HRIR_LENGTH],
            coeffs: [[0.0; 2]; HRIR_LENGTH],
        };
        let n = coeffs.len().min(HRIR_LENGTH);
        chan.coeffs[..n].copy_from_slice(&coeffs[..n]);
        chan
    }
}

/// State for decoding a multichannel bus straight to binaural output.
#[derive(Debug, Clone)]
pub struct DirectHrtfState {
    /// Running sample counter shared by all channels.
    pub offset: usize,
    pub ir_size: usize,
    pub channels: Vec<DirectHrtfChannel>,
}

/// Convolve every channel of `data` through its own fixed response and
/// sum the results into `left_out`/`right_out`.
///
/// Each channel's sample feeds both ears; delays and gains are already
/// baked into the responses. The shared offset advances by `buffer_size`.
pub fn mix_direct_hrtf<C: AsRef<[f32]>>(
    left_out: &mut [f32],
    right_out: &mut [f32],
    data: &[C],
    state: &mut DirectHrtfState,
    buffer_size: usize,
) {
    let ir_size = state.ir_size;
    debug_assert!(ir_size > 0 && ir_size <= HRIR_LENGTH);

    for (chan, input) in state.channels.iter_mut().zip(data) {
        let mut offset = state.offset & HRIR_MASK;
        let outputs = left_out[..buffer_size]
            .iter_mut()
            .zip(&mut right_out[..buffer_size]);
        for ((l_out, r_out), &sample) in outputs.zip(&input.as_ref()[..buffer_size]) {
            clear_tail(&mut chan.values, offset, ir_size);
            apply_coeffs(offset, &mut chan.values, ir_size, &chan.coeffs, sample, sample);

            let [l, r] = chan.values[offset & HRIR_MASK];
            *l_out += l;
            *r_out += r;
            offset += 1;
        }
    }
    state.offset = state.offset.wrapping_add(buffer_size);
}
