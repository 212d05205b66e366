// SPDX-License-Identifier: LGPL-3.0-or-later

//! Per-voice binaural filter.
//!
//! Wraps the HRTF mixers of `spatmix_lib` with the bookkeeping a voice
//! needs between blocks: the running delay-line offset, the current and
//! previous responses, and the gain fade. Changing the response while the
//! voice is audible crossfades from the old filter to the new one inside
//! the next processed block.

use spatmix_lib::hrtf::{HrtfParams, HrtfState, MixHrtfParams, mix_hrtf, mix_hrtf_blend};
use spatmix_lib::types::{Float2, HRIR_LENGTH, HRIR_MASK, HRTF_HISTORY_LENGTH};

/// One voice's HRTF filter.
///
/// # Examples
/// ```
/// use spatmix_units::hrtf::HrtfFilter;
///
/// let mut filter = HrtfFilter::new(4);
/// filter.set_target(&[[1.0, 0.5], [0.5, 0.25]], [0, 0], 1.0, 0);
///
/// let mut left = [0.0f32; 4];
/// let mut right = [0.0f32; 4];
/// filter.process(&[1.0, 0.0, 0.0, 0.0], &mut left, &mut right, 0);
/// assert_eq!(left, [1.0, 0.5, 0.0, 0.0]);
/// assert_eq!(right, [0.5, 0.25, 0.0, 0.0]);
/// ```
#[derive(Debug, Clone)]
pub struct HrtfFilter {
    state: HrtfState,
    ir_size: usize,
    /// Delay-line position, kept modulo `HRIR_LENGTH`.
    offset: usize,

    coeffs: Vec<Float2>,
    delay: [usize; 2],
    gain: f32,
    target_gain: f32,
    counter: usize,

    old_coeffs: Vec<Float2>,
    old_delay: [usize; 2],
    old_gain: f32,
    blend_pending: bool,
    active: bool,
}

impl HrtfFilter {
    /// Create a silent filter for responses of up to `ir_size` taps.
    pub fn new(ir_size: usize) -> Self {
        debug_assert!(ir_size > 0 && ir_size <= HRIR_LENGTH);
        Self {
            state: HrtfState::new(),
            ir_size,
            offset: 0,
            coeffs: vec![[0.0; 2]; ir_size],
            delay: [0; 2],
            gain: 0.0,
            target_gain: 0.0,
            counter: 0,
            old_coeffs: vec![[0.0; 2]; ir_size],
            old_delay: [0; 2],
            old_gain: 0.0,
            blend_pending: false,
            active: false,
        }
    }

    /// Response length this filter was sized for.
    pub fn ir_size(&self) -> usize {
        self.ir_size
    }

    /// Gain reached so far.
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Switch to a new response, interaural delays and gain.
    ///
    /// With `fade > 0` on an audible filter the old response fades out over
    /// the next block while the new one fades in over `fade` samples. With
    /// `fade == 0` the change is immediate. Responses shorter than the
    /// filter's size are zero-padded; longer ones are truncated.
    pub fn set_target(&mut self, coeffs: &[Float2], delay: [usize; 2], gain: f32, fade: usize) {
        debug_assert!(delay[0] < HRTF_HISTORY_LENGTH && delay[1] < HRTF_HISTORY_LENGTH);

        if self.active && fade > 0 {
            // A pending blend still fades out the audible response; the
            // unplayed one in `coeffs` is simply replaced.
            if !self.blend_pending {
                std::mem::swap(&mut self.old_coeffs, &mut self.coeffs);
                self.old_delay = self.delay;
                self.old_gain = self.gain;
                self.blend_pending = true;
            }
            self.gain = 0.0;
        } else if fade == 0 {
            self.gain = gain;
            self.blend_pending = false;
        }

        let n = coeffs.len().min(self.ir_size);
        self.coeffs[..n].copy_from_slice(&coeffs[..n]);
        self.coeffs[n..].fill([0.0; 2]);
        self.delay = delay;
        self.target_gain = gain;
        self.counter = fade;
        self.active = true;
    }

    /// Convolve `data` and add the result into `left[out_pos..]` and
    /// `right[out_pos..]`.
    pub fn process(&mut self, data: &[f32], left: &mut [f32], right: &mut [f32], out_pos: usize) {
        let mut done = 0;
        while done < data.len() {
            let remaining = data.len() - done;
            let (todo, gain_step) = if self.counter > 0 {
                let todo = self.counter.min(remaining);
                (todo, (self.target_gain - self.gain) / self.counter as f32)
            } else {
                self.gain = self.target_gain;
                (remaining, 0.0)
            };

            let mut params = MixHrtfParams {
                coeffs: &self.coeffs,
                delay: self.delay,
                gain: self.gain,
                gain_step,
            };
            if self.blend_pending {
                let old = HrtfParams {
                    coeffs: &self.old_coeffs,
                    delay: self.old_delay,
                    gain: self.old_gain,
                };
                mix_hrtf_blend(
                    left,
                    right,
                    &data[done..],
                    self.offset,
                    out_pos + done,
                    self.ir_size,
                    &old,
                    &mut params,
                    &mut self.state,
                    todo,
                );
                self.blend_pending = false;
            } else {
                mix_hrtf(
                    left,
                    right,
                    &data[done..],
                    self.offset,
                    out_pos + done,
                    self.ir_size,
                    &mut params,
                    &mut self.state,
                    todo,
                );
            }
            self.gain = params.gain;

            if self.counter > 0 {
                self.counter -= todo;
                if self.counter == 0 {
                    self.gain = self.target_gain;
                }
            }
            self.offset = (self.offset + todo) & HRIR_MASK;
            done += todo;
        }
    }

    /// Silence the filter: clear its delay lines and drop any pending fade.
    pub fn reset(&mut self) {
        self.state.clear();
        self.offset = 0;
        self.gain = 0.0;
        self.target_gain = 0.0;
        self.counter = 0;
        self.blend_pending = false;
        self.active = false;
    }
}
