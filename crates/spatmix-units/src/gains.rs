// SPDX-License-Identifier: LGPL-3.0-or-later

//! Per-voice output gains with click-free transitions.
//!
//! A voice sends its mono signal to every output channel with a gain per
//! channel. When the gains change, the new values are approached linearly
//! over a fade of a given number of samples, which may span several
//! blocks.

use spatmix_lib::mix::mix;
use spatmix_lib::types::ChannelBuffer;

/// Current and target gain per output channel plus the remaining fade.
///
/// Both vectors are allocated once by [`ChannelGains::new`]; nothing here
/// allocates afterwards.
///
/// # Examples
/// ```
/// use spatmix_units::gains::ChannelGains;
/// use spatmix_lib::types::{ChannelBuffer, BUFFER_SIZE};
///
/// let mut gains = ChannelGains::new(2);
/// gains.reset(&[1.0, 0.0]);
/// gains.set_target(&[0.0, 1.0], 8);
///
/// let mut out: Vec<ChannelBuffer> = vec![[0.0; BUFFER_SIZE]; 2];
/// gains.mix(&[1.0; 4], &mut out, 0);
/// assert_eq!(gains.remaining(), 4);
/// gains.mix(&[1.0; 4], &mut out, 4);
/// assert_eq!(gains.remaining(), 0);
/// assert_eq!(gains.current(), &[0.0, 1.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelGains {
    current: Vec<f32>,
    target: Vec<f32>,
    counter: usize,
}

impl ChannelGains {
    /// Silent gains for `channels` outputs.
    pub fn new(channels: usize) -> Self {
        Self {
            current: vec![0.0; channels],
            target: vec![0.0; channels],
            counter: 0,
        }
    }

    /// Number of output channels.
    pub fn channels(&self) -> usize {
        self.current.len()
    }

    /// Gains reached so far.
    pub fn current(&self) -> &[f32] {
        &self.current
    }

    /// Gains being faded towards.
    pub fn target(&self) -> &[f32] {
        &self.target
    }

    /// Samples left in the current fade.
    pub fn remaining(&self) -> usize {
        self.counter
    }

    /// Start fading from the current gains to `gains` over
    /// `fade_samples`. A zero-length fade takes effect on the next block.
    pub fn set_target(&mut self, gains: &[f32], fade_samples: usize) {
        self.target.copy_from_slice(gains);
        self.counter = fade_samples;
    }

    /// Jump to `gains` with no fade.
    pub fn reset(&mut self, gains: &[f32]) {
        self.current.copy_from_slice(gains);
        self.target.copy_from_slice(gains);
        self.counter = 0;
    }

    /// Add `data` into every channel of `out` starting at `out_pos`, with
    /// this voice's gains, and advance the fade by `data.len()`.
    pub fn mix(&mut self, data: &[f32], out: &mut [ChannelBuffer], out_pos: usize) {
        if data.is_empty() {
            return;
        }
        mix(
            data,
            out,
            &mut self.current,
            &self.target,
            self.counter,
            out_pos,
            data.len(),
        );
        self.counter = self.counter.saturating_sub(data.len());
    }
}
