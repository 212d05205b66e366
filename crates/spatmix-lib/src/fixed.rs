// SPDX-License-Identifier: LGPL-3.0-or-later

//! Fixed-point sample phase.
//!
//! A resampler position is an integer source index plus a fraction in
//! `[0, FRACTION_ONE)`. Each output sample adds a signed increment to the
//! fraction; the carry moves the integer index and the fraction is masked
//! back into range, so the two never drift apart no matter how long the
//! voice plays.

use crate::types::{FRACTION_BITS, FRACTION_MASK, FRACTION_ONE, MAX_PITCH};

/// Integer source index plus fractional remainder.
///
/// # Examples
/// ```
/// use spatmix_lib::fixed::Phase;
/// use spatmix_lib::types::FRACTION_ONE;
///
/// let mut phase = Phase::new(0, 0);
/// phase.step(FRACTION_ONE + FRACTION_ONE / 2);
/// assert_eq!(phase, Phase::new(1, FRACTION_ONE / 2));
/// phase.step(FRACTION_ONE + FRACTION_ONE / 2);
/// assert_eq!(phase, Phase::new(3, 0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Phase {
    /// Integer sample index.
    pub pos: isize,
    /// Fraction in `[0, FRACTION_ONE)`.
    pub frac: i32,
}

impl Phase {
    /// Create a phase. `frac` must already be in `[0, FRACTION_ONE)`.
    #[inline]
    pub fn new(pos: isize, frac: i32) -> Self {
        debug_assert!((0..FRACTION_ONE).contains(&frac), "fraction out of range: {frac}");
        Self { pos, frac }
    }

    /// Advance by one output sample.
    ///
    /// The shift is arithmetic, so a negative increment carries backwards
    /// and the fraction still lands in `[0, FRACTION_ONE)`.
    #[inline(always)]
    pub fn step(&mut self, increment: i32) {
        let frac = self.frac + increment;
        self.pos += (frac >> FRACTION_BITS) as isize;
        self.frac = frac & FRACTION_MASK;
    }

    /// Phase reached after `n` calls to [`Phase::step`].
    pub fn advance(self, increment: i32, n: usize) -> Self {
        let total = i64::from(self.frac) + i64::from(increment) * n as i64;
        Self {
            pos: self.pos + (total >> FRACTION_BITS) as isize,
            frac: (total & i64::from(FRACTION_MASK)) as i32,
        }
    }

    /// The fraction normalized to `[0, 1)`.
    #[inline]
    pub fn frac_f32(&self) -> f32 {
        self.frac as f32 * (1.0 / FRACTION_ONE as f32)
    }
}

/// Convert a playback rate ratio (source rate / output rate, times pitch)
/// to a fixed-point increment.
///
/// NaN and non-positive ratios map to unity; anything above
/// [`MAX_PITCH`] is clamped.
pub fn increment_from_pitch(pitch: f32) -> i32 {
    if !(pitch > 0.0) {
        return FRACTION_ONE;
    }
    // `as` saturates, so +inf ends up at the clamp ceiling.
    ((pitch * FRACTION_ONE as f32) as i32).clamp(1, MAX_PITCH * FRACTION_ONE)
}

/// Number of distinct integer phases visited while producing `n` output
/// samples from fraction `frac` with a non-negative `increment`.
///
/// A caller must provide this many source samples, plus the kernel's
/// lookback before and lookahead after.
pub fn source_span(frac: i32, increment: i32, n: usize) -> usize {
    debug_assert!(increment >= 0);
    if n == 0 {
        return 0;
    }
    let last = i64::from(frac) + i64::from(increment) * (n as i64 - 1);
    (last >> FRACTION_BITS) as usize + 1
}
