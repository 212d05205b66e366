// SPDX-License-Identifier: LGPL-3.0-or-later

//! Fixed-point resamplers.
//!
//! Every resampler walks a [`Phase`] across the source at a fixed
//! increment and evaluates an interpolation kernel once per output sample.
//! The kernels are pure functions of a short window of source samples and
//! the current fraction:
//!
//! | kernel | lookback | window |
//! |--------|----------|--------|
//! | point  | 0        | 1      |
//! | linear | 0        | 2      |
//! | cubic  | 1        | 4      |
//! | bsinc  | `l`      | `m`    |
//!
//! All drivers share the [`ResamplerFn`] signature. `src[pos]` is the
//! sample at the starting integer phase; the driver reads from
//! `pos - lookback`, so the caller must keep that much history in front of
//! `pos` and enough samples after the last integer phase for the window.

use crate::fixed::Phase;
use crate::types::{BSINC_PHASE_BITS, FRACTION_BITS, FRACTION_ONE, SIMD_ALIGN};

const FRAC_PHASE_BITDIFF: u32 = FRACTION_BITS - BSINC_PHASE_BITS;

/// Per-call parameters of the band-limited sinc kernel.
///
/// `filter` points at one scale of a bsinc table: one block per phase
/// bucket, each block holding four `m`-tap vectors (base filter, scale
/// delta, phase delta, scale-phase delta), so a coefficient lives at
/// `phase * 4 * m + variant * m + tap`.
#[derive(Debug, Clone, Copy)]
pub struct BsincState<'a> {
    /// Interpolation factor between this scale and the next one.
    pub sf: f32,
    /// Number of filter taps.
    pub m: usize,
    /// Samples of lookback before the current integer phase.
    pub l: usize,
    /// Coefficients for the selected scale.
    pub filter: &'a [f32],
}

/// Kernel selection and its parameters for one resampling call.
#[derive(Debug, Clone, Copy, Default)]
pub enum InterpState<'a> {
    #[default]
    Point,
    Linear,
    Cubic,
    Bsinc(BsincState<'a>),
}

impl InterpState<'_> {
    /// Samples the driver reads before the current integer phase.
    #[inline]
    pub fn lookback(&self) -> usize {
        match self {
            Self::Point | Self::Linear => 0,
            Self::Cubic => 1,
            Self::Bsinc(b) => b.l,
        }
    }

    /// Total window length the kernel reads per output sample.
    #[inline]
    pub fn window_len(&self) -> usize {
        match self {
            Self::Point => 1,
            Self::Linear => 2,
            Self::Cubic => 4,
            Self::Bsinc(b) => b.m,
        }
    }

    /// Samples the driver reads after the current integer phase.
    #[inline]
    pub fn lookahead(&self) -> usize {
        self.window_len() - self.lookback() - 1
    }
}

/// Common signature of every resampler driver.
///
/// Arguments are `(state, src, pos, frac, increment, dst)`; the returned
/// slice holds `dst.len()` resampled samples and is either `dst` itself
/// or, for [`resample_copy`], possibly a view into `src`.
pub type ResamplerFn =
    for<'s, 'a> fn(&InterpState<'s>, &'a [f32], usize, i32, i32, &'a mut [f32]) -> &'a [f32];

// ─── Kernels ───────────────────────────────────────────────────────────────

#[inline(always)]
fn frac_to_mu(frac: i32) -> f32 {
    frac as f32 * (1.0 / FRACTION_ONE as f32)
}

/// Nearest-lower sample.
#[inline(always)]
pub fn point(window: &[f32], _frac: i32) -> f32 {
    window[0]
}

/// Linear interpolation between `window[0]` and `window[1]`.
#[inline(always)]
pub fn lerp(window: &[f32], frac: i32) -> f32 {
    let (a, b) = (window[0], window[1]);
    a + (b - a) * frac_to_mu(frac)
}

/// Catmull-Rom interpolation between `window[1]` and `window[2]`.
#[inline(always)]
pub fn cubic(window: &[f32], frac: i32) -> f32 {
    let mu = frac_to_mu(frac);
    let mu2 = mu * mu;
    let mu3 = mu2 * mu;
    let a0 = -0.5 * mu3 + mu2 - 0.5 * mu;
    let a1 = 1.5 * mu3 - 2.5 * mu2 + 1.0;
    let a2 = -1.5 * mu3 + 2.0 * mu2 + 0.5 * mu;
    let a3 = 0.5 * mu3 - 0.5 * mu2;
    window[0] * a0 + window[1] * a1 + window[2] * a2 + window[3] * a3
}

/// Scale- and phase-interpolated band-limited sinc.
#[inline(always)]
pub fn bsinc(state: &BsincState<'_>, window: &[f32], frac: i32) -> f32 {
    debug_assert!(state.m > 0);
    let m = state.m;
    let sf = state.sf;

    let pi = (frac >> FRAC_PHASE_BITDIFF) as usize;
    let pf = (frac & ((1 << FRAC_PHASE_BITDIFF) - 1)) as f32
        * (1.0 / (1 << FRAC_PHASE_BITDIFF) as f32);

    let block = &state.filter[m * pi * 4..m * (pi + 1) * 4];
    let (fil, rest) = block.split_at(m);
    let (scd, rest) = rest.split_at(m);
    let (phd, spd) = rest.split_at(m);

    let mut r = 0.0f32;
    for ((((&f, &sc), &ph), &sp), &v) in fil
        .iter()
        .zip(scd)
        .zip(phd)
        .zip(spd)
        .zip(&window[..m])
    {
        r += (f + sf * sc + pf * (ph + sf * sp)) * v;
    }
    r
}

// ─── Driver ────────────────────────────────────────────────────────────────

#[inline(always)]
fn drive<'a, F>(
    src: &[f32],
    pos: usize,
    lookback: usize,
    frac: i32,
    increment: i32,
    dst: &'a mut [f32],
    kernel: F,
) -> &'a [f32]
where
    F: Fn(&[f32], i32) -> f32,
{
    debug_assert!(!dst.is_empty(), "resampling zero samples");
    debug_assert!(pos >= lookback, "not enough history before pos {pos}");

    let mut phase = Phase::new((pos - lookback) as isize, frac);
    for out in dst.iter_mut() {
        *out = kernel(&src[phase.pos as usize..], phase.frac);
        phase.step(increment);
    }
    dst
}

/// Point (zero-order hold) resampler.
///
/// # Examples
/// ```
/// use spatmix_lib::resample::{resample_point, InterpState};
/// use spatmix_lib::types::FRACTION_ONE;
///
/// let src = [1.0, 2.0, 3.0, 4.0];
/// let mut dst = [0.0; 4];
/// let out = resample_point(&InterpState::Point, &src, 0, 0, FRACTION_ONE / 2, &mut dst);
/// assert_eq!(out, &[1.0, 1.0, 2.0, 2.0]);
/// ```
pub fn resample_point<'a>(
    _state: &InterpState<'_>,
    src: &'a [f32],
    pos: usize,
    frac: i32,
    increment: i32,
    dst: &'a mut [f32],
) -> &'a [f32] {
    drive(src, pos, 0, frac, increment, dst, point)
}

/// Linear resampler.
pub fn resample_linear<'a>(
    _state: &InterpState<'_>,
    src: &'a [f32],
    pos: usize,
    frac: i32,
    increment: i32,
    dst: &'a mut [f32],
) -> &'a [f32] {
    drive(src, pos, 0, frac, increment, dst, lerp)
}

/// Four-point Catmull-Rom resampler. Reads one sample before `pos`.
pub fn resample_cubic<'a>(
    _state: &InterpState<'_>,
    src: &'a [f32],
    pos: usize,
    frac: i32,
    increment: i32,
    dst: &'a mut [f32],
) -> &'a [f32] {
    drive(src, pos, 1, frac, increment, dst, cubic)
}

/// Band-limited sinc resampler. Reads `l` samples before `pos`.
///
/// # Panics
/// Panics if `state` is not [`InterpState::Bsinc`].
pub fn resample_bsinc<'a>(
    state: &InterpState<'_>,
    src: &'a [f32],
    pos: usize,
    frac: i32,
    increment: i32,
    dst: &'a mut [f32],
) -> &'a [f32] {
    let InterpState::Bsinc(bsinc_state) = *state else {
        panic!("bsinc resampler called with {state:?}");
    };
    drive(src, pos, bsinc_state.l, frac, increment, dst, |window, frac| {
        bsinc(&bsinc_state, window, frac)
    })
}

/// Unity-rate "resampler".
///
/// Returns a view of `src[pos..pos + dst.len()]` when that view shares
/// `dst`'s alignment modulo [`SIMD_ALIGN`], so downstream vector code sees
/// the same alignment it would get from `dst`; otherwise copies into
/// `dst`. The returned samples are identical either way.
pub fn resample_copy<'a>(
    _state: &InterpState<'_>,
    src: &'a [f32],
    pos: usize,
    _frac: i32,
    _increment: i32,
    dst: &'a mut [f32],
) -> &'a [f32] {
    debug_assert!(!dst.is_empty(), "resampling zero samples");
    let src = &src[pos..pos + dst.len()];
    if src.as_ptr() as usize % SIMD_ALIGN == dst.as_ptr() as usize % SIMD_ALIGN {
        return src;
    }
    dst.copy_from_slice(src);
    dst
}

/// Driver matching the kernel of `state`.
pub fn resampler_for(state: &InterpState<'_>) -> ResamplerFn {
    match state {
        InterpState::Point => resample_point,
        InterpState::Linear => resample_linear,
        InterpState::Cubic => resample_cubic,
        InterpState::Bsinc(_) => resample_bsinc,
    }
}
