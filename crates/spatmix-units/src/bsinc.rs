// SPDX-License-Identifier: LGPL-3.0-or-later

//! Band-limited sinc coefficient tables.
//!
//! A table holds [`BSINC_SCALE_COUNT`] filters, one per cutoff scale
//! between `scale_base` and 1.0. Each filter is sampled at
//! [`BSINC_PHASE_COUNT`] fractional phases, and each phase stores four
//! `m`-tap vectors back to back:
//!
//! 1. the filter itself,
//! 2. its difference to the next scale,
//! 3. its difference to the next phase,
//! 4. the mixed scale/phase difference.
//!
//! The resampler kernel combines them bilinearly, so any cutoff between
//! two scales and any fraction between two phases is reachable without a
//! per-voice filter design. Down-sampling picks a lower scale (narrower
//! passband, more taps); up-sampling always uses the last scale.
//!
//! # Examples
//!
//! ```
//! use spatmix_units::bsinc::{BsincTable, bsinc_prepare};
//! use spatmix_lib::types::FRACTION_ONE;
//!
//! let table = BsincTable::bsinc12();
//! let state = bsinc_prepare(2 * FRACTION_ONE, &table);
//! assert_eq!(state.m, 24);
//! assert_eq!(state.l, 11);
//! ```

use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

use log::debug;
use once_cell::sync::Lazy;
use spatmix_lib::resample::BsincState;
use spatmix_lib::types::{
    BSINC_PHASE_COUNT, BSINC_POINTS_MAX, BSINC_SCALE_COUNT, FRACTION_ONE,
};
use thiserror::Error;

/// Stopband rejection of the built-in tables, in dB.
const DEFAULT_REJECTION_DB: f64 = 60.0;

/// Lowest cutoff scale of the built-in tables.
const DEFAULT_SCALE_BASE: f64 = 0.5;

/// Errors from [`BsincTable::generate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BsincError {
    #[error("filter order {0} out of range 1..{max}", max = BSINC_POINTS_MAX)]
    InvalidOrder(usize),
    #[error("scale base {0} must be in (0, 1)")]
    InvalidScaleBase(f64),
    #[error("stopband rejection {0} dB must be positive and finite")]
    InvalidRejection(f64),
}

/// Four floats on a 16-byte boundary. Every vector in the table has a tap
/// count divisible by four, so every vector starts on a block.
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C, align(16))]
struct Block([f32; 4]);

/// Precomputed bsinc filters for every scale and phase.
#[derive(Clone)]
pub struct BsincTable {
    scale_base: f32,
    scale_range: f32,
    m: [usize; BSINC_SCALE_COUNT],
    filter_offset: [usize; BSINC_SCALE_COUNT],
    storage: Vec<Block>,
}

impl fmt::Debug for BsincTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BsincTable")
            .field("scale_base", &self.scale_base)
            .field("m", &self.m)
            .field("coefficients", &(self.storage.len() * 4))
            .finish_non_exhaustive()
    }
}

impl BsincTable {
    /// Design a table for a filter of `order` (taps at unity scale minus
    /// one), with cutoff scales from `scale_base` up to 1.0 and the given
    /// stopband rejection.
    pub fn generate(order: usize, scale_base: f64, rejection_db: f64) -> Result<Self, BsincError> {
        if order == 0 || order >= BSINC_POINTS_MAX {
            return Err(BsincError::InvalidOrder(order));
        }
        if !(scale_base > 0.0 && scale_base < 1.0) {
            return Err(BsincError::InvalidScaleBase(scale_base));
        }
        if !(rejection_db > 0.0 && rejection_db.is_finite()) {
            return Err(BsincError::InvalidRejection(rejection_db));
        }
        Ok(Self::build(order, scale_base, rejection_db))
    }

    /// 12th-order table (12 taps when up-sampling, up to 24 when
    /// down-sampling).
    pub fn bsinc12() -> Self {
        Self::build(11, DEFAULT_SCALE_BASE, DEFAULT_REJECTION_DB)
    }

    /// 24th-order table (24 taps when up-sampling, up to 48 when
    /// down-sampling).
    pub fn bsinc24() -> Self {
        Self::build(23, DEFAULT_SCALE_BASE, DEFAULT_REJECTION_DB)
    }

    fn build(order: usize, scale_base: f64, rejection_db: f64) -> Self {
        let beta = kaiser_beta(rejection_db);
        let scales: [f64; BSINC_SCALE_COUNT] = std::array::from_fn(|si| {
            scale_base + (1.0 - scale_base) * si as f64 / (BSINC_SCALE_COUNT - 1) as f64
        });
        let m: [usize; BSINC_SCALE_COUNT] = std::array::from_fn(|si| {
            let points = ((order + 1) as f64 / scales[si]).ceil() as usize;
            round_up_4(points).min(BSINC_POINTS_MAX)
        });

        let mut filter_offset = [0usize; BSINC_SCALE_COUNT];
        let mut total = 0;
        for (offset, &taps) in filter_offset.iter_mut().zip(&m) {
            *offset = total;
            total += BSINC_PHASE_COUNT * 4 * taps;
        }

        let mut flat = vec![0.0f32; total];
        for si in 0..BSINC_SCALE_COUNT {
            let taps = m[si];
            let half = (taps / 2) as f64;
            let next = (si + 1 < BSINC_SCALE_COUNT).then(|| (scales[si + 1], (m[si + 1] / 2) as f64));

            for pi in 0..BSINC_PHASE_COUNT {
                let t0 = pi as f64 / BSINC_PHASE_COUNT as f64;
                let t1 = (pi + 1) as f64 / BSINC_PHASE_COUNT as f64;
                let f00 = phase_filter(taps, scales[si], half, beta, t0);
                let f01 = phase_filter(taps, scales[si], half, beta, t1);
                let (f10, f11) = match next {
                    Some((scale, half)) => (
                        phase_filter(taps, scale, half, beta, t0),
                        phase_filter(taps, scale, half, beta, t1),
                    ),
                    None => (f00.clone(), f01.clone()),
                };

                let base = filter_offset[si] + pi * 4 * taps;
                let block = &mut flat[base..base + 4 * taps];
                let (fil, rest) = block.split_at_mut(taps);
                let (scd, rest) = rest.split_at_mut(taps);
                let (phd, spd) = rest.split_at_mut(taps);
                for j in 0..taps {
                    fil[j] = f00[j] as f32;
                    scd[j] = (f10[j] - f00[j]) as f32;
                    phd[j] = (f01[j] - f00[j]) as f32;
                    spd[j] = ((f11[j] - f10[j]) - (f01[j] - f00[j])) as f32;
                }
            }
        }

        let storage: Vec<Block> = flat
            .chunks_exact(4)
            .map(|c| Block([c[0], c[1], c[2], c[3]]))
            .collect();

        debug!(
            "generated bsinc table: order {order}, scale base {scale_base}, {rejection_db} dB, \
             taps {}..={}, {total} coefficients",
            m[BSINC_SCALE_COUNT - 1],
            m[0],
        );

        Self {
            scale_base: scale_base as f32,
            scale_range: (1.0 / (1.0 - scale_base)) as f32,
            m,
            filter_offset,
            storage,
        }
    }

    /// Lowest cutoff scale.
    pub fn scale_base(&self) -> f32 {
        self.scale_base
    }

    /// `1 / (1 - scale_base)`.
    pub fn scale_range(&self) -> f32 {
        self.scale_range
    }

    /// Tap count of scale `si`.
    pub fn taps(&self, si: usize) -> usize {
        self.m[si]
    }

    /// Largest tap count in the table.
    pub fn max_taps(&self) -> usize {
        self.m.iter().copied().max().unwrap_or(0)
    }

    /// All coefficients as one flat slice.
    pub fn coefficients(&self) -> &[f32] {
        bytemuck::cast_slice(&self.storage)
    }

    /// Coefficients of scale `si`: `BSINC_PHASE_COUNT` blocks of four
    /// `taps(si)`-long vectors.
    pub fn scale_filter(&self, si: usize) -> &[f32] {
        let start = self.filter_offset[si];
        &self.coefficients()[start..start + BSINC_PHASE_COUNT * 4 * self.m[si]]
    }
}

static BSINC12: Lazy<Arc<BsincTable>> = Lazy::new(|| Arc::new(BsincTable::bsinc12()));
static BSINC24: Lazy<Arc<BsincTable>> = Lazy::new(|| Arc::new(BsincTable::bsinc24()));

/// Process-wide 12th-order table, built on first use.
pub fn shared_bsinc12() -> Arc<BsincTable> {
    Arc::clone(&BSINC12)
}

/// Process-wide 24th-order table, built on first use.
pub fn shared_bsinc24() -> Arc<BsincTable> {
    Arc::clone(&BSINC24)
}

/// Select the scale and interpolation factor for a resampling
/// `increment` and return the kernel parameters for it.
///
/// Up-sampling and unity rate use the last (widest) scale with no scale
/// interpolation. Down-sampling maps `1 / ratio` onto the scale range;
/// the fractional part is shaped by `1 - cos(asin(x))` so the blend
/// between neighbouring scales favours the lower one.
pub fn bsinc_prepare(increment: i32, table: &BsincTable) -> BsincState<'_> {
    let (si, sf) = if increment > FRACTION_ONE {
        let sf = FRACTION_ONE as f32 / increment as f32;
        let sf = ((BSINC_SCALE_COUNT - 1) as f32 * (sf - table.scale_base) * table.scale_range)
            .max(0.0);
        let si = (sf.floor() as usize).min(BSINC_SCALE_COUNT - 1);
        (si, 1.0 - (sf - si as f32).asin().cos())
    } else {
        (BSINC_SCALE_COUNT - 1, 0.0)
    };

    let m = table.m[si];
    BsincState {
        sf,
        m,
        l: m / 2 - 1,
        filter: table.scale_filter(si),
    }
}

// ─── Filter design ─────────────────────────────────────────────────────────

fn round_up_4(n: usize) -> usize {
    (n + 3) & !3
}

/// One phase of a windowed sinc, normalized to unit DC gain.
///
/// Tap `j` sits at `x = j - l - t` source samples from the interpolation
/// point, with `l = taps / 2 - 1`. The window spans `half` samples either
/// side, so a narrower scale evaluated on a wider layout is zero beyond
/// its own support.
fn phase_filter(taps: usize, scale: f64, half: f64, beta: f64, t: f64) -> Vec<f64> {
    let l = (taps / 2 - 1) as f64;
    let mut filter: Vec<f64> = (0..taps)
        .map(|j| {
            let x = j as f64 - l - t;
            scale * sinc(scale * x) * kaiser(beta, x / half)
        })
        .collect();

    let sum: f64 = filter.iter().sum();
    if sum.abs() > 1e-12 {
        for tap in &mut filter {
            *tap /= sum;
        }
    }
    filter
}

fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-9 {
        1.0
    } else {
        let px = PI * x;
        px.sin() / px
    }
}

/// Kaiser window at normalized position `k` in `[-1, 1]`; zero outside.
fn kaiser(beta: f64, k: f64) -> f64 {
    if k.abs() > 1.0 {
        return 0.0;
    }
    bessel_i0(beta * (1.0 - k * k).sqrt()) / bessel_i0(beta)
}

/// Kaiser's empirical beta for a stopband rejection in dB.
fn kaiser_beta(rejection_db: f64) -> f64 {
    if rejection_db > 50.0 {
        0.1102 * (rejection_db - 8.7)
    } else if rejection_db >= 21.0 {
        0.5842 * (rejection_db - 21.0).powf(0.4) + 0.07886 * (rejection_db - 21.0)
    } else {
        0.0
    }
}

/// Zeroth-order modified Bessel function of the first kind, by power
/// series.
fn bessel_i0(x: f64) -> f64 {
    let mut sum = 1.0f64;
    let mut term = 1.0f64;
    let x_half = x / 2.0;

    for k in 1..=30 {
        term *= (x_half / k as f64) * (x_half / k as f64);
        sum += term;
        if term < 1e-20 * sum {
            break;
        }
    }

    sum
}
