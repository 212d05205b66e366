// SPDX-License-Identifier: LGPL-3.0-or-later

//! Engine-wide constants and shared buffer types.
//!
//! These values are owned by the surrounding engine; the kernels in this
//! crate only read them. Changing a bit width here changes the fixed-point
//! resolution or table layout for every resampler at once.

// ─── Fixed-point phase ─────────────────────────────────────────────────────

/// Number of fractional bits in a resampler phase.
pub const FRACTION_BITS: u32 = 12;

/// One whole source sample in fixed-point units.
pub const FRACTION_ONE: i32 = 1 << FRACTION_BITS;

/// Mask selecting the fractional part of a phase.
pub const FRACTION_MASK: i32 = FRACTION_ONE - 1;

/// Largest supported playback rate, as a multiple of the output rate.
pub const MAX_PITCH: i32 = 255;

// ─── Band-limited sinc tables ──────────────────────────────────────────────

/// Bits of the fraction used to pick a bsinc phase bucket.
pub const BSINC_PHASE_BITS: u32 = 4;

/// Number of phase buckets per bsinc scale.
pub const BSINC_PHASE_COUNT: usize = 1 << BSINC_PHASE_BITS;

/// Bits used to index bsinc scales.
pub const BSINC_SCALE_BITS: u32 = 4;

/// Number of filter scales in a bsinc table.
pub const BSINC_SCALE_COUNT: usize = 1 << BSINC_SCALE_BITS;

/// Widest bsinc filter, in taps.
pub const BSINC_POINTS_MAX: usize = 48;

/// Source history a caller must keep before and after the current phase
/// so that every resampler can read its full window.
pub const MAX_RESAMPLE_PADDING: usize = BSINC_POINTS_MAX / 2;

// ─── HRTF ──────────────────────────────────────────────────────────────────

pub const HRIR_BITS: u32 = 7;
/// Capacity of an HRIR accumulation delay line (power of two).
pub const HRIR_LENGTH: usize = 1 << HRIR_BITS;
pub const HRIR_MASK: usize = HRIR_LENGTH - 1;

pub const HRTF_HISTORY_BITS: u32 = 6;
/// Capacity of the per-voice input history used for interaural delays.
pub const HRTF_HISTORY_LENGTH: usize = 1 << HRTF_HISTORY_BITS;
pub const HRTF_HISTORY_MASK: usize = HRTF_HISTORY_LENGTH - 1;

// ─── Mixing ────────────────────────────────────────────────────────────────

/// Maximum number of samples processed per block.
pub const BUFFER_SIZE: usize = 2048;

/// Gain at or below which a channel is treated as silent (-100 dB).
pub const GAIN_SILENCE_THRESHOLD: f32 = 0.000_01;

/// Alignment, in bytes, that vectorized downstream stages expect.
pub const SIMD_ALIGN: usize = 16;

/// One output (or input) channel of mixing storage.
pub type ChannelBuffer = [f32; BUFFER_SIZE];

/// A stereo `[left, right]` sample or coefficient pair.
pub type Float2 = [f32; 2];
