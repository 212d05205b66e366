// SPDX-License-Identifier: LGPL-3.0-or-later

//! # spatmix-lib
//!
//! Real-time kernels of a multi-source 3D audio mixer.
//!
//! Everything here runs inside the audio callback: no allocation, no
//! locking, no I/O, and every call processes exactly the samples it is
//! asked for in increasing index order. It includes:
//!
//! - **Fixed-point phase**: integer position plus 12-bit fraction
//! - **Resamplers**: point, linear, cubic and band-limited sinc kernels
//!   driven by a fixed-point phase accumulator, plus a unity-rate copy
//! - **Mixing**: per-channel gain-ramped mixing and static matrix rows
//! - **HRTF**: impulse-response accumulation into circular delay lines
//!   and the binaural mixers built on it
//!
//! ## Design
//!
//! Functions take caller-owned state explicitly (`&mut` current gains,
//! delay lines, filter history); there is no global state. Preconditions
//! such as non-empty blocks or sufficient source history are checked with
//! `debug_assert!` only. The buffer loops of the mixers are compiled for
//! several SIMD targets through `multiversion` and the best variant is
//! picked at runtime.

pub mod fixed;
pub mod hrtf;
pub mod mix;
pub mod resample;
pub mod types;
