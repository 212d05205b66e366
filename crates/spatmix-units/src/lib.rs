// SPDX-License-Identifier: LGPL-3.0-or-later

//! # spatmix-units
//!
//! Per-voice components of the mixer, built on the real-time kernels in
//! [`spatmix_lib`]. It includes:
//!
//! - **bsinc**: band-limited sinc table design and per-pitch preparation
//! - **resampler**: resampler names, parsing and per-voice dispatch
//! - **gains**: per-channel gain fades
//! - **hrtf**: per-voice binaural filter with response crossfades
//! - **config**: TOML mixer settings
//!
//! Table generation and configuration run at setup time and may allocate,
//! fail and log. The `process`/`mix` methods of the per-voice types do
//! none of that and are safe to call from the audio callback.

pub mod bsinc;
pub mod config;
pub mod gains;
pub mod hrtf;
pub mod resampler;
