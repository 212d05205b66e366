// SPDX-License-Identifier: LGPL-3.0-or-later

//! Resampler selection.
//!
//! [`Resampler`] names an interpolation quality; [`SourceResampler`] binds
//! it to whatever the kernel needs at run time (the shared bsinc table) and
//! hands out per-block kernel state for a given pitch increment.
//!
//! # Examples
//!
//! ```
//! use spatmix_units::resampler::{Resampler, SourceResampler};
//! use spatmix_lib::types::FRACTION_ONE;
//!
//! let kind: Resampler = "sinc4".parse().unwrap();
//! assert_eq!(kind, Resampler::Cubic);
//!
//! let resampler = SourceResampler::new(kind);
//! let src = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
//! let mut dst = [0.0; 3];
//! let out = resampler.process(&src, 1, 0, FRACTION_ONE / 2, &mut dst);
//! assert_eq!(out, &[1.0, 1.5, 2.0]);
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use spatmix_lib::resample::{InterpState, resample_copy, resampler_for};
use spatmix_lib::types::FRACTION_ONE;
use thiserror::Error;

use crate::bsinc::{BsincTable, bsinc_prepare, shared_bsinc12, shared_bsinc24};

/// Error from parsing a resampler name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResamplerError {
    #[error("unknown resampler `{0}`")]
    Unknown(String),
}

/// Interpolation quality of a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Resampler {
    /// Nearest-lower sample.
    Point,
    /// Linear interpolation.
    #[default]
    Linear,
    /// Four-point Catmull-Rom.
    Cubic,
    /// Band-limited sinc, 12 taps up-sampling.
    Bsinc12,
    /// Band-limited sinc, 24 taps up-sampling.
    Bsinc24,
}

impl Resampler {
    /// All resamplers, lowest quality first.
    pub const ALL: [Resampler; 5] = [
        Resampler::Point,
        Resampler::Linear,
        Resampler::Cubic,
        Resampler::Bsinc12,
        Resampler::Bsinc24,
    ];

    /// Canonical lower-case name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Linear => "linear",
            Self::Cubic => "cubic",
            Self::Bsinc12 => "bsinc12",
            Self::Bsinc24 => "bsinc24",
        }
    }
}

impl fmt::Display for Resampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Resampler {
    type Err = ResamplerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "point" => Ok(Self::Point),
            "linear" => Ok(Self::Linear),
            "cubic" | "sinc4" => Ok(Self::Cubic),
            "bsinc12" | "bsinc" | "sinc8" => Ok(Self::Bsinc12),
            "bsinc24" => Ok(Self::Bsinc24),
            _ => Err(ResamplerError::Unknown(s.to_string())),
        }
    }
}

impl TryFrom<String> for Resampler {
    type Error = ResamplerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Resampler> for String {
    fn from(r: Resampler) -> Self {
        r.name().to_string()
    }
}

/// A resampler ready to run: the kind plus its shared table, if any.
#[derive(Debug, Clone)]
pub struct SourceResampler {
    kind: Resampler,
    table: Option<Arc<BsincTable>>,
}

impl Default for SourceResampler {
    fn default() -> Self {
        Self::new(Resampler::default())
    }
}

impl SourceResampler {
    /// Bind `kind` to the process-wide table it needs.
    pub fn new(kind: Resampler) -> Self {
        let table = match kind {
            Resampler::Bsinc12 => Some(shared_bsinc12()),
            Resampler::Bsinc24 => Some(shared_bsinc24()),
            _ => None,
        };
        Self { kind, table }
    }

    /// Bind a bsinc resampler to a caller-provided table.
    pub fn with_table(kind: Resampler, table: Arc<BsincTable>) -> Self {
        match kind {
            Resampler::Bsinc12 | Resampler::Bsinc24 => Self {
                kind,
                table: Some(table),
            },
            _ => Self::new(kind),
        }
    }

    pub fn kind(&self) -> Resampler {
        self.kind
    }

    /// Kernel state for one block at `increment`.
    pub fn state(&self, increment: i32) -> InterpState<'_> {
        match (self.kind, &self.table) {
            (Resampler::Point, _) => InterpState::Point,
            (Resampler::Linear, _) => InterpState::Linear,
            (Resampler::Cubic, _) => InterpState::Cubic,
            (Resampler::Bsinc12 | Resampler::Bsinc24, Some(table)) => {
                InterpState::Bsinc(bsinc_prepare(increment, table))
            }
            // Constructors always attach a table to bsinc kinds.
            (Resampler::Bsinc12 | Resampler::Bsinc24, None) => InterpState::Linear,
        }
    }

    /// History samples a voice must keep before the read position, for
    /// any increment.
    pub fn lookback(&self) -> usize {
        match &self.table {
            Some(table) => table.max_taps() / 2 - 1,
            None => self.state(FRACTION_ONE).lookback(),
        }
    }

    /// Samples needed after the last integer phase of a block, for any
    /// increment.
    pub fn lookahead(&self) -> usize {
        match &self.table {
            Some(table) => table.max_taps() / 2,
            None => self.state(FRACTION_ONE).lookahead(),
        }
    }

    /// Resample `dst.len()` samples starting at `src[pos]` with fraction
    /// `frac`.
    ///
    /// Unity rate at a whole-sample position bypasses the kernel entirely.
    pub fn process<'a>(
        &self,
        src: &'a [f32],
        pos: usize,
        frac: i32,
        increment: i32,
        dst: &'a mut [f32],
    ) -> &'a [f32] {
        let state = self.state(increment);
        if increment == FRACTION_ONE && frac == 0 {
            return resample_copy(&state, src, pos, frac, increment, dst);
        }
        resampler_for(&state)(&state, src, pos, frac, increment, dst)
    }
}
