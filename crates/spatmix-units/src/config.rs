// SPDX-License-Identifier: LGPL-3.0-or-later

//! Mixer configuration.
//!
//! Settings are read from TOML. Missing keys take their defaults; a
//! resampler name that is not recognized is reported with `log::warn!`
//! and replaced by the default resampler rather than failing the load.
//!
//! ```toml
//! resampler = "bsinc12"
//! hrtf_fade_samples = 128
//! ```

use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resampler::Resampler;

/// Default length of gain and HRTF fades, in samples.
pub const DEFAULT_FADE_SAMPLES: usize = 64;

/// Errors from loading a [`MixerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid mixer configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// User-facing mixer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// Resampler name, see [`Resampler`] for accepted spellings.
    pub resampler: String,
    /// Samples over which gain and HRTF changes are faded in.
    pub hrtf_fade_samples: usize,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            resampler: Resampler::default().to_string(),
            hrtf_fade_samples: DEFAULT_FADE_SAMPLES,
        }
    }
}

impl MixerConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        debug!("loaded mixer configuration from {}: {config:?}", path.display());
        Ok(config)
    }

    /// The configured resampler, or the default one if the name is not
    /// recognized.
    pub fn resampler(&self) -> Resampler {
        match self.resampler.parse() {
            Ok(kind) => kind,
            Err(err) => {
                let fallback = Resampler::default();
                warn!("{err}, falling back to {fallback}");
                fallback
            }
        }
    }
}
