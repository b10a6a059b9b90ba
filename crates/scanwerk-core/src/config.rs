// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanner configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

/// Tunables of the decode cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Contrast boost of the first preprocessing transform.
    pub contrast_factor: f32,
    /// Sharpness boost of the fourth preprocessing transform.
    pub sharpness_factor: f32,
    /// Brightness boost of the fifth preprocessing transform.
    pub brightness_factor: f32,
    /// Neighbourhood size (odd, in pixels) of the adaptive threshold.
    pub adaptive_block_size: u32,
    /// Constant subtracted from the weighted local mean.
    pub adaptive_offset: i32,
    /// Run the QR grid detector when the multi-format reader finds nothing.
    pub enable_secondary: bool,
    /// Run the preprocessing battery as the last resort.
    pub enable_preprocess: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            contrast_factor: 2.0,
            sharpness_factor: 2.0,
            brightness_factor: 1.5,
            adaptive_block_size: 11,
            adaptive_offset: 2,
            enable_secondary: true,
            enable_preprocess: true,
        }
    }
}

impl ScanConfig {
    /// Load a configuration from a JSON file. Missing fields take their
    /// default values.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every tunable is usable.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("contrast_factor", self.contrast_factor),
            ("sharpness_factor", self.sharpness_factor),
            ("brightness_factor", self.brightness_factor),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ScanError::Config(format!(
                    "{name} must be a positive finite number, got {value}"
                )));
            }
        }
        if self.adaptive_block_size < 3 || self.adaptive_block_size % 2 == 0 {
            return Err(ScanError::Config(format!(
                "adaptive_block_size must be odd and at least 3, got {}",
                self.adaptive_block_size
            )));
        }
        Ok(())
    }

    /// Gaussian sigma matching a square neighbourhood of `adaptive_block_size`.
    ///
    /// Same rule OpenCV uses to derive sigma from a kernel size:
    /// `0.3 * ((k - 1) * 0.5 - 1) + 0.8`.
    pub fn adaptive_sigma(&self) -> f32 {
        0.3 * ((self.adaptive_block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
    }
}
