// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
//
use serde::Deserialize;

use super::error::ConfigError;

const DEFAULT_TARGET_PEAK_DBFS: f32 = -1.0;
const DEFAULT_CHUNK_FRAMES: usize = 8192;

/// A YAML representation of the import pipeline configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Import {
    /// Peak level imported samples are normalized to, in dBFS (default: -1.0).
    target_peak_dbfs: Option<f32>,

    /// Frames handed to the resampler per chunk (default: 8192).
    chunk_frames: Option<usize>,
}

impl Import {
    /// Returns the normalization target in dBFS (default: -1.0)
    pub fn target_peak_dbfs(&self) -> f32 {
        self.target_peak_dbfs.unwrap_or(DEFAULT_TARGET_PEAK_DBFS)
    }

    /// Returns the normalization target as a linear amplitude.
    pub fn target_peak_linear(&self) -> f32 {
        10f32.powf(self.target_peak_dbfs() / 20.0)
    }

    /// Returns the resampler chunk size (default: 8192)
    pub fn chunk_frames(&self) -> usize {
        self.chunk_frames.unwrap_or(DEFAULT_CHUNK_FRAMES)
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.target_peak_dbfs() > 0.0 {
            return Err(ConfigError::Invalid(format!(
                "import target_peak_dbfs must not exceed 0 dBFS, got {}",
                self.target_peak_dbfs()
            )));
        }
        if self.chunk_frames() == 0 {
            return Err(ConfigError::Invalid(
                "import chunk_frames must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
