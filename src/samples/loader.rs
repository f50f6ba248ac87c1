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

//! Sample loading for pads.
//!
//! Samples are decoded and converted to the output format entirely off the audio thread, so the
//! render side only ever sees ready-to-play stereo frames.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

use super::error::EngineError;
use crate::audio::{decode, resample, MIX_CHANNELS};

/// Decoded, converted audio ready to hand to a voice. Stereo interleaved.
#[derive(Clone, Debug, PartialEq)]
pub struct PadBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl PadBuffer {
    /// Wraps interleaved stereo samples. A trailing partial frame is dropped.
    pub fn from_interleaved(mut samples: Vec<f32>, sample_rate: u32) -> PadBuffer {
        samples.truncate(samples.len() - samples.len() % MIX_CHANNELS);
        PadBuffer {
            samples,
            sample_rate,
        }
    }

    /// Interleaves planar audio, duplicating mono and keeping the first two of wider layouts.
    pub fn from_planar(channels: &[Vec<f32>], sample_rate: u32) -> PadBuffer {
        let frames = channels.first().map_or(0, Vec::len);
        let mut samples = Vec::with_capacity(frames * MIX_CHANNELS);
        match channels {
            [] => {}
            [mono] => {
                for sample in mono {
                    samples.push(*sample);
                    samples.push(*sample);
                }
            }
            [left, right, ..] => {
                for (l, r) in left.iter().zip(right) {
                    samples.push(*l);
                    samples.push(*r);
                }
            }
        }
        PadBuffer {
            samples,
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / MIX_CHANNELS
    }

    /// The left and right sample of a frame. Out of range frames are silent.
    #[inline]
    pub fn frame(&self, index: usize) -> (f32, f32) {
        let at = index * MIX_CHANNELS;
        match self.samples.get(at..at + MIX_CHANNELS) {
            Some([left, right]) => (*left, *right),
            _ => (0.0, 0.0),
        }
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frame_count() as f64 / self.sample_rate as f64)
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.samples.len() * std::mem::size_of::<f32>()
    }
}

/// Loads sample files into pad buffers at the output sample rate.
pub struct SampleLoader {
    /// Target sample rate for conversion (matches audio output).
    target_sample_rate: u32,
    /// Resampler chunk size.
    chunk_frames: usize,
}

impl SampleLoader {
    /// Creates a new sample loader.
    pub fn new(target_sample_rate: u32, chunk_frames: usize) -> Self {
        Self {
            target_sample_rate,
            chunk_frames,
        }
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    /// Decodes the file and converts it to the target rate in stereo.
    pub fn load(&self, path: &Path) -> Result<PadBuffer, EngineError> {
        let decoded = decode::decode_file(path).map_err(|source| EngineError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            path = ?path,
            sample_rate = decoded.sample_rate,
            channels = decoded.channel_count(),
            frames = decoded.frame_count(),
            "Decoded sample"
        );

        let channels = resample::resample_planar(
            &decoded.channels,
            decoded.sample_rate,
            self.target_sample_rate,
            self.chunk_frames,
        )
        .map_err(|source| EngineError::Convert {
            path: path.to_path_buf(),
            source,
        })?;

        let buffer = PadBuffer::from_planar(&channels, self.target_sample_rate);
        info!(
            path = ?path,
            duration = ?buffer.duration(),
            memory = buffer.memory_size(),
            "Loaded sample"
        );
        Ok(buffer)
    }
}
