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
//! Offline sample rate conversion of planar audio.

use rubato::{
    SincFixedIn, SincInterpolationParameters, SincInterpolationType, VecResampler, WindowFunction,
};
use tracing::debug;

/// Errors from setting up or running the resampler.
#[derive(Debug, thiserror::Error)]
pub enum ResampleError {
    #[error("unable to create resampler from {from} Hz to {to} Hz: {detail}")]
    Init { from: u32, to: u32, detail: String },

    #[error("{0}")]
    Process(String),
}

/// Splits planar audio into fixed size chunks. The sequence is finite and can only be walked once;
/// the final chunk may be shorter than the rest.
pub struct PlanarChunks<'a> {
    channels: &'a [Vec<f32>],
    chunk_frames: usize,
    position: usize,
}

impl<'a> PlanarChunks<'a> {
    pub fn new(channels: &'a [Vec<f32>], chunk_frames: usize) -> PlanarChunks<'a> {
        PlanarChunks {
            channels,
            chunk_frames: chunk_frames.max(1),
            position: 0,
        }
    }

    fn total_frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }
}

impl Iterator for PlanarChunks<'_> {
    type Item = Vec<Vec<f32>>;

    fn next(&mut self) -> Option<Self::Item> {
        let total = self.total_frames();
        if self.position >= total {
            return None;
        }
        let end = (self.position + self.chunk_frames).min(total);
        let chunk = self
            .channels
            .iter()
            .map(|channel| channel[self.position..end].to_vec())
            .collect();
        self.position = end;
        Some(chunk)
    }
}

/// Converts planar audio from one rate to another. The output holds
/// `round(frames * target / source)` frames per channel with the resampler's delay removed.
pub fn resample_planar(
    input: &[Vec<f32>],
    source_rate: u32,
    target_rate: u32,
    chunk_frames: usize,
) -> Result<Vec<Vec<f32>>, ResampleError> {
    if source_rate == target_rate {
        return Ok(input.to_vec());
    }

    let channels = input.len();
    let input_frames = input.first().map_or(0, Vec::len);
    if channels == 0 || input_frames == 0 {
        return Ok(vec![Vec::new(); channels]);
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let expected = (input_frames as f64 * ratio).round() as usize;
    let chunk_frames = chunk_frames.max(1);

    let sinc_params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        oversampling_factor: 128,
        interpolation: SincInterpolationType::Linear,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, sinc_params, chunk_frames, channels)
        .map_err(|e| ResampleError::Init {
            from: source_rate,
            to: target_rate,
            detail: e.to_string(),
        })?;

    let delay = resampler.output_delay();
    let wanted = expected + delay;
    let mut scratch = resampler.output_buffer_allocate(true);
    let mut output = vec![Vec::with_capacity(wanted); channels];

    for chunk in PlanarChunks::new(input, chunk_frames) {
        let frames = chunk.first().map_or(0, Vec::len);
        let (_, produced) = if frames == chunk_frames {
            resampler.process_into_buffer(&chunk, &mut scratch, None)
        } else {
            resampler.process_partial_into_buffer(Some(chunk.as_slice()), &mut scratch, None)
        }
        .map_err(|e| ResampleError::Process(e.to_string()))?;
        append(&mut output, &scratch, produced);
    }

    // Push zeros through until the delayed tail has come out.
    while output[0].len() < wanted {
        let (_, produced) = resampler
            .process_partial_into_buffer(None, &mut scratch, None)
            .map_err(|e| ResampleError::Process(e.to_string()))?;
        if produced == 0 {
            break;
        }
        append(&mut output, &scratch, produced);
    }

    for channel in output.iter_mut() {
        channel.drain(..delay.min(channel.len()));
        channel.resize(expected, 0.0);
    }
    debug!(
        source_rate,
        target_rate,
        input_frames,
        output_frames = expected,
        "Resampled audio"
    );
    Ok(output)
}

fn append(output: &mut [Vec<f32>], scratch: &[Vec<f32>], frames: usize) {
    for (out, produced) in output.iter_mut().zip(scratch) {
        out.extend_from_slice(&produced[..frames]);
    }
}
