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
//! Helpers for writing test audio files and checking signals.

use std::{error::Error, f32::consts::PI, path::Path};

use hound::{SampleFormat, WavSpec, WavWriter};

/// Writes planar float samples as an interleaved 32-bit float WAV file.
pub fn write_wav_f32(
    path: &Path,
    channels: &[Vec<f32>],
    sample_rate: u32,
) -> Result<(), Box<dyn Error>> {
    write_wav(path, channels, sample_rate, 32, SampleFormat::Float, |s, w| {
        w.write_sample(s)
    })
}

/// Writes planar float samples as an interleaved 16-bit integer WAV file.
pub fn write_wav_i16(
    path: &Path,
    channels: &[Vec<f32>],
    sample_rate: u32,
) -> Result<(), Box<dyn Error>> {
    write_wav(path, channels, sample_rate, 16, SampleFormat::Int, |s, w| {
        w.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16)
    })
}

fn write_wav<F>(
    path: &Path,
    channels: &[Vec<f32>],
    sample_rate: u32,
    bits_per_sample: u16,
    sample_format: SampleFormat,
    mut write: F,
) -> Result<(), Box<dyn Error>>
where
    F: FnMut(f32, &mut WavWriter<std::io::BufWriter<std::fs::File>>) -> hound::Result<()>,
{
    assert!(channels.len() <= u16::MAX.into(), "Too many channels!");
    let mut writer = WavWriter::create(
        path,
        WavSpec {
            channels: channels.len() as u16,
            sample_rate,
            bits_per_sample,
            sample_format,
        },
    )?;

    let frames = channels.first().map_or(0, Vec::len);
    for frame in 0..frames {
        for channel in channels {
            write(channel[frame], &mut writer)?;
        }
    }
    writer.finalize()?;
    Ok(())
}

/// Reads a mono or multichannel float WAV back as interleaved samples with its spec.
pub fn read_wav_f32(path: &Path) -> Result<(Vec<f32>, WavSpec), Box<dyn Error>> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let samples = reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?;
    Ok((samples, spec))
}

/// A sine wave of the given frequency and amplitude.
pub fn sine(frequency: f32, sample_rate: u32, frames: usize, amplitude: f32) -> Vec<f32> {
    (0..frames)
        .map(|i| amplitude * (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin())
        .collect()
}

/// Largest absolute sample value.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
}

/// Calculate RMS (Root Mean Square) of a signal
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|&x| x * x).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
