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

//! Decode, resample, fold, normalize, analyze and encode a single file.

use std::cell::Cell;
use std::fs;
use std::io::BufWriter;
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::{debug, info, span, Level};

use super::error::ImportError;
use super::progress::{ImportProgress, ImportStage, ProgressSink};
use crate::audio::decode;
use crate::audio::resample::{self, ResampleError};
use crate::audio::CANONICAL_SAMPLE_RATE;
use crate::config;
use crate::paths::parent_dir;
use crate::playsync::CancelHandle;
use crate::util::filename_display;

/// Gain applied to each side when folding stereo to mono.
const STEREO_FOLD_GAIN: f32 = 0.707_106_78;

/// What the pipeline learned about the file it wrote.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AudioAnalysis {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub file_size_bytes: u64,
    pub peak: f32,
    pub rms: f32,
}

/// Converts source files into 48 kHz mono float WAV files normalized to a fixed peak.
#[derive(Clone, Debug)]
pub struct ImportPipeline {
    target_peak: f32,
    chunk_frames: usize,
}

impl ImportPipeline {
    pub fn new(config: &config::Import) -> ImportPipeline {
        ImportPipeline {
            target_peak: config.target_peak_linear(),
            chunk_frames: config.chunk_frames(),
        }
    }

    /// The linear peak every output is normalized to.
    pub fn target_peak(&self) -> f32 {
        self.target_peak
    }

    /// Runs every stage for one file. The destination is only ever replaced whole, and only if
    /// every stage succeeded.
    pub fn run(
        &self,
        source: &Path,
        destination: &Path,
        progress: &dyn ProgressSink,
        cancel: &CancelHandle,
    ) -> Result<AudioAnalysis, ImportError> {
        let span = span!(Level::INFO, "import", file = filename_display(source));
        let _enter = span.enter();

        let reporter = Reporter::new(filename_display(source), progress);

        reporter.report(ImportStage::Decoding, ImportStage::Decoding.fraction());
        let decoded =
            decode::decode_file(source).map_err(|e| ImportError::DecodeFailed(e.to_string()))?;
        if decoded.sample_rate == 0 {
            return Err(ImportError::DecodeFailed(
                "source reports a sample rate of 0".to_string(),
            ));
        }
        debug!(
            sample_rate = decoded.sample_rate,
            channels = decoded.channel_count(),
            frames = decoded.frame_count(),
            "Decoded source"
        );
        reporter.report(ImportStage::Decoding, 0.3);
        checkpoint(cancel)?;

        reporter.report(ImportStage::Resampling, ImportStage::Resampling.fraction());
        let channels = resample::resample_planar(
            &decoded.channels,
            decoded.sample_rate,
            CANONICAL_SAMPLE_RATE,
            self.chunk_frames,
        )
        .map_err(|e| match e {
            ResampleError::Init { .. } => ImportError::ConverterInitFailed(e.to_string()),
            ResampleError::Process(detail) => ImportError::ResampleFailed(detail),
        })?;
        drop(decoded);
        checkpoint(cancel)?;

        reporter.report(ImportStage::Converting, ImportStage::Converting.fraction());
        let mut mono = fold_to_mono(&channels)?;
        drop(channels);
        checkpoint(cancel)?;

        reporter.report(ImportStage::Normalizing, ImportStage::Normalizing.fraction());
        let gain = normalize_peak(&mut mono, self.target_peak);
        checkpoint(cancel)?;

        reporter.report(ImportStage::Analyzing, ImportStage::Analyzing.fraction());
        let mut analysis = analyze(&mono, CANONICAL_SAMPLE_RATE);
        checkpoint(cancel)?;

        reporter.report(ImportStage::Writing, ImportStage::Writing.fraction());
        analysis.file_size_bytes = encode(&mono, destination)?;

        reporter.report(ImportStage::Ready, ImportStage::Ready.fraction());
        info!(
            destination = ?destination,
            duration = analysis.duration_seconds,
            peak = analysis.peak,
            rms = analysis.rms,
            gain,
            "Imported sample"
        );
        Ok(analysis)
    }
}

/// Keeps reports for one file monotonic.
struct Reporter<'a> {
    file_name: String,
    sink: &'a dyn ProgressSink,
    last: Cell<f64>,
}

impl<'a> Reporter<'a> {
    fn new(file_name: &str, sink: &'a dyn ProgressSink) -> Self {
        Self {
            file_name: file_name.to_string(),
            sink,
            last: Cell::new(0.0),
        }
    }

    fn report(&self, stage: ImportStage, fraction: f64) {
        let fraction = self.last.get().max(fraction);
        self.last.set(fraction);
        self.sink.report(ImportProgress {
            file_name: self.file_name.clone(),
            stage,
            fraction,
        });
    }
}

fn checkpoint(cancel: &CancelHandle) -> Result<(), ImportError> {
    if cancel.is_cancelled() {
        debug!("Import cancelled");
        return Err(ImportError::Cancelled);
    }
    Ok(())
}

/// Folds planar audio to one channel. Mono is copied; otherwise the first two channels are summed
/// at -3 dB each and any further channels are ignored.
pub fn fold_to_mono(channels: &[Vec<f32>]) -> Result<Vec<f32>, ImportError> {
    let frames = channels.first().map_or(0, Vec::len);
    let mut mono = Vec::new();
    mono.try_reserve_exact(frames)
        .map_err(|_| ImportError::BufferAllocFailed(frames))?;
    match channels {
        [] => {}
        [only] => mono.extend_from_slice(only),
        [left, right, ..] => mono.extend(
            left.iter()
                .zip(right)
                .map(|(l, r)| (l + r) * STEREO_FOLD_GAIN),
        ),
    }
    Ok(mono)
}

/// Scales samples so the loudest sits at `target`. Silence is left as is. Returns the gain.
pub fn normalize_peak(samples: &mut [f32], target: f32) -> f32 {
    let peak = peak(samples);
    if peak <= 0.0 || !peak.is_finite() {
        return 1.0;
    }
    let gain = target / peak;
    for sample in samples.iter_mut() {
        *sample = (*sample * gain).clamp(-target, target);
    }
    gain
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
}

/// Duration, peak and RMS of mono samples. File size is left at zero.
pub fn analyze(samples: &[f32], sample_rate: u32) -> AudioAnalysis {
    let rms = if samples.is_empty() {
        0.0
    } else {
        let sum_squares: f64 = samples.iter().map(|s| (*s as f64) * (*s as f64)).sum();
        (sum_squares / samples.len() as f64).sqrt() as f32
    };
    AudioAnalysis {
        duration_seconds: if sample_rate == 0 {
            0.0
        } else {
            samples.len() as f64 / sample_rate as f64
        },
        sample_rate,
        channels: 1,
        file_size_bytes: 0,
        peak: peak(samples),
        rms,
    }
}

/// Writes 32-bit float mono WAV to a temporary sibling and renames it over the destination.
fn encode(samples: &[f32], destination: &Path) -> Result<u64, ImportError> {
    let write_failed = |e: &dyn std::fmt::Display| ImportError::WriteFailed(e.to_string());

    let dir = parent_dir(destination);
    fs::create_dir_all(dir).map_err(|e| write_failed(&e))?;
    let temp = tempfile::Builder::new()
        .prefix(".import-")
        .suffix(".partial")
        .tempfile_in(dir)
        .map_err(|e| write_failed(&e))?;

    let spec = WavSpec {
        channels: 1,
        sample_rate: CANONICAL_SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    {
        let mut writer =
            WavWriter::new(BufWriter::new(temp.as_file()), spec).map_err(|e| write_failed(&e))?;
        for sample in samples {
            writer.write_sample(*sample).map_err(|e| write_failed(&e))?;
        }
        writer.finalize().map_err(|e| write_failed(&e))?;
    }
    temp.as_file().sync_all().map_err(|e| write_failed(&e))?;
    temp.persist(destination)
        .map_err(|e| write_failed(&e.error))?;

    fs::metadata(destination)
        .map(|metadata| metadata.len())
        .map_err(|e| write_failed(&e))
}
