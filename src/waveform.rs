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

//! Fixed-size peak previews of samples, cached on disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::audio::decode::{self, DecodeError};
use crate::paths::{clean_filename, write_atomic};

/// Points in every waveform preview.
pub const WAVEFORM_POINTS: usize = 200;

const CACHE_EXTENSION: &str = "waveform";

/// Reduces samples to [`WAVEFORM_POINTS`] peaks. Point `i` is the largest absolute value in
/// `[i * len / points, (i + 1) * len / points)`, so every point covers part of the signal and
/// window sizes differ by at most one sample. Input shorter than the preview gets one point per
/// sample and zeros after the end.
pub fn generate(samples: &[f32]) -> Vec<f32> {
    let mut points = vec![0.0f32; WAVEFORM_POINTS];
    if samples.len() < WAVEFORM_POINTS {
        for (point, sample) in points.iter_mut().zip(samples) {
            *point = sample.abs();
        }
        return points;
    }
    let len = samples.len();
    for (i, point) in points.iter_mut().enumerate() {
        let window = &samples[i * len / WAVEFORM_POINTS..(i + 1) * len / WAVEFORM_POINTS];
        *point = window.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    }
    points
}

/// Decodes an encoded file held in memory and previews its first channel.
pub fn generate_from_bytes(bytes: Vec<u8>) -> Result<Vec<f32>, DecodeError> {
    let decoded = decode::decode_bytes(bytes)?;
    Ok(generate(decoded.channels.first().map_or(&[][..], Vec::as_slice)))
}

/// Decodes a file and previews its first channel.
pub fn generate_from_file(path: &Path) -> Result<Vec<f32>, DecodeError> {
    let decoded = decode::decode_file(path)?;
    Ok(generate(decoded.channels.first().map_or(&[][..], Vec::as_slice)))
}

/// Previews stored as raw little-endian f32 values, one file per sample id.
#[derive(Clone, Debug)]
pub struct WaveformCache {
    dir: PathBuf,
}

impl WaveformCache {
    pub fn new(dir: impl Into<PathBuf>) -> WaveformCache {
        WaveformCache { dir: dir.into() }
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", clean_filename(id), CACHE_EXTENSION))
    }

    /// The cached preview, if one exists and has the expected size.
    pub fn load(&self, id: &str) -> Option<Vec<f32>> {
        let path = self.path_for(id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = ?path, err = %e, "Unable to read cached waveform");
                return None;
            }
        };
        if bytes.len() != WAVEFORM_POINTS * 4 {
            warn!(path = ?path, len = bytes.len(), "Ignoring malformed cached waveform");
            return None;
        }
        Some(
            bytes
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        )
    }

    pub fn save(&self, id: &str, points: &[f32]) -> io::Result<()> {
        let bytes: Vec<u8> = points.iter().flat_map(|p| p.to_le_bytes()).collect();
        write_atomic(&self.path_for(id), &bytes)
    }

    /// Deletes a cached preview. A missing preview is not an error.
    pub fn remove(&self, id: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// The cached preview for `id`, generating and caching it from `audio` when missing. A file
    /// that can't be decoded previews as silence.
    pub fn waveform_for(&self, id: &str, audio: &Path) -> Vec<f32> {
        if let Some(points) = self.load(id) {
            return points;
        }
        match generate_from_file(audio) {
            Ok(points) => {
                if let Err(e) = self.save(id, &points) {
                    warn!(id, err = %e, "Unable to cache waveform");
                }
                debug!(id, "Generated waveform");
                points
            }
            Err(e) => {
                warn!(id, path = ?audio, err = %e, "Unable to generate waveform");
                vec![0.0; WAVEFORM_POINTS]
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::write_wav_f32;

    #[test]
    fn windows_cover_the_whole_signal() {
        for len in [200, 201, 450, 24_001] {
            let points = generate(&vec![1.0; len]);
            assert_eq!(WAVEFORM_POINTS, points.len());
            let zeros = points.iter().filter(|p| **p == 0.0).count();
            assert_eq!(0, zeros, "{} samples", len);
        }
    }

    #[test]
    fn last_point_sees_the_tail() {
        let mut samples = vec![0.1f32; 201];
        samples[200] = -0.75;
        let points = generate(&samples);
        assert_eq!(0.75, points[WAVEFORM_POINTS - 1]);
        assert!(points[..WAVEFORM_POINTS - 1].iter().all(|p| *p == 0.1));
    }

    #[test]
    fn even_windows_take_the_peak() {
        // 600 samples: three per window, the middle one loudest.
        let samples: Vec<f32> = (0..600).map(|i| if i % 3 == 1 { -0.5 } else { 0.1 }).collect();
        assert!(generate(&samples).iter().all(|p| *p == 0.5));
    }

    #[test]
    fn short_input_is_padded() {
        let points = generate(&[0.1, -0.9, 0.3]);
        assert_eq!(WAVEFORM_POINTS, points.len());
        assert_eq!(&[0.1, 0.9, 0.3], &points[..3]);
        assert!(points[3..].iter().all(|p| *p == 0.0));
        assert_eq!(vec![0.0; WAVEFORM_POINTS], generate(&[]));
    }

    #[test]
    fn generation_is_deterministic() {
        let samples: Vec<f32> = (0..10_000).map(|i| ((i * 7919) % 1000) as f32 / 1000.0).collect();
        assert_eq!(generate(&samples), generate(&samples));
    }

    #[test]
    fn cache_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let cache = WaveformCache::new(dir.path().join("Previews"));
        assert!(cache.load("abc").is_none());

        let points: Vec<f32> = (0..WAVEFORM_POINTS).map(|i| i as f32 / 1000.0).collect();
        cache.save("abc", &points)?;
        assert_eq!(Some(points), cache.load("abc"));
        assert_eq!(
            (WAVEFORM_POINTS * 4) as u64,
            fs::metadata(cache.path_for("abc"))?.len()
        );

        fs::write(cache.path_for("short"), [0u8; 12])?;
        assert!(cache.load("short").is_none());

        cache.remove("abc")?;
        cache.remove("abc")?;
        assert!(cache.load("abc").is_none());
        Ok(())
    }

    #[test]
    fn waveform_for_generates_then_caches() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let audio = dir.path().join("hit.wav");
        write_wav_f32(&audio, &[vec![0.25; 400], vec![0.75; 400]], 48000)?;
        let cache = WaveformCache::new(dir.path().join("Previews"));

        let points = cache.waveform_for("hit", &audio);
        assert!(points.iter().all(|p| *p == 0.25));
        assert!(cache.path_for("hit").exists());

        // Served from the cache even once the audio is gone.
        fs::remove_file(&audio)?;
        assert_eq!(points, cache.waveform_for("hit", &audio));
        assert_eq!(vec![0.0; WAVEFORM_POINTS], cache.waveform_for("other", &audio));
        Ok(())
    }

    #[test]
    fn bytes_and_file_agree() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let audio = dir.path().join("hit.wav");
        write_wav_f32(&audio, &[(0..1000).map(|i| i as f32 / 2000.0).collect()], 44100)?;
        assert_eq!(
            generate_from_file(&audio)?,
            generate_from_bytes(fs::read(&audio)?)?
        );
        Ok(())
    }
}
