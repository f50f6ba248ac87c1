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
//! Whole-file decoding into planar f32 audio.

use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use symphonia::default::{get_codecs, get_probe};
use tracing::debug;

/// Errors raised while turning an encoded file into samples.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unrecognized audio container '{name}': {detail}")]
    Probe { name: String, detail: String },

    #[error("no audio track found in '{0}'")]
    NoTrack(String),

    #[error("sample rate not specified in '{0}'")]
    UnknownSampleRate(String),

    #[error("unable to determine channel count of '{0}'")]
    UnknownChannels(String),

    #[error("unsupported codec in '{name}': {detail}")]
    Codec { name: String, detail: String },

    #[error("audio error: {0}")]
    Audio(#[from] SymphoniaError),
}

/// Fully decoded audio. Each entry of `channels` holds one channel's samples, all the same length.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedAudio {
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }
}

/// Decodes any container/codec pair symphonia understands from a file on disk.
pub fn decode_file(path: &Path) -> Result<DecodedAudio, DecodeError> {
    let name = path.to_string_lossy().to_string();
    let file = File::open(path).map_err(|source| DecodeError::Io {
        path: name.clone(),
        source,
    })?;

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }
    decode_source(Box::new(file), hint, &name)
}

/// Decodes an in-memory encoded file. The container is detected from its contents.
pub fn decode_bytes(bytes: Vec<u8>) -> Result<DecodedAudio, DecodeError> {
    decode_source(Box::new(Cursor::new(bytes)), Hint::new(), "<memory>")
}

fn decode_source(
    source: Box<dyn MediaSource>,
    hint: Hint,
    name: &str,
) -> Result<DecodedAudio, DecodeError> {
    let mss = MediaSourceStream::new(source, Default::default());
    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();
    let probed = get_probe()
        .format(&hint, mss, &fmt_opts, &meta_opts)
        .map_err(|e| DecodeError::Probe {
            name: name.to_string(),
            detail: e.to_string(),
        })?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| DecodeError::NoTrack(name.to_string()))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let sample_rate = params
        .sample_rate
        .ok_or_else(|| DecodeError::UnknownSampleRate(name.to_string()))?;
    let mut decoder = get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(|e| DecodeError::Codec {
            name: name.to_string(),
            detail: e.to_string(),
        })?;

    // Channel count from the container when present, otherwise from the first decoded buffer.
    let mut channels: Vec<Vec<f32>> = match params.channels {
        Some(layout) if layout.count() > 0 => vec![Vec::new(); layout.count()],
        _ => Vec::new(),
    };
    if let Some(n_frames) = params.n_frames {
        for channel in channels.iter_mut() {
            channel.reserve(n_frames as usize);
        }
    }

    while let Some(packet) = next_packet(format_reader.as_mut(), decoder.as_mut())? {
        if packet.track_id() != track_id {
            continue;
        }
        match decoder.decode(&packet) {
            Ok(decoded) => append_planar(decoded, &mut channels),
            Err(SymphoniaError::DecodeError(e)) => {
                debug!(file = name, err = e, "Skipping undecodable packet");
            }
            Err(e) => return Err(e.into()),
        }
    }

    if channels.is_empty() {
        return Err(DecodeError::UnknownChannels(name.to_string()));
    }

    Ok(DecodedAudio {
        channels,
        sample_rate,
    })
}

/// Reads the next packet, resetting the decoder when the stream asks for it. EOF is `Ok(None)`.
fn next_packet(
    format_reader: &mut dyn FormatReader,
    decoder: &mut dyn Decoder,
) -> Result<Option<Packet>, DecodeError> {
    loop {
        match format_reader.next_packet() {
            Ok(packet) => return Ok(Some(packet)),
            Err(SymphoniaError::ResetRequired) => decoder.reset(),
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Ok(None)
            }
            // Some readers report the end of the stream as a decode error.
            Err(SymphoniaError::DecodeError(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        }
    }
}

fn append_planar(decoded: AudioBufferRef, out: &mut Vec<Vec<f32>>) {
    match decoded {
        AudioBufferRef::F32(buf) => extend_channels(&buf, out, |s| s),
        AudioBufferRef::F64(buf) => extend_channels(&buf, out, |s| s as f32),
        AudioBufferRef::S8(buf) => extend_channels(&buf, out, scale_s8),
        AudioBufferRef::S16(buf) => extend_channels(&buf, out, scale_s16),
        AudioBufferRef::S24(buf) => extend_channels(&buf, out, |s| scale_s24(s.inner())),
        AudioBufferRef::S32(buf) => extend_channels(&buf, out, scale_s32),
        AudioBufferRef::U8(buf) => extend_channels(&buf, out, scale_u8),
        AudioBufferRef::U16(buf) => extend_channels(&buf, out, scale_u16),
        AudioBufferRef::U24(buf) => extend_channels(&buf, out, |s| scale_u24(s.inner())),
        AudioBufferRef::U32(buf) => extend_channels(&buf, out, scale_u32),
    }
}

fn extend_channels<T, F>(buf: &AudioBuffer<T>, out: &mut Vec<Vec<f32>>, convert: F)
where
    T: Sample,
    F: Fn(T) -> f32,
{
    let channels = buf.spec().channels.count();
    if out.is_empty() {
        out.resize(channels, Vec::new());
    }
    for (index, channel) in out.iter_mut().enumerate() {
        if index < channels {
            channel.extend(buf.chan(index).iter().map(|s| convert(*s)));
        } else {
            // A packet that lost a channel keeps the planes aligned.
            channel.resize(channel.len() + buf.frames(), 0.0);
        }
    }
}

#[inline]
pub(crate) fn scale_s8(sample: i8) -> f32 {
    sample as f32 / (1i64 << 7) as f32
}

#[inline]
pub(crate) fn scale_s16(sample: i16) -> f32 {
    sample as f32 / (1i64 << 15) as f32
}

#[inline]
pub(crate) fn scale_s24(sample: i32) -> f32 {
    sample as f32 / (1i64 << 23) as f32
}

#[inline]
pub(crate) fn scale_s32(sample: i32) -> f32 {
    (sample as f64 / (1i64 << 31) as f64) as f32
}

#[inline]
pub(crate) fn scale_u8(sample: u8) -> f32 {
    (sample as f32 - 128.0) / 128.0
}

#[inline]
pub(crate) fn scale_u16(sample: u16) -> f32 {
    (sample as f32 - 32768.0) / 32768.0
}

#[inline]
pub(crate) fn scale_u24(sample: u32) -> f32 {
    (sample as f32 - (1u32 << 23) as f32) / (1u32 << 23) as f32
}

#[inline]
pub(crate) fn scale_u32(sample: u32) -> f32 {
    ((sample as f64 - (1u64 << 31) as f64) / (1u64 << 31) as f64) as f32
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;
    use crate::testutil::{sine, write_wav_f32, write_wav_i16};

    #[test]
    fn decodes_stereo_int_wav_planar() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("stereo.wav");
        let left = vec![0.5f32; 100];
        let right = vec![-0.25f32; 100];
        write_wav_i16(&path, &[left, right], 44100)?;

        let decoded = decode_file(&path)?;
        assert_eq!(44100, decoded.sample_rate);
        assert_eq!(2, decoded.channel_count());
        assert_eq!(100, decoded.frame_count());
        assert!(decoded.channels[0].iter().all(|s| (s - 0.5).abs() < 1e-4));
        assert!(decoded.channels[1].iter().all(|s| (s + 0.25).abs() < 1e-4));
        Ok(())
    }

    #[test]
    fn decodes_float_wav_from_bytes() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("mono.wav");
        let signal = sine(440.0, 48000, 4800, 0.8);
        write_wav_f32(&path, &[signal.clone()], 48000)?;

        let decoded = decode_bytes(fs::read(&path)?)?;
        assert_eq!(48000, decoded.sample_rate);
        assert_eq!(vec![signal], decoded.channels);
        assert!((decoded.duration_seconds() - 0.1).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn garbage_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("noise.wav");
        fs::write(&path, b"definitely not audio")?;
        assert!(decode_file(&path).is_err());
        assert!(matches!(
            decode_file(&dir.path().join("missing.wav")),
            Err(DecodeError::Io { .. })
        ));
        Ok(())
    }

    #[test]
    fn integer_scaling() {
        assert_eq!(-1.0, scale_s16(i16::MIN));
        assert_eq!(0.0, scale_s16(0));
        assert_eq!(-1.0, scale_s8(i8::MIN));
        assert_eq!(-1.0, scale_s24(-(1 << 23)));
        assert_eq!(-1.0, scale_s32(i32::MIN));
        assert_eq!(0.0, scale_u8(128));
        assert_eq!(-1.0, scale_u8(0));
        assert_eq!(0.0, scale_u16(32768));
        assert_eq!(0.0, scale_u24(1 << 23));
        assert_eq!(0.0, scale_u32(1 << 31));
    }
}
