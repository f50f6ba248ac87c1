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
use std::{fmt, sync::Arc};

use crate::config;

pub mod cpal;
pub mod decode;
mod error;
pub mod mock;
pub mod resample;
pub mod thread_priority;

pub use error::DeviceError;

/// The rate every pad buffer and imported sample is stored at.
pub const CANONICAL_SAMPLE_RATE: u32 = 48_000;

/// The pad mix is rendered in stereo and mapped onto the device's channels.
pub const MIX_CHANNELS: usize = 2;

/// The shape of an output stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub buffer_frames: u32,
}

impl StreamFormat {
    pub fn from_config(config: &config::Audio) -> StreamFormat {
        StreamFormat {
            sample_rate: config.sample_rate(),
            channels: MIX_CHANNELS as u16,
            buffer_frames: config.buffer_frames(),
        }
    }
}

/// Produces audio on the device's callback thread. Implementations must not block, allocate or
/// log from `render`.
pub trait Render: Send {
    /// Fills `output`, interleaved with `channels` samples per frame, with the next block.
    fn render(&mut self, output: &mut [f32], channels: usize);
}

/// A running output stream. Dropping it stops the stream and releases the renderer.
pub trait OutputStream: Send {
    /// The format the device actually accepted.
    fn format(&self) -> StreamFormat;
}

pub trait Device: fmt::Display + Send + Sync {
    /// Opens an output stream that pulls audio from the given renderer.
    fn open(
        &self,
        format: StreamFormat,
        renderer: Box<dyn Render>,
    ) -> Result<Box<dyn OutputStream>, DeviceError>;
}

/// Lists devices known to cpal.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, DeviceError> {
    cpal::Device::list()
}

/// Gets the device named by the configuration.
pub fn get_device(config: &config::Audio) -> Result<Arc<dyn Device>, DeviceError> {
    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(device)));
    };

    Ok(Arc::new(cpal::Device::get(device)?))
}
