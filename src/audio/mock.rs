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
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;
use tracing::info;

use super::{DeviceError, OutputStream, Render, StreamFormat};

type RendererSlot = Arc<Mutex<Option<Box<dyn Render>>>>;

/// A mock device. Nothing is played; whoever holds the device pulls audio out of the open
/// stream's renderer by hand.
#[derive(Clone)]
pub struct Device {
    name: String,
    renderer: RendererSlot,
    fail_open: Arc<AtomicBool>,
    /// The rate streams open at; zero honours the requested rate.
    sample_rate: Arc<AtomicU32>,
}

struct Stream {
    renderer: RendererSlot,
    format: StreamFormat,
}

impl OutputStream for Stream {
    fn format(&self) -> StreamFormat {
        self.format
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        self.renderer.lock().take();
    }
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            renderer: Arc::new(Mutex::new(None)),
            fail_open: Arc::new(AtomicBool::new(false)),
            sample_rate: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Makes subsequent streams open at `rate` whatever was requested, like hardware that lacks
    /// the requested rate.
    pub fn set_sample_rate(&self, rate: u32) {
        self.sample_rate.store(rate, Ordering::Relaxed);
    }

    /// Makes every subsequent open fail until cleared.
    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::Relaxed);
    }

    /// Returns true while a stream is open on the device.
    pub fn is_open(&self) -> bool {
        self.renderer.lock().is_some()
    }

    /// Renders the given number of stereo frames, or silence when no stream is open.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut output = vec![0.0; frames * 2];
        self.render_into(&mut output, 2);
        output
    }

    /// Renders into a caller supplied interleaved buffer.
    pub fn render_into(&self, output: &mut [f32], channels: usize) {
        match self.renderer.lock().as_mut() {
            Some(renderer) => renderer.render(output, channels),
            None => output.fill(0.0),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Channels=2) (Mock)", self.name)
    }
}

impl super::Device for Device {
    fn open(
        &self,
        format: StreamFormat,
        renderer: Box<dyn Render>,
    ) -> Result<Box<dyn OutputStream>, DeviceError> {
        if self.fail_open.load(Ordering::Relaxed) {
            return Err(DeviceError::StreamBuild(format!(
                "mock device {} refused to open",
                self.name
            )));
        }

        let mut slot = self.renderer.lock();
        if slot.is_some() {
            return Err(DeviceError::StreamBuild(format!(
                "mock device {} already has an open stream",
                self.name
            )));
        }
        *slot = Some(renderer);
        info!(device = self.name, "Mock output stream started");

        let sample_rate = match self.sample_rate.load(Ordering::Relaxed) {
            0 => format.sample_rate,
            rate => rate,
        };
        Ok(Box::new(Stream {
            renderer: self.renderer.clone(),
            format: StreamFormat {
                sample_rate,
                channels: 2,
                ..format
            },
        }))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::audio::Device as _;

    struct Constant(f32);

    impl Render for Constant {
        fn render(&mut self, output: &mut [f32], _: usize) {
            output.fill(self.0);
        }
    }

    fn format() -> StreamFormat {
        StreamFormat {
            sample_rate: 48000,
            channels: 2,
            buffer_frames: 128,
        }
    }

    #[test]
    fn renders_while_open() -> Result<(), DeviceError> {
        let device = Device::get("mock-device");
        assert_eq!(vec![0.0; 4], device.render(2));

        let stream = device.open(format(), Box::new(Constant(0.5)))?;
        assert!(device.is_open());
        assert_eq!(vec![0.5; 4], device.render(2));
        assert!(device.open(format(), Box::new(Constant(0.1))).is_err());

        drop(stream);
        assert!(!device.is_open());
        assert_eq!(vec![0.0; 4], device.render(2));
        Ok(())
    }

    #[test]
    fn forced_rate_overrides_request() -> Result<(), DeviceError> {
        let device = Device::get("mock-device");
        device.set_sample_rate(44100);
        let stream = device.open(format(), Box::new(Constant(0.5)))?;
        assert_eq!(44100, stream.format().sample_rate);
        Ok(())
    }

    #[test]
    fn open_can_fail() {
        let device = Device::get("mock-device");
        device.set_fail_open(true);
        assert!(device.open(format(), Box::new(Constant(0.5))).is_err());
        device.set_fail_open(false);
        assert!(device.open(format(), Box::new(Constant(0.5))).is_ok());
    }
}
