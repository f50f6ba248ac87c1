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
    thread::{self, JoinHandle},
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Sample;
use crossbeam_channel::{bounded, Sender};
use tracing::{debug, error, info, span, Level};

use super::thread_priority::CallbackPriority;
use super::{Device as AudioDevice, DeviceError, OutputStream, Render, StreamFormat};

/// Frames rendered per pass when the device hands us a larger buffer.
const SCRATCH_FRAMES: usize = 1024;

/// The name that selects the host's default output device.
const DEFAULT_DEVICE_NAME: &str = "default";

/// A small wrapper around a cpal::Device.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The maximum number of channels the device supports.
    max_channels: u16,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

/// A stream living on its own thread. cpal streams can't move between threads, so the output
/// thread builds the stream, reports back, and holds it until this handle is dropped.
struct Stream {
    stop_tx: Sender<()>,
    thread: Option<JoinHandle<()>>,
    format: StreamFormat,
}

impl OutputStream for Stream {
    fn format(&self) -> StreamFormat {
        self.format
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Output thread panicked");
            }
        }
    }
}

impl Device {
    /// Lists cpal devices and produces the Device trait.
    pub fn list() -> Result<Vec<Box<dyn AudioDevice>>, DeviceError> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|device| {
                let device: Box<dyn AudioDevice> = Box::new(device);
                device
            })
            .collect())
    }

    /// Lists cpal devices that can output audio.
    fn list_cpal_devices() -> Result<Vec<Device>, DeviceError> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host = cpal::host_from_id(host_id).map_err(|e| DeviceError::Query(e.to_string()))?;
            let host_devices = match host.output_devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                if let Some(device) = Device::from_cpal(host_id, device) {
                    devices.push(device);
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    fn from_cpal(host_id: cpal::HostId, device: cpal::Device) -> Option<Device> {
        let max_channels = device
            .supported_output_configs()
            .ok()?
            .map(|config| config.channels())
            .max()
            .unwrap_or(0);
        if max_channels == 0 {
            return None;
        }
        #[allow(deprecated)]
        let name = device.name().ok()?;
        Some(Device {
            name,
            max_channels,
            host_id,
            device,
        })
    }

    /// Gets the given cpal device. "default" selects the host's default output.
    pub fn get(name: &str) -> Result<Device, DeviceError> {
        if name == DEFAULT_DEVICE_NAME {
            let host = cpal::default_host();
            return host
                .default_output_device()
                .and_then(|device| Device::from_cpal(host.id(), device))
                .ok_or_else(|| DeviceError::NotFound(name.to_string()));
        }

        Device::list_cpal_devices()?
            .into_iter()
            .find(|device| device.name.trim() == name)
            .ok_or_else(|| DeviceError::NotFound(name.to_string()))
    }
}

impl AudioDevice for Device {
    fn open(
        &self,
        format: StreamFormat,
        renderer: Box<dyn Render>,
    ) -> Result<Box<dyn OutputStream>, DeviceError> {
        let span = span!(Level::INFO, "open stream (cpal)");
        let _enter = span.enter();

        let device = self.device.clone();
        let max_channels = self.max_channels;
        let (ready_tx, ready_rx) = bounded::<Result<StreamFormat, DeviceError>>(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let thread = thread::Builder::new()
            .name("beatpad-output".to_string())
            .spawn(move || {
                let (stream, actual) =
                    match build_stream(&device, format, max_channels, renderer) {
                        Ok(built) => built,
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(DeviceError::StreamPlay(e.to_string())));
                    return;
                }
                let _ = ready_tx.send(Ok(actual));

                // Hold the stream until the handle is dropped.
                let _ = stop_rx.recv();
                drop(stream);
            })?;

        match ready_rx.recv() {
            Ok(Ok(actual)) => {
                info!(
                    device = self.name,
                    sample_rate = actual.sample_rate,
                    channels = actual.channels,
                    buffer_frames = actual.buffer_frames,
                    "CPAL output stream started"
                );
                Ok(Box::new(Stream {
                    stop_tx,
                    thread: Some(thread),
                    format: actual,
                }))
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(DeviceError::ThreadExited)
            }
        }
    }
}

fn build_stream(
    device: &cpal::Device,
    format: StreamFormat,
    max_channels: u16,
    renderer: Box<dyn Render>,
) -> Result<(cpal::Stream, StreamFormat), DeviceError> {
    let default_config = device
        .default_output_config()
        .map_err(|e| DeviceError::StreamConfig(e.to_string()))?;
    let channels = if max_channels >= format.channels {
        format.channels
    } else {
        default_config.channels()
    };

    let supported = device
        .supported_output_configs()
        .map_err(|e| DeviceError::StreamConfig(e.to_string()))?
        .any(|range| {
            range.channels() == channels
                && range.min_sample_rate() <= format.sample_rate
                && format.sample_rate <= range.max_sample_rate()
        });
    let sample_rate =
        stream_sample_rate(format.sample_rate, supported, default_config.sample_rate());
    if sample_rate != format.sample_rate {
        info!(
            requested = format.sample_rate,
            fallback = sample_rate,
            channels,
            "Requested rate unsupported, using the device default"
        );
    }

    let buffer_size = match default_config.buffer_size() {
        cpal::SupportedBufferSize::Range { min, max }
            if (*min..=*max).contains(&format.buffer_frames) =>
        {
            cpal::BufferSize::Fixed(format.buffer_frames)
        }
        _ => cpal::BufferSize::Default,
    };
    let config = cpal::StreamConfig {
        channels,
        sample_rate,
        buffer_size,
    };

    let stream = match default_config.sample_format() {
        cpal::SampleFormat::F32 => build::<f32>(device, &config, renderer),
        cpal::SampleFormat::I16 => build::<i16>(device, &config, renderer),
        cpal::SampleFormat::I32 => build::<i32>(device, &config, renderer),
        cpal::SampleFormat::U16 => build::<u16>(device, &config, renderer),
        other => Err(DeviceError::StreamConfig(format!(
            "unsupported device sample format {}",
            other
        ))),
    }?;

    let buffer_frames = match buffer_size {
        cpal::BufferSize::Fixed(frames) => frames,
        cpal::BufferSize::Default => format.buffer_frames,
    };
    Ok((
        stream,
        StreamFormat {
            sample_rate,
            channels,
            buffer_frames,
        },
    ))
}

/// The rate to open the stream at: the requested one when the device supports it, otherwise the
/// device's default.
fn stream_sample_rate(requested: u32, supported: bool, device_default: u32) -> u32 {
    if supported {
        requested
    } else {
        device_default
    }
}

fn build<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut renderer: Box<dyn Render>,
) -> Result<cpal::Stream, DeviceError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = config.channels as usize;
    let mut scratch = vec![0.0f32; SCRATCH_FRAMES * channels];
    let mut priority = CallbackPriority::from_env();
    debug!(
        priority = priority.priority(),
        realtime = priority.realtime(),
        "Output callback scheduling"
    );

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                priority.apply_once();
                for chunk in data.chunks_mut(scratch.len()) {
                    let block = &mut scratch[..chunk.len()];
                    renderer.render(block, channels);
                    for (dst, src) in chunk.iter_mut().zip(block.iter()) {
                        *dst = T::from_sample(*src);
                    }
                }
            },
            |err| error!(err = %err, "CPAL output stream error"),
            None,
        )
        .map_err(|e| DeviceError::StreamBuild(e.to_string()))
}
