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

use crate::audio::CANONICAL_SAMPLE_RATE;

const DEFAULT_DEVICE: &str = "default";
const DEFAULT_BUFFER_FRAMES: u32 = 128;
const DEFAULT_COMMAND_QUEUE_SIZE: usize = 256;
const DEFAULT_KIT_GAIN: f32 = 1.0;
const MAX_KIT_GAIN: f32 = 2.0;

/// A YAML representation of the audio configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Audio {
    /// The output device. Names starting with "mock" select the in-process mock device.
    device: Option<String>,

    /// Requested device sample rate in Hz (default: 48000).
    sample_rate: Option<u32>,

    /// Requested device period size in frames (default: 128). Small values keep trigger latency
    /// low but are more sensitive to callback jitter.
    buffer_frames: Option<u32>,

    /// Capacity of the control to render command queue.
    command_queue_size: Option<usize>,

    /// Master gain applied after the pad mix (default: 1.0).
    kit_gain: Option<f32>,
}

impl Audio {
    /// New will create a new Audio configuration for the given device.
    pub fn new(device: &str) -> Audio {
        Audio {
            device: Some(device.to_string()),
            ..Default::default()
        }
    }

    /// Returns the device from the configuration.
    pub fn device(&self) -> &str {
        self.device.as_deref().unwrap_or(DEFAULT_DEVICE)
    }

    /// Returns the requested device sample rate (default: 48000)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(CANONICAL_SAMPLE_RATE)
    }

    /// Returns the requested period size in frames (default: 128)
    pub fn buffer_frames(&self) -> u32 {
        self.buffer_frames.unwrap_or(DEFAULT_BUFFER_FRAMES).max(1)
    }

    /// Returns the command queue capacity (default: 256); never less than one.
    pub fn command_queue_size(&self) -> usize {
        self.command_queue_size
            .unwrap_or(DEFAULT_COMMAND_QUEUE_SIZE)
            .max(1)
    }

    /// Returns the master gain, clamped to [0, 2].
    pub fn kit_gain(&self) -> f32 {
        self.kit_gain
            .unwrap_or(DEFAULT_KIT_GAIN)
            .clamp(0.0, MAX_KIT_GAIN)
    }
}
