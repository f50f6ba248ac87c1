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

//! Pad slots and the playback parameters they carry.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Number of pads on the instrument.
pub const PAD_COUNT: usize = 8;

/// Choke group 0 means "no group"; 1 through this value choke each other.
pub const MAX_CHOKE_GROUP: u8 = 4;

pub const MIN_GAIN: f32 = 0.0;
pub const MAX_GAIN: f32 = 1.5;
pub const MIN_PITCH_SEMITONES: i8 = -12;
pub const MAX_PITCH_SEMITONES: i8 = 12;

/// Pad accent colors, cycled across the pads.
pub const ACCENT_PALETTE: [&str; 4] = ["#F26249", "#52B3B6", "#EC2F3B", "#FF9B5A"];

/// Name shown on a pad without a sample.
pub const EMPTY_PAD_NAME: &str = "Empty";

/// What releasing a pad does.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackMode {
    /// Plays to the end of the sample regardless of release.
    #[default]
    OneShot,
    /// Stops on release.
    Gate,
}

/// The parameters consulted when a pad is triggered. Values are always within range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PadConfig {
    playback_mode: PlaybackMode,
    choke_group: u8,
    gain: f32,
    pitch_semitones: i8,
}

impl Default for PadConfig {
    fn default() -> Self {
        PadConfig {
            playback_mode: PlaybackMode::OneShot,
            choke_group: 0,
            gain: 1.0,
            pitch_semitones: 0,
        }
    }
}

impl PadConfig {
    /// Creates a config, clamping every value into its allowed range.
    pub fn new(
        playback_mode: PlaybackMode,
        choke_group: u8,
        gain: f32,
        pitch_semitones: i8,
    ) -> PadConfig {
        let gain = if gain.is_finite() { gain } else { 1.0 };
        PadConfig {
            playback_mode,
            choke_group: choke_group.min(MAX_CHOKE_GROUP),
            gain: gain.clamp(MIN_GAIN, MAX_GAIN),
            pitch_semitones: pitch_semitones.clamp(MIN_PITCH_SEMITONES, MAX_PITCH_SEMITONES),
        }
    }

    pub fn playback_mode(&self) -> PlaybackMode {
        self.playback_mode
    }

    pub fn choke_group(&self) -> u8 {
        self.choke_group
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn pitch_semitones(&self) -> i8 {
        self.pitch_semitones
    }

    /// Playback speed for the pitch offset, 2^(semitones / 12).
    pub fn playback_rate(&self) -> f64 {
        2f64.powf(self.pitch_semitones as f64 / 12.0)
    }

    /// True when triggering `self` should silence a pad configured with `other`.
    pub fn chokes(&self, other: &PadConfig) -> bool {
        self.choke_group != 0 && self.choke_group == other.choke_group
    }
}

fn default_gain() -> f32 {
    1.0
}

/// A pad as the user sees it: what's on it and how it plays.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PadSlot {
    pub id: usize,
    pub name: String,
    pub accent_hex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_ref: Option<PathBuf>,
    #[serde(default)]
    pub playback_mode: PlaybackMode,
    #[serde(default)]
    pub choke_group: u8,
    #[serde(default = "default_gain")]
    pub gain: f32,
    #[serde(default)]
    pub pitch_semitones: i8,
    #[serde(default)]
    pub is_favourite: bool,
}

impl PadSlot {
    /// An empty pad with the default parameters and its palette color.
    pub fn new(id: usize) -> PadSlot {
        PadSlot {
            id,
            name: EMPTY_PAD_NAME.to_string(),
            accent_hex: ACCENT_PALETTE[id % ACCENT_PALETTE.len()].to_string(),
            sample_ref: None,
            playback_mode: PlaybackMode::OneShot,
            choke_group: 0,
            gain: 1.0,
            pitch_semitones: 0,
            is_favourite: false,
        }
    }

    pub fn has_sample(&self) -> bool {
        self.sample_ref.is_some()
    }

    /// The pad's parameters, clamped into range.
    pub fn config(&self) -> PadConfig {
        PadConfig::new(self.playback_mode, self.choke_group, self.gain, self.pitch_semitones)
    }

    pub fn apply_config(&mut self, config: PadConfig) {
        self.playback_mode = config.playback_mode;
        self.choke_group = config.choke_group;
        self.gain = config.gain;
        self.pitch_semitones = config.pitch_semitones;
    }

    /// Forgets the sample, keeping the parameters.
    pub fn clear_sample(&mut self) {
        self.sample_ref = None;
        self.name = EMPTY_PAD_NAME.to_string();
    }
}

/// The full set of empty pads.
pub fn default_pads() -> Vec<PadSlot> {
    (0..PAD_COUNT).map(PadSlot::new).collect()
}
