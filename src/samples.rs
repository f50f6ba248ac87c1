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

//! Pad-triggered sample playback.

mod engine;
mod error;
mod loader;
mod pad;
mod render;
mod voice;

pub use engine::PadEngine;
pub use error::EngineError;
pub use loader::{PadBuffer, SampleLoader};
pub use pad::{
    default_pads, PadConfig, PadSlot, PlaybackMode, ACCENT_PALETTE, EMPTY_PAD_NAME,
    MAX_CHOKE_GROUP, MAX_GAIN, MAX_PITCH_SEMITONES, MIN_GAIN, MIN_PITCH_SEMITONES, PAD_COUNT,
};
pub use render::{PadActivity, Renderer};
