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

//! Render-side playback of a single pad.

use std::sync::Arc;

use super::loader::PadBuffer;

/// A playhead over a pad buffer. Owned by the render thread.
pub(crate) struct Voice {
    buffer: Arc<PadBuffer>,
    /// Fractional frame position.
    position: f64,
    /// Frames advanced per output frame.
    rate: f64,
    gain: f32,
    playing: bool,
}

impl Voice {
    pub(crate) fn new(buffer: Arc<PadBuffer>) -> Self {
        Self {
            buffer,
            position: 0.0,
            rate: 1.0,
            gain: 1.0,
            playing: false,
        }
    }

    pub(crate) fn sample_rate(&self) -> u32 {
        self.buffer.sample_rate()
    }

    /// Swaps in a buffer of the same format, stopping playback. Returns the old buffer.
    pub(crate) fn replace_buffer(&mut self, buffer: Arc<PadBuffer>) -> Arc<PadBuffer> {
        self.stop();
        std::mem::replace(&mut self.buffer, buffer)
    }

    pub(crate) fn into_buffer(self) -> Arc<PadBuffer> {
        self.buffer
    }

    /// Restarts playback from the first frame.
    pub(crate) fn start(&mut self, gain: f32, rate: f64) {
        self.position = 0.0;
        self.gain = gain;
        self.rate = rate;
        self.playing = self.buffer.frame_count() > 0;
    }

    pub(crate) fn stop(&mut self) {
        self.playing = false;
    }

    pub(crate) fn is_playing(&self) -> bool {
        self.playing
    }

    /// Adds this voice into an interleaved stereo block, linearly interpolating between frames.
    pub(crate) fn render_add(&mut self, block: &mut [f32]) {
        if !self.playing {
            return;
        }
        let frames = self.buffer.frame_count();
        for out in block.chunks_exact_mut(2) {
            let index = self.position as usize;
            if index >= frames {
                self.playing = false;
                return;
            }
            let frac = (self.position - index as f64) as f32;
            let (l0, r0) = self.buffer.frame(index);
            let (left, right) = if frac == 0.0 {
                (l0, r0)
            } else {
                let (l1, r1) = self.buffer.frame(index + 1);
                (l0 + (l1 - l0) * frac, r0 + (r1 - r0) * frac)
            };
            out[0] += left * self.gain;
            out[1] += right * self.gain;
            self.position += self.rate;
        }
        if self.position as usize >= frames {
            self.playing = false;
        }
    }
}
