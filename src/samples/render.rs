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

//! The render side of the pad engine.
//!
//! A [`Renderer`] lives on the device callback thread. It never blocks, allocates or logs: control
//! operations reach it as [`Command`]s on a bounded queue that is drained at the start of every
//! callback, and buffers it lets go of are handed back on a second queue so they are freed on the
//! control side.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crossbeam_channel::{Receiver, Sender};

use super::loader::PadBuffer;
use super::pad::PAD_COUNT;
use super::voice::Voice;
use crate::audio::{Render, MIX_CHANNELS};

/// Stereo frames mixed per pass.
const BLOCK_FRAMES: usize = 256;

/// A request from the control side.
pub(crate) enum Command {
    /// Restart `pad` from its first frame after silencing every pad in `choke`.
    Trigger {
        pad: usize,
        gain: f32,
        rate: f64,
        choke: [bool; PAD_COUNT],
    },
    /// Stop a pad (gate release).
    Stop { pad: usize },
    StopAll,
    Load { pad: usize, buffer: Arc<PadBuffer> },
    Clear { pad: usize },
    SetMasterGain(f32),
}

/// Per-pad "is sounding" flags published by the render side.
#[derive(Default)]
pub struct PadActivity {
    playing: [AtomicBool; PAD_COUNT],
}

impl PadActivity {
    pub fn is_playing(&self, pad: usize) -> bool {
        self.playing
            .get(pad)
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }

    fn set(&self, pad: usize, playing: bool) {
        self.playing[pad].store(playing, Ordering::Release);
    }

    pub(crate) fn clear(&self) {
        for flag in &self.playing {
            flag.store(false, Ordering::Release);
        }
    }
}

/// Mixes the eight pad chains into the device buffer.
pub struct Renderer {
    /// One chain per pad, allocated up front; a chain without a voice has no sample.
    chains: [Option<Voice>; PAD_COUNT],
    commands: Receiver<Command>,
    retired: Sender<Arc<PadBuffer>>,
    activity: Arc<PadActivity>,
    master_gain: f32,
    mix: Vec<f32>,
}

impl Renderer {
    pub(crate) fn new(
        buffers: [Option<Arc<PadBuffer>>; PAD_COUNT],
        commands: Receiver<Command>,
        retired: Sender<Arc<PadBuffer>>,
        activity: Arc<PadActivity>,
        master_gain: f32,
    ) -> Self {
        activity.clear();
        Self {
            chains: buffers.map(|buffer| buffer.map(Voice::new)),
            commands,
            retired,
            activity,
            master_gain,
            mix: vec![0.0; BLOCK_FRAMES * MIX_CHANNELS],
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Trigger {
                pad,
                gain,
                rate,
                choke,
            } => {
                for (index, chain) in self.chains.iter_mut().enumerate() {
                    if choke[index] && index != pad {
                        if let Some(voice) = chain {
                            voice.stop();
                        }
                    }
                }
                if let Some(voice) = &mut self.chains[pad] {
                    voice.start(gain, rate);
                }
            }
            Command::Stop { pad } => {
                if let Some(voice) = &mut self.chains[pad] {
                    voice.stop();
                }
            }
            Command::StopAll => {
                for voice in self.chains.iter_mut().flatten() {
                    voice.stop();
                }
            }
            Command::Load { pad, buffer } => {
                let old = match &mut self.chains[pad] {
                    // Same format: swap the buffer on the existing playhead.
                    Some(voice) if voice.sample_rate() == buffer.sample_rate() => {
                        Some(voice.replace_buffer(buffer))
                    }
                    chain => chain.replace(Voice::new(buffer)).map(Voice::into_buffer),
                };
                if let Some(old) = old {
                    self.retire(old);
                }
            }
            Command::Clear { pad } => {
                if let Some(voice) = self.chains[pad].take() {
                    self.retire(voice.into_buffer());
                }
            }
            Command::SetMasterGain(gain) => self.master_gain = gain,
        }
    }

    fn retire(&self, buffer: Arc<PadBuffer>) {
        // Both queues share one capacity, every command retires at most one buffer and the
        // control side empties this queue before each send, so it cannot fill while the engine
        // runs. The error arm is only reached if that invariant breaks, and it would then free
        // the buffer on this thread.
        let _ = self.retired.try_send(buffer);
    }

    fn publish_activity(&self) {
        for (pad, chain) in self.chains.iter().enumerate() {
            self.activity
                .set(pad, chain.as_ref().is_some_and(Voice::is_playing));
        }
    }
}

impl Render for Renderer {
    fn render(&mut self, output: &mut [f32], channels: usize) {
        while let Ok(command) = self.commands.try_recv() {
            self.apply(command);
        }

        if channels == 0 {
            return;
        }
        for block in output.chunks_mut(BLOCK_FRAMES * channels) {
            let frames = block.len() / channels;
            let mix = &mut self.mix[..frames * MIX_CHANNELS];
            mix.fill(0.0);
            for voice in self.chains.iter_mut().flatten() {
                voice.render_add(mix);
            }

            let gain = self.master_gain;
            for (frame, stereo) in block.chunks_exact_mut(channels).zip(mix.chunks_exact(2)) {
                let (left, right) = (stereo[0] * gain, stereo[1] * gain);
                match frame {
                    [mono] => *mono = (left + right) * 0.5,
                    [l, r, rest @ ..] => {
                        *l = left;
                        *r = right;
                        rest.fill(0.0);
                    }
                    [] => {}
                }
            }
        }

        self.publish_activity();
    }
}
