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

//! The control side of the pad engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tracing::{debug, info, span, warn, Level};

use super::error::EngineError;
use super::loader::{PadBuffer, SampleLoader};
use super::pad::{default_pads, PadConfig, PadSlot, PlaybackMode, PAD_COUNT};
use super::render::{Command, PadActivity, Renderer};
use crate::audio::{Device, OutputStream, StreamFormat};
use crate::config;
use crate::kit::{Kit, PadStateRecord};
use crate::util::sample_display_name;

/// Extensions tried, in order, for bundled fallback samples.
const BUNDLED_EXTENSIONS: [&str; 3] = ["wav", "aif", "aiff"];

const MAX_KIT_GAIN: f32 = 2.0;

/// Everything that only exists while the stream is running.
/// `stream` is declared first so it stops before the retire queue disconnects.
struct RunningStream {
    stream: Box<dyn OutputStream>,
    commands: Sender<Command>,
    retired: Receiver<Arc<PadBuffer>>,
}

/// Owns the pads and the output stream. All methods are called from control threads; audio is
/// produced by a [`Renderer`] on the device's callback thread.
///
/// Lock order is `buffers`, then `pads`, then `stream`.
pub struct PadEngine {
    device: Arc<dyn Device>,
    format: StreamFormat,
    loader: SampleLoader,
    command_queue_size: usize,
    /// The buffers the render side holds, kept so a fresh renderer can be preloaded.
    buffers: Mutex<[Option<Arc<PadBuffer>>; PAD_COUNT]>,
    pads: RwLock<Vec<PadSlot>>,
    stream: Mutex<Option<RunningStream>>,
    activity: Arc<PadActivity>,
    kit_gain: Mutex<f32>,
    pads_tx: watch::Sender<Vec<PadSlot>>,
}

impl PadEngine {
    /// Creates a stopped engine with eight empty pads.
    pub fn new(device: Arc<dyn Device>, audio: &config::Audio, chunk_frames: usize) -> PadEngine {
        let format = StreamFormat::from_config(audio);
        let pads = default_pads();
        let (pads_tx, _) = watch::channel(pads.clone());
        PadEngine {
            device,
            format,
            loader: SampleLoader::new(format.sample_rate, chunk_frames),
            command_queue_size: audio.command_queue_size(),
            buffers: Mutex::new(Default::default()),
            pads: RwLock::new(pads),
            stream: Mutex::new(None),
            activity: Arc::new(PadActivity::default()),
            kit_gain: Mutex::new(audio.kit_gain()),
            pads_tx,
        }
    }

    /// Opens the output stream. Starting a running engine does nothing; a failed start leaves the
    /// engine stopped and can be retried.
    pub fn start(&self) -> Result<(), EngineError> {
        let span = span!(Level::INFO, "start engine");
        let _enter = span.enter();

        let buffers = self.buffers.lock();
        let mut stream = self.stream.lock();
        if stream.is_some() {
            return Ok(());
        }

        let (commands, command_rx) = bounded(self.command_queue_size);
        let (retired_tx, retired) = bounded(self.command_queue_size);
        let renderer = Renderer::new(
            buffers.clone(),
            command_rx,
            retired_tx,
            self.activity.clone(),
            *self.kit_gain.lock(),
        );

        match self.device.open(self.format, Box::new(renderer)) {
            Ok(output) => {
                let actual = output.format();
                if actual.sample_rate != self.format.sample_rate {
                    warn!(
                        requested = self.format.sample_rate,
                        actual = actual.sample_rate,
                        "Device runs at a different rate than the pads are converted to"
                    );
                }
                info!(
                    device = %self.device,
                    sample_rate = actual.sample_rate,
                    channels = actual.channels,
                    "Engine started"
                );
                *stream = Some(RunningStream {
                    commands,
                    retired,
                    stream: output,
                });
                Ok(())
            }
            Err(e) => {
                warn!(device = %self.device, err = %e, "Unable to start engine");
                Err(e.into())
            }
        }
    }

    /// Stops the output stream. Stopping a stopped engine does nothing.
    pub fn stop(&self) {
        let running = self.stream.lock().take();
        if let Some(running) = running {
            drop(running.stream);
            self.activity.clear();
            info!("Engine stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.stream.lock().is_some()
    }

    /// The format of the running stream.
    pub fn output_format(&self) -> Option<StreamFormat> {
        self.stream
            .lock()
            .as_ref()
            .map(|running| running.stream.format())
    }

    /// Loads a sample file onto a pad, naming the pad after the file.
    pub fn load_sample(&self, pad: usize, path: &Path) -> Result<(), EngineError> {
        self.load_sample_named(pad, path, &sample_display_name(path))
    }

    /// Loads a sample file onto a pad. Decoding and conversion happen on the calling thread; on
    /// failure the pad keeps whatever it had before.
    pub fn load_sample_named(
        &self,
        pad: usize,
        path: &Path,
        name: &str,
    ) -> Result<(), EngineError> {
        check_pad(pad)?;
        let buffer = match self.loader.load(path) {
            Ok(buffer) => Arc::new(buffer),
            Err(e) => {
                warn!(pad, path = ?path, err = %e, "Unable to load sample, pad unchanged");
                return Err(e);
            }
        };

        let mut buffers = self.buffers.lock();
        buffers[pad] = Some(buffer.clone());
        {
            let mut pads = self.pads.write();
            pads[pad].sample_ref = Some(path.to_path_buf());
            pads[pad].name = name.to_string();
        }
        let sent = self.send(Command::Load { pad, buffer });
        drop(buffers);
        self.publish();
        sent
    }

    /// Handles a pad press (`is_down`) or release.
    pub fn trigger(&self, pad: usize, is_down: bool) -> Result<(), EngineError> {
        check_pad(pad)?;
        if self.buffers.lock()[pad].is_none() {
            debug!(pad, "Trigger on a pad without a sample");
            return Ok(());
        }

        let pads = self.pads.read();
        let config = pads[pad].config();
        if is_down {
            let mut choke = [false; PAD_COUNT];
            for (index, other) in pads.iter().enumerate() {
                choke[index] = index != pad && config.chokes(&other.config());
            }
            drop(pads);
            self.send(Command::Trigger {
                pad,
                gain: config.gain(),
                rate: config.playback_rate(),
                choke,
            })
        } else if config.playback_mode() == PlaybackMode::Gate {
            drop(pads);
            self.send(Command::Stop { pad })
        } else {
            Ok(())
        }
    }

    /// Updates the parameters future triggers of the pad use. Values are clamped into range and
    /// voices already sounding are left alone.
    pub fn update_pad_config(
        &self,
        pad: usize,
        playback_mode: PlaybackMode,
        choke_group: u8,
        gain: f32,
        pitch_semitones: i8,
    ) -> Result<PadConfig, EngineError> {
        check_pad(pad)?;
        let config = PadConfig::new(playback_mode, choke_group, gain, pitch_semitones);
        self.pads.write()[pad].apply_config(config);
        self.publish();
        Ok(config)
    }

    /// Removes a pad's sample. Its parameters are kept.
    pub fn clear_pad(&self, pad: usize) -> Result<(), EngineError> {
        check_pad(pad)?;
        let mut buffers = self.buffers.lock();
        buffers[pad] = None;
        self.pads.write()[pad].clear_sample();
        let sent = self.send(Command::Clear { pad });
        drop(buffers);
        self.publish();
        sent
    }

    /// Silences every pad.
    pub fn stop_all(&self) -> Result<(), EngineError> {
        self.send(Command::StopAll)
    }

    /// Whether a pad is currently sounding, as last reported by the render side.
    pub fn is_playing(&self, pad: usize) -> bool {
        self.activity.is_playing(pad)
    }

    /// Sets the master gain applied after the pad mix, clamped to [0, 2].
    pub fn set_kit_gain(&self, gain: f32) -> Result<(), EngineError> {
        let gain = if gain.is_finite() { gain } else { 1.0 }.clamp(0.0, MAX_KIT_GAIN);
        *self.kit_gain.lock() = gain;
        self.send(Command::SetMasterGain(gain))
    }

    pub fn kit_gain(&self) -> f32 {
        *self.kit_gain.lock()
    }

    pub fn pads(&self) -> Vec<PadSlot> {
        self.pads.read().clone()
    }

    pub fn pad(&self, pad: usize) -> Option<PadSlot> {
        self.pads.read().get(pad).cloned()
    }

    /// Receives a snapshot of the pads after every change.
    pub fn subscribe(&self) -> watch::Receiver<Vec<PadSlot>> {
        self.pads_tx.subscribe()
    }

    /// Restores pads from saved records, falling back to the bundled sample `<pad + 1>` for any
    /// pad whose saved file is missing or unloadable. Returns the number of pads with a sample.
    pub fn restore(&self, records: &[PadStateRecord], bundled: Option<&Path>) -> usize {
        let mut loaded = 0;
        for pad in 0..PAD_COUNT {
            let record = records.iter().find(|record| record.id == pad);
            let restored = record
                .and_then(|record| {
                    let path = record.stored_path.as_ref()?;
                    if !path.exists() {
                        debug!(pad, path = ?path, "Stored sample is gone");
                        return None;
                    }
                    self.load_sample_named(pad, path, &record.name).ok()
                })
                .is_some();

            let restored = restored
                || bundled
                    .and_then(|dir| bundled_sample(dir, pad))
                    .is_some_and(|path| self.load_sample(pad, &path).is_ok());
            if restored {
                loaded += 1;
            }
        }
        info!(loaded, "Restored pads");
        loaded
    }

    /// Applies a kit: parameters for every pad it lists, its samples, and its gain.
    pub fn apply_kit(&self, kit: &Kit) -> Result<(), EngineError> {
        for slot in kit.pads.iter().filter(|slot| slot.id < PAD_COUNT) {
            let config = slot.config();
            self.update_pad_config(
                slot.id,
                config.playback_mode(),
                config.choke_group(),
                config.gain(),
                config.pitch_semitones(),
            )?;
            {
                let mut pads = self.pads.write();
                pads[slot.id].accent_hex = slot.accent_hex.clone();
                pads[slot.id].is_favourite = slot.is_favourite;
            }
            match &slot.sample_ref {
                Some(path) => {
                    if let Err(e) = self.load_sample_named(slot.id, path, &slot.name) {
                        warn!(kit = kit.name, pad = slot.id, err = %e, "Kit sample unavailable");
                    }
                }
                None => self.clear_pad(slot.id)?,
            }
        }
        self.set_kit_gain(kit.kit_gain)?;
        self.publish();
        Ok(())
    }

    fn send(&self, command: Command) -> Result<(), EngineError> {
        let stream = self.stream.lock();
        let Some(running) = stream.as_ref() else {
            return Ok(());
        };
        // Buffers the render side let go of are freed here.
        while running.retired.try_recv().is_ok() {}

        match running.commands.try_send(command) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!("Render command queue is full, dropping command");
                Err(EngineError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("Render side is gone, dropping command");
                Ok(())
            }
        }
    }

    fn publish(&self) {
        self.pads_tx.send_replace(self.pads());
    }
}

impl Drop for PadEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn check_pad(pad: usize) -> Result<(), EngineError> {
    if pad < PAD_COUNT {
        Ok(())
    } else {
        Err(EngineError::InvalidPad(pad))
    }
}

/// The first of `<dir>/<pad + 1>.{wav,aif,aiff}` that exists.
fn bundled_sample(dir: &Path, pad: usize) -> Option<PathBuf> {
    BUNDLED_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", pad + 1, ext)))
        .find(|path| path.exists())
}
