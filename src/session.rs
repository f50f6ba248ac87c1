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

//! One running instrument: the library, the kits, the pad engine and the saved pad state, all
//! rooted at the configured storage directory.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::audio::{self, Device, DeviceError};
use crate::config;
use crate::kit::{Kit, KitError, KitStore, PadStateStore};
use crate::library::Library;
use crate::paths::StoragePaths;
use crate::samples::{EngineError, PadEngine};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("unable to prepare storage: {0}")]
    Storage(#[from] io::Error),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Kit(#[from] KitError),

    #[error("no sample with id {0}")]
    UnknownSample(String),

    #[error("no kit with id {0}")]
    UnknownKit(String),
}

pub struct Session {
    library: Library,
    kits: KitStore,
    pad_state: PadStateStore,
    engine: PadEngine,
    bundled: Option<PathBuf>,
}

impl Session {
    /// Opens a session on the configured output device. The engine is not started.
    pub fn open(config: &config::Beatpad) -> Result<Session, SessionError> {
        let device = audio::get_device(&config.audio())?;
        Session::with_device(config, device)
    }

    /// Opens a session on the given device.
    pub fn with_device(
        config: &config::Beatpad,
        device: Arc<dyn Device>,
    ) -> Result<Session, SessionError> {
        let paths = StoragePaths::new(config.storage_root());
        paths.ensure_dirs()?;

        let import = config.import();
        let engine = PadEngine::new(device, &config.audio(), import.chunk_frames());
        let session = Session {
            kits: KitStore::new(paths.kits_dir()),
            pad_state: PadStateStore::new(paths.pad_state_path()),
            library: Library::open(paths, &import),
            engine,
            bundled: config.bundled_samples().map(PathBuf::from),
        };
        info!(root = ?session.library.paths().root(), "Opened session");
        Ok(session)
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn engine(&self) -> &PadEngine {
        &self.engine
    }

    pub fn kits(&self) -> &KitStore {
        &self.kits
    }

    /// Loads the pads saved by the last session. Returns how many pads have a sample.
    pub fn restore_pads(&self) -> usize {
        let records = self.pad_state.load();
        self.engine.restore(&records, self.bundled.as_deref())
    }

    /// Loads a library sample onto a pad.
    pub fn assign_sample(&self, pad: usize, sample_id: &str) -> Result<(), SessionError> {
        let sample = self
            .library
            .index()
            .sample(sample_id)
            .ok_or_else(|| SessionError::UnknownSample(sample_id.to_string()))?;
        self.engine
            .load_sample_named(pad, &sample.path, &sample.name)?;
        Ok(())
    }

    pub fn save_pad_state(&self) -> Result<(), SessionError> {
        self.pad_state.save(&self.engine.pads())?;
        Ok(())
    }

    /// Saves the current pads as a new kit.
    pub fn save_kit(&self, name: &str) -> Result<Kit, SessionError> {
        let mut kit = Kit::with_pads(name, self.engine.pads());
        kit.kit_gain = self.engine.kit_gain();
        Ok(self.kits.save(&kit)?)
    }

    /// Applies a saved kit to the pads.
    pub fn load_kit(&self, id: &str) -> Result<Kit, SessionError> {
        let kit = self
            .kits
            .load(id)?
            .ok_or_else(|| SessionError::UnknownKit(id.to_string()))?;
        self.engine.apply_kit(&kit)?;
        info!(kit = kit.name, "Loaded kit");
        Ok(kit)
    }

    /// Stops the engine and remembers the pads for next time.
    pub fn close(&self) {
        self.engine.stop();
        if let Err(e) = self.save_pad_state() {
            warn!(err = %e, "Unable to save pad state");
        }
    }
}

#[cfg(test)]
mod test {
    use std::error::Error;

    use super::*;
    use crate::audio::mock;
    use crate::import::NoProgress;
    use crate::playsync::CancelHandle;
    use crate::samples::PlaybackMode;
    use crate::testutil::{sine, write_wav_f32};

    fn session(root: &std::path::Path) -> Result<(Session, Arc<mock::Device>), SessionError> {
        let device = Arc::new(mock::Device::get("mock-session"));
        let config = config::Beatpad::with_storage_root(root)
            .with_audio(config::Audio::new("mock-session"));
        let session = Session::with_device(&config, device.clone())?;
        Ok((session, device))
    }

    #[test]
    fn assigned_samples_survive_a_restart() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let source = dir.path().join("Rim.wav");
        write_wav_f32(&source, &[sine(700.0, 48000, 4800, 0.5)], 48000)?;

        {
            let (session, _device) = session(&dir.path().join("root"))?;
            let outcome = session.library().import_file(
                &source,
                None,
                &NoProgress,
                &CancelHandle::new(),
            )?;
            session.assign_sample(3, &outcome.asset().id)?;
            assert!(matches!(
                session.assign_sample(4, "missing"),
                Err(SessionError::UnknownSample(_))
            ));
            session.close();
        }

        let (session, _device) = session(&dir.path().join("root"))?;
        assert_eq!(1, session.restore_pads());
        let pad = session.engine().pad(3).expect("pad");
        assert!(pad.has_sample());
        assert_eq!("Rim", pad.name);
        Ok(())
    }

    #[test]
    fn kits_restore_parameters() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let (session, _device) = session(dir.path())?;
        session
            .engine()
            .update_pad_config(2, PlaybackMode::Gate, 3, 0.5, -7)?;
        session.engine().set_kit_gain(1.5)?;
        let kit = session.save_kit("Night")?;

        session
            .engine()
            .update_pad_config(2, PlaybackMode::OneShot, 0, 1.0, 0)?;
        session.engine().set_kit_gain(1.0)?;
        session.load_kit(&kit.id)?;

        let config = session.engine().pad(2).expect("pad").config();
        assert_eq!(PlaybackMode::Gate, config.playback_mode());
        assert_eq!(3, config.choke_group());
        assert_eq!(-7, config.pitch_semitones());
        assert_eq!(1.5, session.engine().kit_gain());
        assert!(matches!(
            session.load_kit("nope"),
            Err(SessionError::UnknownKit(_))
        ));
        Ok(())
    }
}
