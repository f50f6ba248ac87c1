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
use std::path::{Path, PathBuf};

use config::{Config, File};
use serde::Deserialize;

mod audio;
mod error;
mod import;

pub use self::audio::Audio;
pub use self::error::ConfigError;
pub use self::import::Import;

const DEFAULT_STORAGE_ROOT: &str = "beatpad-data";

/// The top level configuration for the instrument.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Beatpad {
    /// Where samples, kits, previews and the index live.
    storage_root: Option<PathBuf>,

    /// Output device settings.
    audio: Option<Audio>,

    /// Sample import settings.
    import: Option<Import>,

    /// Directory holding the fallback samples 1..8 used for pads with nothing stored.
    bundled_samples: Option<PathBuf>,
}

impl Beatpad {
    /// Parses the configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Beatpad, ConfigError> {
        let beatpad = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Beatpad>()?;
        beatpad.import().validate()?;
        Ok(beatpad)
    }

    /// Creates a configuration rooted at the given storage directory, everything else defaulted.
    pub fn with_storage_root(root: impl Into<PathBuf>) -> Beatpad {
        Beatpad {
            storage_root: Some(root.into()),
            ..Default::default()
        }
    }

    /// Replaces the audio configuration.
    pub fn with_audio(mut self, audio: Audio) -> Beatpad {
        self.audio = Some(audio);
        self
    }

    pub fn storage_root(&self) -> PathBuf {
        self.storage_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_ROOT))
    }

    pub fn audio(&self) -> Audio {
        self.audio.clone().unwrap_or_default()
    }

    pub fn import(&self) -> Import {
        self.import.clone().unwrap_or_default()
    }

    pub fn bundled_samples(&self) -> Option<&Path> {
        self.bundled_samples.as_deref()
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;

    #[test]
    fn defaults_are_usable() {
        let beatpad = Beatpad::default();
        assert_eq!(PathBuf::from(DEFAULT_STORAGE_ROOT), beatpad.storage_root());
        assert_eq!("default", beatpad.audio().device());
        assert_eq!(48000, beatpad.audio().sample_rate());
        assert_eq!(128, beatpad.audio().buffer_frames());
        assert_eq!(256, beatpad.audio().command_queue_size());
        assert_eq!(1.0, beatpad.audio().kit_gain());
        assert!(beatpad.bundled_samples().is_none());
    }

    #[test]
    fn deserialize_yaml() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("beatpad.yaml");
        fs::write(
            &path,
            r#"
storage_root: /var/lib/beatpad
bundled_samples: /usr/share/beatpad/samples
audio:
  device: mock-device
  buffer_frames: 64
  kit_gain: 5.0
import:
  target_peak_dbfs: -3.0
"#,
        )?;

        let beatpad = Beatpad::deserialize(&path)?;
        assert_eq!(PathBuf::from("/var/lib/beatpad"), beatpad.storage_root());
        assert_eq!(
            Some(Path::new("/usr/share/beatpad/samples")),
            beatpad.bundled_samples()
        );
        let audio = beatpad.audio();
        assert_eq!("mock-device", audio.device());
        assert_eq!(64, audio.buffer_frames());
        assert_eq!(2.0, audio.kit_gain());
        assert_eq!(-3.0, beatpad.import().target_peak_dbfs());
        assert_eq!(8192, beatpad.import().chunk_frames());
        Ok(())
    }

    #[test]
    fn rejects_positive_target_peak() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("beatpad.yaml");
        fs::write(&path, "import:\n  target_peak_dbfs: 1.5\n")?;
        assert!(matches!(
            Beatpad::deserialize(&path),
            Err(ConfigError::Invalid(_))
        ));
        Ok(())
    }

    #[test]
    fn missing_file_is_a_load_error() {
        assert!(matches!(
            Beatpad::deserialize(Path::new("/nonexistent/beatpad.yaml")),
            Err(ConfigError::Load(_))
        ));
    }
}
