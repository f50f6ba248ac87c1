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

//! Saved kits and the last-session pad state.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::paths::{clean_filename, write_atomic};
use crate::samples::{default_pads, PadSlot};

#[derive(Debug, thiserror::Error)]
pub enum KitError {
    #[error("kit storage error: {0}")]
    Io(#[from] io::Error),

    #[error("kit document error: {0}")]
    Json(#[from] serde_json::Error),
}

fn default_kit_gain() -> f32 {
    1.0
}

/// A named set of pad assignments and parameters.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Kit {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub pads: Vec<PadSlot>,
    #[serde(default = "default_kit_gain")]
    pub kit_gain: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempo: Option<f32>,
}

impl Kit {
    /// A kit of eight empty pads.
    pub fn new(name: &str) -> Kit {
        Kit::with_pads(name, default_pads())
    }

    pub fn with_pads(name: &str, pads: Vec<PadSlot>) -> Kit {
        let now = Utc::now();
        Kit {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
            pads,
            kit_gain: 1.0,
            tempo: None,
        }
    }
}

/// Kits stored one JSON document per kit.
pub struct KitStore {
    dir: PathBuf,
}

impl KitStore {
    pub fn new(dir: impl Into<PathBuf>) -> KitStore {
        KitStore { dir: dir.into() }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", clean_filename(id)))
    }

    /// Writes the kit, stamping it as updated now. Returns the stored copy.
    pub fn save(&self, kit: &Kit) -> Result<Kit, KitError> {
        let mut kit = kit.clone();
        kit.updated_at = Utc::now();
        write_atomic(&self.path_for(&kit.id), &serde_json::to_vec_pretty(&kit)?)?;
        info!(kit = kit.name, id = kit.id, "Saved kit");
        Ok(kit)
    }

    /// Creates, stores and returns a new empty kit.
    pub fn create_new(&self, name: &str) -> Result<Kit, KitError> {
        self.save(&Kit::new(name))
    }

    pub fn load(&self, id: &str) -> Result<Option<Kit>, KitError> {
        match fs::read(self.path_for(id)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes a kit. Deleting an unknown kit does nothing.
    pub fn delete(&self, id: &str) -> Result<(), KitError> {
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Every readable kit, most recently updated first. Unreadable documents are skipped.
    pub fn list(&self) -> Result<Vec<Kit>, KitError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut kits = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match fs::read(&path)
                .map_err(KitError::from)
                .and_then(|bytes| Ok(serde_json::from_slice::<Kit>(&bytes)?))
            {
                Ok(kit) => kits.push(kit),
                Err(e) => warn!(path = ?path, err = %e, "Skipping unreadable kit"),
            }
        }
        kits.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(kits)
    }
}

/// What is remembered about a pad between sessions.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PadStateRecord {
    pub id: usize,
    pub name: String,
    pub accent_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_path: Option<PathBuf>,
}

impl From<&PadSlot> for PadStateRecord {
    fn from(slot: &PadSlot) -> Self {
        PadStateRecord {
            id: slot.id,
            name: slot.name.clone(),
            accent_color: slot.accent_hex.clone(),
            stored_path: slot.sample_ref.clone(),
        }
    }
}

/// The pad state document written on exit and read on launch.
pub struct PadStateStore {
    path: PathBuf,
}

impl PadStateStore {
    pub fn new(path: impl Into<PathBuf>) -> PadStateStore {
        PadStateStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, pads: &[PadSlot]) -> Result<(), KitError> {
        let records: Vec<PadStateRecord> = pads.iter().map(PadStateRecord::from).collect();
        write_atomic(&self.path, &serde_json::to_vec_pretty(&records)?)?;
        debug!(path = ?self.path, pads = records.len(), "Saved pad state");
        Ok(())
    }

    /// The saved records. A missing or unreadable document yields none.
    pub fn load(&self) -> Vec<PadStateRecord> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = ?self.path, err = %e, "Unable to read pad state");
                return Vec::new();
            }
        };
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            warn!(path = ?self.path, err = %e, "Ignoring corrupt pad state");
            Vec::new()
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::samples::PlaybackMode;

    #[test]
    fn kits_round_trip_through_the_store() -> Result<(), KitError> {
        let dir = tempfile::tempdir()?;
        let store = KitStore::new(dir.path().join("Kits"));
        assert!(store.list()?.is_empty());

        let mut kit = Kit::new("Boom Bap");
        kit.pads[2].playback_mode = PlaybackMode::Gate;
        kit.pads[2].sample_ref = Some(PathBuf::from("/samples/hat.wav"));
        kit.tempo = Some(92.0);
        let saved = store.save(&kit)?;
        assert!(saved.updated_at >= kit.updated_at);

        let loaded = store.load(&kit.id)?.expect("kit stored");
        assert_eq!(saved, loaded);
        assert_eq!(8, loaded.pads.len());

        let second = store.create_new("Second")?;
        let listed = store.list()?;
        assert_eq!(2, listed.len());
        assert_eq!(second.id, listed[0].id);

        store.delete(&kit.id)?;
        store.delete(&kit.id)?;
        assert!(store.load(&kit.id)?.is_none());
        assert_eq!(1, store.list()?.len());
        Ok(())
    }

    #[test]
    fn kit_defaults_fill_missing_fields() -> Result<(), serde_json::Error> {
        let kit: Kit = serde_json::from_str(
            r#"{"id":"k","name":"Old","createdAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-02T00:00:00Z","pads":[]}"#,
        )?;
        assert_eq!(1.0, kit.kit_gain);
        assert!(kit.tempo.is_none());
        Ok(())
    }

    #[test]
    fn pad_state_round_trip_and_corruption() -> Result<(), KitError> {
        let dir = tempfile::tempdir()?;
        let store = PadStateStore::new(dir.path().join("PadState.json"));
        assert!(store.load().is_empty());

        let mut pads = default_pads();
        pads[0].name = "Kick".to_string();
        pads[0].sample_ref = Some(PathBuf::from("/samples/kick.wav"));
        store.save(&pads)?;

        let records = store.load();
        assert_eq!(8, records.len());
        assert_eq!("Kick", records[0].name);
        assert_eq!(Some(PathBuf::from("/samples/kick.wav")), records[0].stored_path);
        assert!(records[1].stored_path.is_none());

        fs::write(store.path(), b"{broken")?;
        assert!(store.load().is_empty());
        Ok(())
    }
}
