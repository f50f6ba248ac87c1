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
use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::import::AudioAnalysis;

/// A sample in the library. Several assets may share one file when the same audio was imported
/// more than once.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SampleAsset {
    pub id: String,
    pub name: String,
    /// The canonical normalized file.
    pub path: PathBuf,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub is_starred: bool,
    pub created_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub file_size_bytes: u64,
    pub content_hash: String,
}

impl SampleAsset {
    /// A freshly imported asset, identified by its content hash.
    pub fn imported(
        name: &str,
        path: PathBuf,
        content_hash: &str,
        analysis: &AudioAnalysis,
        folder_id: Option<String>,
    ) -> SampleAsset {
        SampleAsset {
            id: content_hash.to_string(),
            name: name.to_string(),
            path,
            folder_id,
            is_starred: false,
            created_at: Utc::now(),
            duration_seconds: analysis.duration_seconds,
            sample_rate: analysis.sample_rate,
            channels: analysis.channels,
            file_size_bytes: analysis.file_size_bytes,
            content_hash: content_hash.to_string(),
        }
    }

    /// A second entry for the same audio. It shares the file and measurements but has its own
    /// id, name and placement.
    pub fn alias(&self, folder_id: Option<String>) -> SampleAsset {
        SampleAsset {
            id: uuid::Uuid::new_v4().to_string(),
            name: format!("{} (copy)", self.name),
            folder_id,
            is_starred: false,
            created_at: Utc::now(),
            ..self.clone()
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Members in the order they were added. Never holds duplicates.
    #[serde(default)]
    pub sample_ids: Vec<String>,
}

impl Folder {
    pub fn new(name: &str) -> Folder {
        Folder {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
            sample_ids: Vec::new(),
        }
    }
}

/// The persisted form of the index.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct IndexDocument {
    #[serde(default)]
    pub samples: BTreeMap<String, SampleAsset>,
    #[serde(default)]
    pub folders: BTreeMap<String, Folder>,
}

/// A filtered, ordered view over the library.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LibraryView {
    /// Every sample, newest first.
    All,
    Starred,
    /// The newest [`super::RECENT_LIMIT`] samples.
    Recent,
    /// Samples outside any folder.
    Unassigned,
    Folder(String),
}
