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

//! The sample index: every asset and folder, persisted as one JSON document rewritten on every
//! change.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::model::{Folder, IndexDocument, LibraryView, SampleAsset};
use crate::paths::write_atomic;
use crate::waveform::WaveformCache;

/// How many samples the recent view holds.
pub const RECENT_LIMIT: usize = 50;

pub struct SampleIndex {
    path: PathBuf,
    waveforms: WaveformCache,
    document: RwLock<IndexDocument>,
    revision: watch::Sender<u64>,
}

impl SampleIndex {
    /// Loads the index document. A missing or unreadable document gives an empty index.
    pub fn open(path: impl Into<PathBuf>, waveforms: WaveformCache) -> SampleIndex {
        let path = path.into();
        let document = load_document(&path);
        info!(
            path = ?path,
            samples = document.samples.len(),
            folders = document.folders.len(),
            "Opened sample index"
        );
        let (revision, _) = watch::channel(0);
        SampleIndex {
            path,
            waveforms,
            document: RwLock::new(document),
            revision,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Receives a new revision number after every change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Applies a change and writes the document through before anyone else can observe it.
    fn mutate<R>(&self, change: impl FnOnce(&mut IndexDocument) -> R) -> R {
        let mut document = self.document.write();
        let result = change(&mut document);
        match serde_json::to_vec_pretty(&*document) {
            Ok(bytes) => {
                if let Err(e) = write_atomic(&self.path, &bytes) {
                    warn!(path = ?self.path, err = %e, "Unable to persist sample index");
                }
            }
            Err(e) => warn!(err = %e, "Unable to serialize sample index"),
        }
        drop(document);
        self.revision.send_modify(|revision| *revision += 1);
        result
    }

    /// Adds or replaces an asset. Folder membership follows `folder_id`; an unknown folder leaves
    /// the asset unassigned. Returns the stored asset.
    pub fn add(&self, asset: SampleAsset) -> SampleAsset {
        self.mutate(|document| place(document, asset))
    }

    /// Replaces an existing asset. Returns false if the id is unknown.
    pub fn update(&self, asset: SampleAsset) -> bool {
        if !self.document.read().samples.contains_key(&asset.id) {
            return false;
        }
        self.mutate(|document| {
            place(document, asset);
        });
        true
    }

    /// Removes an asset, its cached waveform, its folder memberships and, once no other asset
    /// shares it, its audio file.
    pub fn remove(&self, id: &str) -> Option<SampleAsset> {
        if !self.document.read().samples.contains_key(id) {
            return None;
        }
        let removed = self.mutate(|document| {
            let removed = document.samples.remove(id)?;
            for folder in document.folders.values_mut() {
                folder.sample_ids.retain(|member| member != id);
            }
            let shared = document
                .samples
                .values()
                .any(|other| other.path == removed.path);
            Some((removed, shared))
        });

        let (removed, shared) = removed?;
        if !shared {
            match fs::remove_file(&removed.path) {
                Ok(()) => debug!(path = ?removed.path, "Deleted sample audio"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = ?removed.path, err = %e, "Unable to delete sample audio"),
            }
        }
        if let Err(e) = self.waveforms.remove(id) {
            warn!(id, err = %e, "Unable to delete cached waveform");
        }
        info!(id, name = removed.name, "Removed sample");
        Some(removed)
    }

    /// Creates a folder with the given name.
    pub fn add_folder(&self, name: &str) -> Folder {
        let folder = Folder::new(name);
        self.mutate(|document| {
            document.folders.insert(folder.id.clone(), folder.clone());
        });
        folder
    }

    /// Renames an existing folder. Membership is managed through [`SampleIndex::move_sample`], so
    /// `sample_ids` on the argument is ignored. Returns false if the id is unknown.
    pub fn update_folder(&self, folder: &Folder) -> bool {
        if !self.document.read().folders.contains_key(&folder.id) {
            return false;
        }
        self.mutate(|document| {
            if let Some(existing) = document.folders.get_mut(&folder.id) {
                existing.name = folder.name.clone();
            }
        });
        true
    }

    /// Removes a folder. Its members become unassigned; their audio is kept.
    pub fn remove_folder(&self, id: &str) -> Option<Folder> {
        if !self.document.read().folders.contains_key(id) {
            return None;
        }
        self.mutate(|document| {
            let folder = document.folders.remove(id)?;
            for sample in document.samples.values_mut() {
                if sample.folder_id.as_deref() == Some(id) {
                    sample.folder_id = None;
                }
            }
            Some(folder)
        })
    }

    /// Flips the starred flag. Returns the new value, or None for an unknown id.
    pub fn toggle_star(&self, id: &str) -> Option<bool> {
        if !self.document.read().samples.contains_key(id) {
            return None;
        }
        self.mutate(|document| {
            let sample = document.samples.get_mut(id)?;
            sample.is_starred = !sample.is_starred;
            Some(sample.is_starred)
        })
    }

    /// Moves a sample into a folder, or out of all folders with `None`. Returns false if the
    /// sample or folder is unknown.
    pub fn move_sample(&self, id: &str, folder_id: Option<&str>) -> bool {
        {
            let document = self.document.read();
            let Some(sample) = document.samples.get(id) else {
                return false;
            };
            if folder_id.is_some_and(|folder| !document.folders.contains_key(folder)) {
                return false;
            }
            if sample.folder_id.as_deref() == folder_id {
                return true;
            }
        }
        self.mutate(|document| {
            if let Some(mut sample) = document.samples.get(id).cloned() {
                sample.folder_id = folder_id.map(str::to_string);
                place(document, sample);
            }
        });
        true
    }

    /// The asset holding audio with this content hash. The first import wins over its aliases.
    pub fn find_by_content_hash(&self, hash: &str) -> Option<SampleAsset> {
        let document = self.document.read();
        if let Some(original) = document.samples.get(hash) {
            if original.content_hash == hash {
                return Some(original.clone());
            }
        }
        document
            .samples
            .values()
            .filter(|sample| sample.content_hash == hash)
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
            .cloned()
    }

    pub fn sample(&self, id: &str) -> Option<SampleAsset> {
        self.document.read().samples.get(id).cloned()
    }

    pub fn folder(&self, id: &str) -> Option<Folder> {
        self.document.read().folders.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.document.read().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A copy of the whole document.
    pub fn snapshot(&self) -> IndexDocument {
        self.document.read().clone()
    }

    /// Samples in the view, newest first.
    pub fn view(&self, view: &LibraryView) -> Vec<SampleAsset> {
        let document = self.document.read();
        let mut samples: Vec<SampleAsset> = document
            .samples
            .values()
            .filter(|sample| match view {
                LibraryView::All | LibraryView::Recent => true,
                LibraryView::Starred => sample.is_starred,
                LibraryView::Unassigned => sample.folder_id.is_none(),
                LibraryView::Folder(folder) => sample.folder_id.as_deref() == Some(folder.as_str()),
            })
            .cloned()
            .collect();
        samples.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        if *view == LibraryView::Recent {
            samples.truncate(RECENT_LIMIT);
        }
        samples
    }

    pub fn all_samples(&self) -> Vec<SampleAsset> {
        self.view(&LibraryView::All)
    }

    pub fn starred_samples(&self) -> Vec<SampleAsset> {
        self.view(&LibraryView::Starred)
    }

    pub fn recent_samples(&self) -> Vec<SampleAsset> {
        self.view(&LibraryView::Recent)
    }

    pub fn unassigned_samples(&self) -> Vec<SampleAsset> {
        self.view(&LibraryView::Unassigned)
    }

    pub fn samples_in(&self, folder_id: &str) -> Vec<SampleAsset> {
        self.view(&LibraryView::Folder(folder_id.to_string()))
    }

    /// Every folder, by name.
    pub fn all_folders(&self) -> Vec<Folder> {
        let mut folders: Vec<Folder> = self.document.read().folders.values().cloned().collect();
        folders.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        folders
    }

    /// Samples in the view whose name contains `text`, ignoring case. Empty text matches all.
    pub fn search(&self, view: &LibraryView, text: &str) -> Vec<SampleAsset> {
        let needle = text.trim().to_lowercase();
        let mut samples = self.view(view);
        if !needle.is_empty() {
            samples.retain(|sample| sample.name.to_lowercase().contains(&needle));
        }
        samples
    }
}

/// Inserts or replaces an asset, keeping its folder and the folders' member lists in agreement.
fn place(document: &mut IndexDocument, mut asset: SampleAsset) -> SampleAsset {
    if let Some(folder_id) = asset.folder_id.as_deref() {
        if !document.folders.contains_key(folder_id) {
            warn!(
                id = asset.id,
                folder = folder_id,
                "Sample placed in unknown folder, leaving it unassigned"
            );
            asset.folder_id = None;
        }
    }

    for folder in document.folders.values_mut() {
        if asset.folder_id.as_deref() != Some(folder.id.as_str()) {
            folder.sample_ids.retain(|member| *member != asset.id);
        } else if !folder.sample_ids.contains(&asset.id) {
            folder.sample_ids.push(asset.id.clone());
        }
    }
    document.samples.insert(asset.id.clone(), asset.clone());
    asset
}

fn load_document(path: &Path) -> IndexDocument {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return IndexDocument::default(),
        Err(e) => {
            warn!(path = ?path, err = %e, "Unable to read sample index, starting empty");
            return IndexDocument::default();
        }
    };
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        warn!(path = ?path, err = %e, "Sample index is corrupt, starting empty");
        IndexDocument::default()
    })
}
