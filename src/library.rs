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
use std::sync::Arc;

use tracing::info;

use crate::config;
use crate::import::{ImportPipeline, ProgressSink};
use crate::paths::StoragePaths;
use crate::playsync::CancelHandle;
use crate::waveform::WaveformCache;

mod error;
mod importer;
mod index;
mod model;

pub use error::LibraryError;
pub use importer::{ImportOutcome, LibraryImporter};
pub use index::{SampleIndex, RECENT_LIMIT};
pub use model::{Folder, IndexDocument, LibraryView, SampleAsset};

/// The sample library rooted at one storage directory.
pub struct Library {
    paths: StoragePaths,
    index: Arc<SampleIndex>,
    waveforms: WaveformCache,
    importer: LibraryImporter,
}

impl Library {
    /// Opens the library, loading its index.
    pub fn open(paths: StoragePaths, import: &config::Import) -> Library {
        let waveforms = WaveformCache::new(paths.previews_dir());
        let index = Arc::new(SampleIndex::open(paths.index_path(), waveforms.clone()));
        let importer = LibraryImporter::new(
            paths.clone(),
            index.clone(),
            waveforms.clone(),
            ImportPipeline::new(import),
        );
        info!(root = ?paths.root(), samples = index.len(), "Opened library");
        Library {
            paths,
            index,
            waveforms,
            importer,
        }
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    pub fn index(&self) -> &Arc<SampleIndex> {
        &self.index
    }

    pub fn import_file(
        &self,
        source: &Path,
        folder_id: Option<&str>,
        progress: &dyn ProgressSink,
        cancel: &CancelHandle,
    ) -> Result<ImportOutcome, LibraryError> {
        self.importer
            .import_file(source, folder_id, progress, cancel)
    }

    pub fn import_files(
        &self,
        sources: &[PathBuf],
        folder_id: Option<&str>,
        progress: &dyn ProgressSink,
        cancel: &CancelHandle,
    ) -> Vec<Result<ImportOutcome, LibraryError>> {
        self.importer
            .import_files(sources, folder_id, progress, cancel)
    }

    /// The preview for a sample, generated on first request. None if the id is unknown.
    pub fn waveform(&self, id: &str) -> Option<Vec<f32>> {
        let sample = self.index.sample(id)?;
        Some(self.waveforms.waveform_for(&sample.id, &sample.path))
    }
}

#[cfg(test)]
mod test {
    use std::error::Error;
    use std::fs;

    use super::*;
    use crate::import::NoProgress;
    use crate::testutil::{sine, write_wav_f32};
    use crate::waveform::WAVEFORM_POINTS;

    #[test]
    fn waveform_regenerates_when_cache_is_lost() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let library = Library::open(
            StoragePaths::new(dir.path().join("root")),
            &config::Import::default(),
        );
        let source = dir.path().join("Clap.wav");
        write_wav_f32(&source, &[sine(1000.0, 48000, 9600, 0.25)], 48000)?;
        let outcome = library.import_file(&source, None, &NoProgress, &CancelHandle::new())?;
        let id = outcome.asset().id.clone();

        let first = library.waveform(&id).expect("known sample");
        assert_eq!(WAVEFORM_POINTS, first.len());
        fs::remove_dir_all(library.paths().previews_dir())?;
        assert_eq!(Some(first), library.waveform(&id));
        assert!(library.waveform("unknown").is_none());
        Ok(())
    }

    #[test]
    fn reopening_keeps_the_catalog() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let paths = StoragePaths::new(dir.path().join("root"));
        let folder = {
            let library = Library::open(paths.clone(), &config::Import::default());
            library.index().add_folder("Percussion")
        };
        let library = Library::open(paths, &config::Import::default());
        assert_eq!(Some(folder), library.index().folder(&library.index().all_folders()[0].id));
        Ok(())
    }
}
