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

//! Brings source files into the library, skipping the pipeline for audio it already holds.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, span, warn, Level};

use super::error::LibraryError;
use super::index::SampleIndex;
use super::model::SampleAsset;
use crate::import::{AudioAnalysis, ImportError, ImportPipeline, ProgressSink};
use crate::paths::{content_hash, StoragePaths};
use crate::playsync::CancelHandle;
use crate::util::sample_display_name;
use crate::waveform::WaveformCache;

/// What importing one file produced.
#[derive(Clone, Debug, PartialEq)]
pub enum ImportOutcome {
    /// New audio was normalized into the library.
    Imported(SampleAsset),
    /// The audio was already stored; a new entry now shares it with `original`.
    Duplicate {
        asset: SampleAsset,
        original: String,
    },
}

impl ImportOutcome {
    pub fn asset(&self) -> &SampleAsset {
        match self {
            ImportOutcome::Imported(asset) => asset,
            ImportOutcome::Duplicate { asset, .. } => asset,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, ImportOutcome::Duplicate { .. })
    }
}

pub struct LibraryImporter {
    paths: StoragePaths,
    index: Arc<SampleIndex>,
    waveforms: WaveformCache,
    pipeline: ImportPipeline,
}

impl LibraryImporter {
    pub fn new(
        paths: StoragePaths,
        index: Arc<SampleIndex>,
        waveforms: WaveformCache,
        pipeline: ImportPipeline,
    ) -> LibraryImporter {
        LibraryImporter {
            paths,
            index,
            waveforms,
            pipeline,
        }
    }

    /// Imports a single file.
    pub fn import_file(
        &self,
        source: &Path,
        folder_id: Option<&str>,
        progress: &dyn ProgressSink,
        cancel: &CancelHandle,
    ) -> Result<ImportOutcome, LibraryError> {
        let span = span!(Level::INFO, "library import", files = 1);
        let _enter = span.enter();

        self.check_destination(folder_id)?;
        let hash = content_hash(source).map_err(|e| LibraryError::Read {
            path: source.to_path_buf(),
            source: e,
        })?;
        let mut normalized = HashMap::new();
        if self.index.find_by_content_hash(&hash).is_none() {
            let destination = self.paths.sample_path(&hash);
            let result = self.pipeline.run(source, &destination, progress, cancel);
            normalized.insert(hash.clone(), result);
        }
        self.register(source, &hash, folder_id, &mut normalized)
    }

    /// Imports a batch. Hashing and pipelines run in parallel; each distinct new audio content is
    /// normalized once no matter how many times it appears. Entries are registered in input order
    /// and the returned outcomes line up with `sources`.
    pub fn import_files(
        &self,
        sources: &[PathBuf],
        folder_id: Option<&str>,
        progress: &dyn ProgressSink,
        cancel: &CancelHandle,
    ) -> Vec<Result<ImportOutcome, LibraryError>> {
        let span = span!(Level::INFO, "library import", files = sources.len());
        let _enter = span.enter();

        if let Err(e) = self.check_destination(folder_id) {
            return sources.iter().map(|_| Err(repeat_error(&e))).collect();
        }

        let hashes: Vec<Result<String, LibraryError>> = sources
            .par_iter()
            .map(|source| {
                content_hash(source).map_err(|e| LibraryError::Read {
                    path: source.clone(),
                    source: e,
                })
            })
            .collect();

        let mut seen = HashSet::new();
        let scheduled: Vec<(&str, &Path)> = sources
            .iter()
            .zip(&hashes)
            .filter_map(|(source, hash)| {
                let hash = hash.as_deref().ok()?;
                if !seen.insert(hash) || self.index.find_by_content_hash(hash).is_some() {
                    return None;
                }
                Some((hash, source.as_path()))
            })
            .collect();
        debug!(scheduled = scheduled.len(), "Running import pipelines");

        let mut normalized: HashMap<String, Result<AudioAnalysis, ImportError>> = scheduled
            .par_iter()
            .map(|&(hash, source)| {
                let destination = self.paths.sample_path(hash);
                (
                    hash.to_string(),
                    self.pipeline.run(source, &destination, progress, cancel),
                )
            })
            .collect();

        sources
            .iter()
            .zip(hashes)
            .map(|(source, hash)| self.register(source, &hash?, folder_id, &mut normalized))
            .collect()
    }

    /// Fails when the target folder is unknown or storage cannot be created.
    fn check_destination(&self, folder_id: Option<&str>) -> Result<(), LibraryError> {
        if let Some(folder) = folder_id {
            if self.index.folder(folder).is_none() {
                warn!(folder, "Import into unknown folder");
                return Err(LibraryError::UnknownFolder(folder.to_string()));
            }
        }
        self.paths.ensure_dirs().map_err(|e| {
            warn!(root = ?self.paths.root(), err = %e, "Unable to create storage directories");
            LibraryError::Io(e)
        })
    }

    /// Adds the catalog entry for one source once its audio is stored.
    fn register(
        &self,
        source: &Path,
        hash: &str,
        folder_id: Option<&str>,
        normalized: &mut HashMap<String, Result<AudioAnalysis, ImportError>>,
    ) -> Result<ImportOutcome, LibraryError> {
        let folder_id = folder_id.map(str::to_string);

        if let Some(existing) = self.index.find_by_content_hash(hash) {
            let asset = self.index.add(existing.alias(folder_id));
            self.waveforms.waveform_for(&asset.id, &asset.path);
            info!(id = asset.id, original = existing.id, "Linked duplicate sample");
            return Ok(ImportOutcome::Duplicate {
                asset,
                original: existing.id,
            });
        }

        let analysis = match normalized.remove(hash) {
            Some(Ok(analysis)) => analysis,
            Some(Err(e)) => {
                warn!(path = ?source, err = %e, "Import failed");
                return Err(LibraryError::Import {
                    path: source.to_path_buf(),
                    source: e,
                });
            }
            None => {
                return Err(LibraryError::BatchDuplicateFailed {
                    path: source.to_path_buf(),
                })
            }
        };

        let asset = self.index.add(SampleAsset::imported(
            &sample_display_name(source),
            self.paths.sample_path(hash),
            hash,
            &analysis,
            folder_id,
        ));
        self.waveforms.waveform_for(&asset.id, &asset.path);
        Ok(ImportOutcome::Imported(asset))
    }
}

/// Copies a failure that applies to a whole batch so each source can report it.
fn repeat_error(e: &LibraryError) -> LibraryError {
    match e {
        LibraryError::UnknownFolder(folder) => LibraryError::UnknownFolder(folder.clone()),
        LibraryError::Io(e) => LibraryError::Io(io::Error::new(e.kind(), e.to_string())),
        other => LibraryError::Io(io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod test {
    use std::error::Error;
    use std::fs;

    use parking_lot::Mutex;

    use super::*;
    use crate::config;
    use crate::import::{ImportProgress, ImportStage, NoProgress};
    use crate::testutil::{sine, write_wav_f32, write_wav_i16};
    use crate::waveform::WAVEFORM_POINTS;

    struct Fixture {
        dir: tempfile::TempDir,
        paths: StoragePaths,
        index: Arc<SampleIndex>,
        importer: LibraryImporter,
    }

    impl Fixture {
        fn new() -> Result<Fixture, Box<dyn Error>> {
            let dir = tempfile::tempdir()?;
            let paths = StoragePaths::new(dir.path().join("library"));
            let index = Arc::new(SampleIndex::open(
                paths.index_path(),
                WaveformCache::new(paths.previews_dir()),
            ));
            let importer = LibraryImporter::new(
                paths.clone(),
                index.clone(),
                WaveformCache::new(paths.previews_dir()),
                ImportPipeline::new(&config::Import::default()),
            );
            Ok(Fixture {
                dir,
                paths,
                index,
                importer,
            })
        }

        fn source(&self, name: &str, frequency: f32) -> Result<PathBuf, Box<dyn Error>> {
            let path = self.dir.path().join(name);
            write_wav_i16(&path, &[sine(frequency, 44100, 4410, 0.5)], 44100)?;
            Ok(path)
        }

        fn stored_files(&self) -> usize {
            fs::read_dir(self.paths.samples_dir())
                .map(|entries| entries.count())
                .unwrap_or(0)
        }
    }

    #[test]
    fn imports_new_audio() -> Result<(), Box<dyn Error>> {
        let fixture = Fixture::new()?;
        let source = fixture.source("Kick 01.wav", 60.0)?;
        let hash = content_hash(&source)?;

        let outcome =
            fixture
                .importer
                .import_file(&source, None, &NoProgress, &CancelHandle::new())?;
        let asset = outcome.asset();
        assert!(!outcome.is_duplicate());
        assert_eq!(hash, asset.id);
        assert_eq!("Kick 01", asset.name);
        assert_eq!(fixture.paths.sample_path(&hash), asset.path);
        assert_eq!(48000, asset.sample_rate);
        assert_eq!(1, asset.channels);
        assert!((asset.duration_seconds - 0.1).abs() < 1e-3);
        assert!(asset.path.exists());
        assert_eq!(Some(asset.clone()), fixture.index.sample(&asset.id));

        let preview = WaveformCache::new(fixture.paths.previews_dir())
            .load(&asset.id)
            .expect("waveform cached");
        assert_eq!(WAVEFORM_POINTS, preview.len());
        Ok(())
    }

    #[test]
    fn identical_bytes_are_stored_once() -> Result<(), Box<dyn Error>> {
        let fixture = Fixture::new()?;
        let source = fixture.source("Snare.wav", 200.0)?;
        let copy = fixture.dir.path().join("Snare again.wav");
        fs::copy(&source, &copy)?;

        let cancel = CancelHandle::new();
        let first = fixture
            .importer
            .import_file(&source, None, &NoProgress, &cancel)?;
        let second = fixture
            .importer
            .import_file(&copy, None, &NoProgress, &cancel)?;

        assert_eq!(1, fixture.stored_files());
        assert_eq!(2, fixture.index.len());
        match &second {
            ImportOutcome::Duplicate { asset, original } => {
                assert_eq!(&first.asset().id, original);
                assert_eq!("Snare (copy)", asset.name);
                assert_eq!(first.asset().path, asset.path);
                assert_ne!(first.asset().id, asset.id);
            }
            other => panic!("expected a duplicate, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn batch_collapses_duplicates_and_keeps_order() -> Result<(), Box<dyn Error>> {
        let fixture = Fixture::new()?;
        let folder = fixture.index.add_folder("Batch");
        let a = fixture.source("A.wav", 100.0)?;
        let b = fixture.source("B.wav", 300.0)?;
        let a_copy = fixture.dir.path().join("A copy.wav");
        fs::copy(&a, &a_copy)?;
        let missing = fixture.dir.path().join("missing.wav");

        let outcomes = fixture.importer.import_files(
            &[a.clone(), a_copy, b, missing],
            Some(&folder.id),
            &NoProgress,
            &CancelHandle::new(),
        );
        assert_eq!(4, outcomes.len());
        let first = outcomes[0].as_ref().expect("first import");
        assert!(!first.is_duplicate());
        assert_eq!("A", first.asset().name);
        assert!(outcomes[1].as_ref().expect("alias").is_duplicate());
        assert!(!outcomes[2].as_ref().expect("b").is_duplicate());
        assert!(matches!(outcomes[3], Err(LibraryError::Read { .. })));

        assert_eq!(2, fixture.stored_files());
        assert_eq!(3, fixture.index.samples_in(&folder.id).len());
        assert_eq!(
            3,
            fixture.index.folder(&folder.id).expect("folder").sample_ids.len()
        );
        Ok(())
    }

    #[test]
    fn failed_pipeline_fails_batch_duplicates() -> Result<(), Box<dyn Error>> {
        let fixture = Fixture::new()?;
        let bad = fixture.dir.path().join("bad.wav");
        fs::write(&bad, b"definitely not audio")?;
        let bad_copy = fixture.dir.path().join("bad copy.wav");
        fs::copy(&bad, &bad_copy)?;

        let outcomes = fixture.importer.import_files(
            &[bad, bad_copy],
            None,
            &NoProgress,
            &CancelHandle::new(),
        );
        assert!(matches!(
            outcomes[0],
            Err(LibraryError::Import {
                source: ImportError::DecodeFailed(_),
                ..
            })
        ));
        assert!(matches!(
            outcomes[1],
            Err(LibraryError::BatchDuplicateFailed { .. })
        ));
        assert!(fixture.index.is_empty());
        assert_eq!(0, fixture.stored_files());
        Ok(())
    }

    #[test]
    fn unknown_folder_is_rejected() -> Result<(), Box<dyn Error>> {
        let fixture = Fixture::new()?;
        let source = fixture.source("Hat.wav", 900.0)?;
        let result =
            fixture
                .importer
                .import_file(&source, Some("nowhere"), &NoProgress, &CancelHandle::new());
        assert!(matches!(result, Err(LibraryError::UnknownFolder(_))));
        assert!(fixture.index.is_empty());
        Ok(())
    }

    #[test]
    fn missing_file_reports_read_error() -> Result<(), Box<dyn Error>> {
        let fixture = Fixture::new()?;
        let missing = fixture.dir.path().join("Gone.wav");
        let single = fixture
            .importer
            .import_file(&missing, None, &NoProgress, &CancelHandle::new());
        assert!(matches!(single, Err(LibraryError::Read { ref path, .. }) if *path == missing));

        let batch = fixture.importer.import_files(
            &[missing.clone()],
            None,
            &NoProgress,
            &CancelHandle::new(),
        );
        assert!(matches!(batch[0], Err(LibraryError::Read { .. })));
        assert!(fixture.index.is_empty());
        Ok(())
    }

    #[test]
    fn unknown_folder_fails_every_batch_entry() -> Result<(), Box<dyn Error>> {
        let fixture = Fixture::new()?;
        let sources = [
            fixture.source("Ride.wav", 700.0)?,
            fixture.source("Crash.wav", 800.0)?,
        ];
        let outcomes = fixture.importer.import_files(
            &sources,
            Some("nowhere"),
            &NoProgress,
            &CancelHandle::new(),
        );
        assert_eq!(2, outcomes.len());
        assert!(outcomes
            .iter()
            .all(|o| matches!(o, Err(LibraryError::UnknownFolder(f)) if f == "nowhere")));
        Ok(())
    }

    #[test]
    fn cancelled_import_registers_nothing() -> Result<(), Box<dyn Error>> {
        let fixture = Fixture::new()?;
        let source = fixture.source("Tom.wav", 120.0)?;
        let cancel = CancelHandle::new();
        cancel.cancel();
        let result = fixture
            .importer
            .import_file(&source, None, &NoProgress, &cancel);
        assert!(matches!(
            result,
            Err(LibraryError::Import {
                source: ImportError::Cancelled,
                ..
            })
        ));
        assert!(fixture.index.is_empty());
        assert_eq!(0, fixture.stored_files());
        Ok(())
    }

    #[test]
    fn progress_is_reported_per_file() -> Result<(), Box<dyn Error>> {
        let fixture = Fixture::new()?;
        let a = fixture.dir.path().join("Stereo.wav");
        write_wav_f32(
            &a,
            &[sine(440.0, 48000, 4800, 0.3), sine(220.0, 48000, 4800, 0.3)],
            48000,
        )?;
        let b = fixture.source("Mono.wav", 500.0)?;

        let reports: Mutex<Vec<ImportProgress>> = Mutex::new(Vec::new());
        let sink = |progress: ImportProgress| reports.lock().push(progress);
        let outcomes =
            fixture
                .importer
                .import_files(&[a, b], None, &sink, &CancelHandle::new());
        assert!(outcomes.iter().all(Result::is_ok));

        let reports = reports.into_inner();
        for file in ["Stereo.wav", "Mono.wav"] {
            let fractions: Vec<f64> = reports
                .iter()
                .filter(|p| p.file_name == file)
                .map(|p| p.fraction)
                .collect();
            assert!(fractions.windows(2).all(|w| w[0] <= w[1]), "{}", file);
            assert_eq!(Some(&1.0), fractions.last());
        }
        assert!(reports
            .iter()
            .any(|p| p.file_name == "Stereo.wav" && p.stage == ImportStage::Ready));
        Ok(())
    }
}
