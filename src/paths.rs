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

//! On-disk layout of the instrument's storage root.

use std::{
    fs,
    io::{self, BufReader, Read, Write},
    path::{Path, PathBuf},
};

use sha2::{Digest, Sha256};

/// Number of hex characters of the SHA-256 digest kept as a sample's content hash.
pub const CONTENT_HASH_LEN: usize = 16;

const SAMPLES_DIR: &str = "Samples";
const KITS_DIR: &str = "Kits";
const PREVIEWS_DIR: &str = "Previews";
const INDEX_FILE: &str = "SampleIndex.json";
const PAD_STATE_FILE: &str = "PadState.json";

/// Characters that never make it into a file name derived from user input.
const UNSAFE_FILENAME_CHARS: &[char] = &['/', '?', ':', '&', '=', '%'];

/// Resolves every path the instrument reads or writes under a single root.
#[derive(Clone, Debug)]
pub struct StoragePaths {
    root: PathBuf,
}

impl StoragePaths {
    pub fn new(root: impl Into<PathBuf>) -> StoragePaths {
        StoragePaths { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn samples_dir(&self) -> PathBuf {
        self.root.join(SAMPLES_DIR)
    }

    pub fn kits_dir(&self) -> PathBuf {
        self.root.join(KITS_DIR)
    }

    pub fn previews_dir(&self) -> PathBuf {
        self.root.join(PREVIEWS_DIR)
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    pub fn pad_state_path(&self) -> PathBuf {
        self.root.join(PAD_STATE_FILE)
    }

    /// The canonical location of an imported sample with the given content hash.
    pub fn sample_path(&self, content_hash: &str) -> PathBuf {
        self.samples_dir()
            .join(format!("{}.wav", clean_filename(content_hash)))
    }

    pub fn kit_path(&self, kit_id: &str) -> PathBuf {
        self.kits_dir()
            .join(format!("{}.json", clean_filename(kit_id)))
    }

    /// Creates the root and every storage directory below it.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        for dir in [self.samples_dir(), self.kits_dir(), self.previews_dir()] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

/// Replaces characters that are unsafe in file names with underscores.
pub fn clean_filename(name: &str) -> String {
    name.chars()
        .map(|c| if UNSAFE_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Computes the content hash of a file, streaming it through SHA-256.
pub fn content_hash(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(fs::File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(truncate_digest(&hasher.finalize()))
}

/// Computes the content hash of an in-memory buffer.
pub fn content_hash_bytes(bytes: &[u8]) -> String {
    truncate_digest(&Sha256::digest(bytes))
}

fn truncate_digest(digest: &[u8]) -> String {
    let mut hash = hex::encode(digest);
    hash.truncate(CONTENT_HASH_LEN);
    hash
}

/// Writes a file by way of a temporary sibling that is renamed over the destination, so readers
/// only ever observe the old or the new contents.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = parent_dir(path);
    fs::create_dir_all(dir)?;
    let mut temp = tempfile::Builder::new()
        .prefix(".beatpad-")
        .suffix(".partial")
        .tempfile_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// The directory a file lives in, treating a bare file name as relative to the working directory.
pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;

    #[test]
    fn layout() {
        let paths = StoragePaths::new("/data");
        assert_eq!(PathBuf::from("/data/Samples"), paths.samples_dir());
        assert_eq!(
            PathBuf::from("/data/Samples/0123456789abcdef.wav"),
            paths.sample_path("0123456789abcdef")
        );
        assert_eq!(PathBuf::from("/data/Kits/k1.json"), paths.kit_path("k1"));
        assert_eq!(PathBuf::from("/data/SampleIndex.json"), paths.index_path());
        assert_eq!(PathBuf::from("/data/PadState.json"), paths.pad_state_path());
    }

    #[test]
    fn cleans_unsafe_characters() {
        assert_eq!("a_b_c_d_e_f_g", clean_filename("a/b?c:d&e=f%g"));
        assert_eq!("kick 01", clean_filename("kick 01"));
    }

    #[test]
    fn hashes_match_for_file_and_bytes() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("bytes.bin");
        let contents: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &contents)?;

        let hash = content_hash(&path)?;
        assert_eq!(CONTENT_HASH_LEN, hash.len());
        assert_eq!(hash, content_hash_bytes(&contents));
        // SHA-256 of the empty string.
        assert_eq!("e3b0c44298fc1c14", content_hash_bytes(&[]));
        Ok(())
    }

    #[test]
    fn atomic_write_replaces_contents() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("doc.json");
        write_atomic(&path, b"first")?;
        write_atomic(&path, b"second")?;
        assert_eq!(b"second".to_vec(), fs::read(&path)?);
        assert_eq!(1, fs::read_dir(path.parent().unwrap())?.count());
        Ok(())
    }
}
