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
use std::io;
use std::path::PathBuf;

use crate::import::ImportError;

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("unable to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to import {}: {source}", path.display())]
    Import {
        path: PathBuf,
        #[source]
        source: ImportError,
    },

    #[error("skipped {}: identical audio earlier in the batch failed to import", path.display())]
    BatchDuplicateFailed { path: PathBuf },

    #[error("unknown folder {0}")]
    UnknownFolder(String),

    #[error("storage error: {0}")]
    Io(#[from] io::Error),
}
