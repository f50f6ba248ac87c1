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
use std::path::PathBuf;

use crate::audio::{decode::DecodeError, resample::ResampleError, DeviceError};

/// Errors surfaced by the pad engine's control operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("pad {0} does not exist")]
    InvalidPad(usize),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("failed to load sample {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    #[error("failed to convert sample {}: {source}", path.display())]
    Convert {
        path: PathBuf,
        #[source]
        source: ResampleError,
    },

    #[error("render command queue is full")]
    QueueFull,
}
