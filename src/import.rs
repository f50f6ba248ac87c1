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

//! Turning arbitrary audio files into canonical library samples.

mod error;
mod pipeline;
mod progress;

pub use error::ImportError;
pub use pipeline::{analyze, fold_to_mono, normalize_peak, AudioAnalysis, ImportPipeline};
pub use progress::{ImportProgress, ImportStage, NoProgress, ProgressSink};
