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

/// The step an import is in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportStage {
    Decoding,
    Resampling,
    Converting,
    Normalizing,
    Analyzing,
    Writing,
    Ready,
}

impl ImportStage {
    /// Fraction of the import done once this stage is reached.
    pub fn fraction(self) -> f64 {
        match self {
            ImportStage::Decoding => 0.1,
            ImportStage::Resampling => 0.4,
            ImportStage::Converting => 0.6,
            ImportStage::Normalizing => 0.7,
            ImportStage::Analyzing => 0.8,
            ImportStage::Writing => 0.9,
            ImportStage::Ready => 1.0,
        }
    }
}

/// A progress report for one file.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportProgress {
    pub file_name: String,
    pub stage: ImportStage,
    pub fraction: f64,
}

/// Receives progress reports. Reports for a file arrive in order with non-decreasing fractions.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: ImportProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(ImportProgress) + Send + Sync,
{
    fn report(&self, progress: ImportProgress) {
        self(progress)
    }
}

/// Discards progress.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _: ImportProgress) {}
}
